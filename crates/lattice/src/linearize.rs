//! C3 linearization, plus the first-seen flattening used for declarations.
//!
//! # Role
//!
//! Pure merge step of the ancestry resolver. It never reads the graph: the
//! caller hands in the already-resolved ancestries of every base, which lets
//! [`crate::graph::SpecGraph::set_bases`] run it against a scratch table before
//! anything is published.
//!
//! # Invariants
//!
//! - The result starts with the node itself and has no duplicates.
//! - Local precedence: bases keep their declared relative order.
//! - Monotonicity: the relative order inside every base ancestry is kept.

use crate::SpecId;

/// Merges `[spec]`, each base ancestry and the base list itself.
///
/// `base_ancestries[i]` must be the ancestry of `bases[i]`. Returns `None`
/// when at some step every remaining head still occurs in the tail of another
/// sequence.
pub fn merge(spec: SpecId, bases: &[SpecId], base_ancestries: &[&[SpecId]]) -> Option<Vec<SpecId>> {
	debug_assert_eq!(bases.len(), base_ancestries.len());

	let head = [spec];
	let mut sequences: Vec<&[SpecId]> = Vec::with_capacity(bases.len() + 2);
	sequences.push(&head);
	sequences.extend(base_ancestries.iter().copied());
	sequences.push(bases);

	let mut cursors = vec![0usize; sequences.len()];
	let capacity = base_ancestries.iter().map(|a| a.len()).sum::<usize>() + 1;
	let mut result = Vec::with_capacity(capacity);

	loop {
		let mut exhausted = true;
		let mut chosen = None;

		for (seq, &cursor) in sequences.iter().zip(&cursors) {
			let Some(&candidate) = seq.get(cursor) else {
				continue;
			};
			exhausted = false;
			if !in_any_tail(&sequences, &cursors, candidate) {
				chosen = Some(candidate);
				break;
			}
		}

		if exhausted {
			return Some(result);
		}

		let next = chosen?;
		for (seq, cursor) in sequences.iter().zip(cursors.iter_mut()) {
			if seq.get(*cursor) == Some(&next) {
				*cursor += 1;
			}
		}
		result.push(next);
	}
}

/// `[spec]` followed by each base ancestry in turn, skipping entries already
/// taken. Never fails, so declarations can aggregate interfaces whose own
/// orders disagree.
pub fn flatten(spec: SpecId, base_ancestries: &[&[SpecId]]) -> Vec<SpecId> {
	let mut result = vec![spec];
	for &ancestry in base_ancestries {
		for &entry in ancestry {
			if !result.contains(&entry) {
				result.push(entry);
			}
		}
	}
	result
}

fn in_any_tail(sequences: &[&[SpecId]], cursors: &[usize], candidate: SpecId) -> bool {
	sequences
		.iter()
		.zip(cursors)
		.any(|(seq, &cursor)| seq.get(cursor + 1..).is_some_and(|tail| tail.contains(&candidate)))
}
