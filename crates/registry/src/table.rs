//! Storage for all registrations of one order.

use std::sync::Arc;

use concord_lattice::{SpecGraph, SpecId};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::extendor::ExtendorIndex;
use crate::key::{RegistrationKey, Segment, prefix_segments};
use crate::nested::NestedKeyMap;

/// Nested registration map, extendor index and provided-spec usage counts
/// for keys with the same number of required dimensions.
///
/// A provided spec stays in the extendor index while at least one key of
/// this table uses it. The index is rebuilt from `provided_order` whenever
/// the lattice revision moves past the one it was built against.
#[derive(Debug)]
pub(crate) struct OrderTable<T> {
	map: NestedKeyMap<Segment, T>,
	extendors: ExtendorIndex,
	provided_refs: FxHashMap<SpecId, usize>,
	provided_order: Vec<SpecId>,
	revision: u64,
}

impl<T> Default for OrderTable<T> {
	fn default() -> Self {
		Self {
			map: NestedKeyMap::new(),
			extendors: ExtendorIndex::new(),
			provided_refs: FxHashMap::default(),
			provided_order: Vec::new(),
			revision: 0,
		}
	}
}

impl<T> OrderTable<T> {
	pub(crate) fn map(&self) -> &NestedKeyMap<Segment, T> {
		&self.map
	}

	pub(crate) fn extendors(&self) -> &ExtendorIndex {
		&self.extendors
	}

	pub(crate) fn get(&self, key: &RegistrationKey) -> Option<&T> {
		self.map.get(&key.segments())
	}

	pub(crate) fn get_mut(&mut self, key: &RegistrationKey) -> Option<&mut T> {
		self.map.get_mut(&key.segments())
	}

	/// Whether the extendor index predates `graph`.
	pub(crate) fn is_stale(&self, graph: &SpecGraph) -> bool {
		graph.revision() > self.revision
	}

	/// Re-lists every registered provided spec under its current ancestry.
	pub(crate) fn refresh(&mut self, graph: &SpecGraph) {
		if !self.is_stale(graph) {
			return;
		}
		self.extendors = ExtendorIndex::new();
		for &spec in &self.provided_order {
			self.extendors.add(graph, spec);
		}
		self.revision = graph.revision();
		trace!(revision = self.revision, provided = self.provided_order.len(), "extendor index rebuilt");
	}

	/// Stores `value`, returning the value previously at `key`.
	pub(crate) fn insert(&mut self, graph: &SpecGraph, key: &RegistrationKey, value: T) -> Option<T> {
		self.refresh(graph);
		let replaced = self.map.set(&key.segments(), value);
		if replaced.is_none() {
			let refs = self.provided_refs.entry(key.provided).or_default();
			*refs += 1;
			if *refs == 1 {
				self.provided_order.push(key.provided);
				self.extendors.add(graph, key.provided);
			}
		}
		replaced
	}

	pub(crate) fn remove(&mut self, key: &RegistrationKey) -> Option<T> {
		let removed = self.map.delete(&key.segments())?;
		if let Some(refs) = self.provided_refs.get_mut(&key.provided) {
			*refs -= 1;
			if *refs == 0 {
				self.provided_refs.remove(&key.provided);
				self.provided_order.retain(|&spec| spec != key.provided);
				self.extendors.delete(key.provided);
			}
		}
		Some(removed)
	}

	/// Values registered under exactly `(required, provided)`, by name.
	pub(crate) fn named(&self, required: &[SpecId], provided: SpecId) -> Vec<(Arc<str>, &T)> {
		let Some(node) = self.map.prefix_get(&prefix_segments(required, provided)) else {
			return Vec::new();
		};
		let mut out: Vec<_> = node
			.children()
			.filter_map(|(segment, child)| match segment {
				Segment::Name(name) => child.leaf().map(|value| (name.clone(), value)),
				Segment::Spec(_) => None,
			})
			.collect();
		out.sort_by(|a, b| a.0.cmp(&b.0));
		out
	}

	pub(crate) fn is_empty(&self) -> bool {
		self.map.is_empty()
	}
}

/// Brings the extendor index of the `order` table up to `graph` before a
/// lookup reads it.
pub(crate) fn refresh_order<T>(tables: &RwLock<FxHashMap<usize, OrderTable<T>>>, order: usize, graph: &SpecGraph) {
	if !tables.read().get(&order).is_some_and(|table| table.is_stale(graph)) {
		return;
	}
	if let Some(table) = tables.write().get_mut(&order) {
		table.refresh(graph);
	}
}

/// Substitutes for a spec segment: its ancestry, most derived first unless
/// `general_first` is set. Name segments stand for themselves.
pub(crate) fn ancestry_segments(graph: &SpecGraph, segment: &Segment, general_first: bool) -> Vec<Segment> {
	match segment {
		Segment::Spec(id) => {
			let ancestry = graph.ancestors(*id).iter().map(|&a| Segment::Spec(a));
			if general_first {
				ancestry.rev().collect()
			} else {
				ancestry.collect()
			}
		}
		Segment::Name(_) => vec![segment.clone()],
	}
}

/// Spec segments for an extendor list, optionally reversed.
pub(crate) fn extendor_segments(list: &[SpecId], reversed: bool) -> Vec<Segment> {
	let segments = list.iter().map(|&spec| Segment::Spec(spec));
	if reversed {
		segments.rev().collect()
	} else {
		segments.collect()
	}
}
