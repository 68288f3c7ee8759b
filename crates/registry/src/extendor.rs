//! Reverse specificity index over registered provided specs.
//!
//! For every lattice node the index lists the registered provided specs that
//! extend it. A list starts with the entries closest to its node and grows
//! towards more derived specs; adapter lookups scan it front to back.

use concord_lattice::{SpecGraph, SpecId};
use rustc_hash::FxHashMap;
use tracing::trace;

/// Ordered provided specs extending one node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extendor {
	current: Vec<SpecId>,
}

impl Extendor {
	/// Inserts `spec` after every entry it extends and before the others.
	///
	/// Entries on each side keep their relative order. Returns false when the
	/// spec was already listed.
	pub fn add(&mut self, graph: &SpecGraph, spec: SpecId) -> bool {
		if self.current.contains(&spec) {
			return false;
		}
		let (mut before, after): (Vec<_>, Vec<_>) = self
			.current
			.iter()
			.copied()
			.partition(|&entry| graph.extends(spec, entry));
		before.push(spec);
		before.extend(after);
		self.current = before;
		true
	}

	pub fn delete(&mut self, spec: SpecId) -> bool {
		let len = self.current.len();
		self.current.retain(|&entry| entry != spec);
		self.current.len() != len
	}

	pub fn is_empty(&self) -> bool {
		self.current.is_empty()
	}

	pub fn current(&self) -> &[SpecId] {
		&self.current
	}
}

/// Node-to-[`Extendor`] map. Empty lists are pruned.
#[derive(Debug, Clone, Default)]
pub struct ExtendorIndex {
	lists: FxHashMap<SpecId, Extendor>,
}

impl ExtendorIndex {
	pub fn new() -> Self {
		Self::default()
	}

	/// Lists `spec` under every node of its ancestry.
	pub fn add(&mut self, graph: &SpecGraph, spec: SpecId) {
		for &node in graph.ancestors(spec) {
			self.lists.entry(node).or_default().add(graph, spec);
		}
		trace!(spec = %spec, lists = self.lists.len(), "extendor added");
	}

	/// Removes `spec` from every list, whatever its ancestry is now.
	pub fn delete(&mut self, spec: SpecId) {
		self.lists.retain(|_, extendor| {
			extendor.delete(spec);
			!extendor.is_empty()
		});
	}

	/// Whether any registered provided spec extends `node`.
	pub fn has(&self, node: SpecId) -> bool {
		self.lists.contains_key(&node)
	}

	/// Provided specs extending `node`, nearest first.
	pub fn get(&self, node: SpecId) -> &[SpecId] {
		self.lists.get(&node).map_or(&[], Extendor::current)
	}

	pub fn is_empty(&self) -> bool {
		self.lists.is_empty()
	}
}
