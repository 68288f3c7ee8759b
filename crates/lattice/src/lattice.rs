//! Shared, copy-on-write handle over a [`SpecGraph`].
//!
//! # Role
//!
//! Readers load the current graph snapshot without locking. Writers clone the
//! snapshot, mutate the clone and publish it with compare-and-swap, so a
//! reader never observes a half-applied bases change.
//!
//! # Invariants
//!
//! - Concurrent writes are linearizable: a lost CAS re-applies the mutation to
//!   the newer snapshot.
//! - A mutation that returns an error publishes nothing.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::trace;

use crate::{LatticeError, SpecGraph, SpecId, SpecKind};

/// Cloneable handle to one ancestry graph.
///
/// Clones share the same graph. Registries and declaration tables hold a
/// clone and read through [`Lattice::snapshot`].
#[derive(Clone)]
pub struct Lattice {
	graph: Arc<ArcSwap<SpecGraph>>,
}

impl Default for Lattice {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for Lattice {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Lattice")
			.field("nodes", &self.graph.load().len())
			.finish()
	}
}

impl Lattice {
	pub fn new() -> Self {
		Self::from_graph(SpecGraph::new())
	}

	pub fn from_graph(graph: SpecGraph) -> Self {
		Self {
			graph: Arc::new(ArcSwap::from_pointee(graph)),
		}
	}

	/// The root capability node.
	#[inline]
	pub fn root(&self) -> SpecId {
		SpecId::ROOT
	}

	/// Pins the current graph.
	#[inline]
	pub fn snapshot(&self) -> Arc<SpecGraph> {
		self.graph.load_full()
	}

	/// Applies `mutate` to a private copy and publishes it.
	///
	/// `mutate` may run more than once when another writer publishes first.
	pub fn update<T>(
		&self,
		mut mutate: impl FnMut(&mut SpecGraph) -> Result<T, LatticeError>,
	) -> Result<T, LatticeError> {
		loop {
			let old = self.graph.load_full();
			let mut next = SpecGraph::clone(&old);
			let out = mutate(&mut next)?;

			let prev = self.graph.compare_and_swap(&old, Arc::new(next));
			if Arc::ptr_eq(&*prev, &old) {
				return Ok(out);
			}
			trace!("lattice snapshot changed concurrently, retrying");
		}
	}

	pub fn specification(&self, bases: &[SpecId]) -> Result<SpecId, LatticeError> {
		self.update(|g| g.specification(bases))
	}

	pub fn interface(&self, name: &str, bases: &[SpecId]) -> Result<SpecId, LatticeError> {
		self.update(|g| g.interface(name, bases))
	}

	pub fn declaration(&self, members: &[SpecId]) -> Result<SpecId, LatticeError> {
		self.update(|g| g.declaration(members))
	}

	pub fn add(
		&self,
		kind: SpecKind,
		name: Option<&str>,
		bases: &[SpecId],
	) -> Result<SpecId, LatticeError> {
		self.update(|g| g.add(kind, name, bases))
	}

	pub fn set_bases(&self, id: SpecId, bases: &[SpecId]) -> Result<(), LatticeError> {
		self.update(|g| g.set_bases(id, bases))
	}

	pub fn union(&self, a: SpecId, b: SpecId) -> Result<SpecId, LatticeError> {
		self.update(|g| g.union(a, b))
	}

	pub fn difference(&self, a: SpecId, b: SpecId) -> Result<SpecId, LatticeError> {
		self.update(|g| g.difference(a, b))
	}

	pub fn bases(&self, id: SpecId) -> Vec<SpecId> {
		self.graph.load().bases(id).to_vec()
	}

	/// Ancestry of `id`; empty when the id is unknown.
	pub fn ancestors(&self, id: SpecId) -> Arc<[SpecId]> {
		self.graph
			.load()
			.ancestry(id)
			.unwrap_or_else(|| Arc::from(Vec::new()))
	}

	pub fn extends(&self, id: SpecId, other: SpecId) -> bool {
		self.graph.load().extends(id, other)
	}

	pub fn interfaces(&self, id: SpecId) -> Vec<SpecId> {
		self.graph.load().interfaces(id)
	}

	pub fn contains(&self, id: SpecId) -> bool {
		self.graph.load().contains(id)
	}
}
