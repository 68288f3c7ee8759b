//! Specification arena and ancestry resolver.
//!
//! # Role
//!
//! Owns every lattice node, its ordered bases, the non-owning dependent
//! back-references used for invalidation, and the memoized ancestry.
//!
//! # Invariants
//!
//! - `ancestors(s)[0] == s` and the ancestry has no duplicates.
//! - Every base of a node precedes, in the node's ancestry, the bases
//!   declared after it (local precedence), and no base ancestry is reordered
//!   (monotonicity).
//! - A failed [`SpecGraph::set_bases`] leaves every node untouched.
//! - A node is listed in `dependents(b)` for every base `b` it declares.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace, warn};

use crate::linearize::{flatten, merge};
use crate::{LatticeError, SpecId, SpecKind};

#[derive(Clone, Debug)]
struct SpecNode {
	kind: SpecKind,
	name: Option<Arc<str>>,
	doc: Option<Arc<str>>,
	bases: Vec<SpecId>,
	dependents: FxHashSet<SpecId>,
	ancestry: Arc<[SpecId]>,
}

/// Arena of specification nodes addressed by [`SpecId`].
///
/// Nodes sit behind `Arc` so cloning a graph for a copy-on-write update only
/// copies pointers; mutated nodes are detached with [`Arc::make_mut`].
#[derive(Clone, Debug)]
pub struct SpecGraph {
	nodes: Vec<Arc<SpecNode>>,
	revision: u64,
}

impl Default for SpecGraph {
	fn default() -> Self {
		Self::new()
	}
}

impl SpecGraph {
	/// Name of the root capability node.
	pub const ROOT_NAME: &'static str = "Interface";

	/// Creates a graph holding only the root interface.
	pub fn new() -> Self {
		let root = SpecNode {
			kind: SpecKind::Interface,
			name: Some(Arc::from(Self::ROOT_NAME)),
			doc: None,
			bases: Vec::new(),
			dependents: FxHashSet::default(),
			ancestry: Arc::from([SpecId::ROOT]),
		};
		Self {
			nodes: vec![Arc::new(root)],
			revision: 0,
		}
	}

	/// Bumped by every committed [`SpecGraph::set_bases`]. Existing
	/// ancestries only change when it does.
	pub fn revision(&self) -> u64 {
		self.revision
	}

	/// Number of nodes, root included.
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	/// Always false; the root node exists from construction.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn contains(&self, id: SpecId) -> bool {
		id.index() < self.nodes.len()
	}

	fn node(&self, id: SpecId) -> Option<&SpecNode> {
		self.nodes.get(id.index()).map(Arc::as_ref)
	}

	fn node_mut(&mut self, id: SpecId) -> Option<&mut SpecNode> {
		self.nodes.get_mut(id.index()).map(Arc::make_mut)
	}

	pub fn kind(&self, id: SpecId) -> Option<SpecKind> {
		self.node(id).map(|n| n.kind)
	}

	pub fn name(&self, id: SpecId) -> Option<&str> {
		self.node(id).and_then(|n| n.name.as_deref())
	}

	pub fn doc(&self, id: SpecId) -> Option<&str> {
		self.node(id).and_then(|n| n.doc.as_deref())
	}

	/// Attaches documentation to a node. Unknown ids are ignored.
	pub fn set_doc(&mut self, id: SpecId, doc: impl Into<Arc<str>>) {
		if let Some(node) = self.node_mut(id) {
			node.doc = Some(doc.into());
		}
	}

	/// Direct bases in declared order. Empty for unknown ids.
	pub fn bases(&self, id: SpecId) -> &[SpecId] {
		self.node(id).map_or(&[], |n| n.bases.as_slice())
	}

	/// Nodes subscribed to invalidation from `id`, in id order.
	pub fn dependents(&self, id: SpecId) -> Vec<SpecId> {
		let mut out: Vec<_> = self
			.node(id)
			.map(|n| n.dependents.iter().copied().collect())
			.unwrap_or_default();
		out.sort_unstable();
		out
	}

	/// Linearized ancestry, most-derived-first. Empty for unknown ids.
	pub fn ancestors(&self, id: SpecId) -> &[SpecId] {
		self.node(id).map_or(&[], |n| &n.ancestry[..])
	}

	/// Shared handle to the memoized ancestry.
	pub fn ancestry(&self, id: SpecId) -> Option<Arc<[SpecId]>> {
		self.node(id).map(|n| n.ancestry.clone())
	}

	/// Ancestors that are interfaces, in ancestry order.
	pub fn iro(&self, id: SpecId) -> Vec<SpecId> {
		self.ancestors(id)
			.iter()
			.copied()
			.filter(|&a| self.kind(a) == Some(SpecKind::Interface))
			.collect()
	}

	/// Interfaces a node stands for.
	///
	/// An interface is its own single member. Any other node aggregates the
	/// interfaces of its bases, de-duplicated in first-seen order.
	pub fn interfaces(&self, id: SpecId) -> Vec<SpecId> {
		let mut seen = FxHashSet::default();
		let mut out = Vec::new();
		self.collect_interfaces(id, &mut seen, &mut out);
		out
	}

	fn collect_interfaces(&self, id: SpecId, seen: &mut FxHashSet<SpecId>, out: &mut Vec<SpecId>) {
		let Some(node) = self.node(id) else {
			return;
		};
		if node.kind == SpecKind::Interface {
			if seen.insert(id) {
				out.push(id);
			}
			return;
		}
		for &base in &node.bases {
			self.collect_interfaces(base, seen, out);
		}
	}

	/// Whether `id` extends `other`.
	///
	/// Every node extends itself. Declarations only extend what they
	/// aggregate: `other` must be in the ancestry and among
	/// [`SpecGraph::interfaces`].
	pub fn extends(&self, id: SpecId, other: SpecId) -> bool {
		if id == other {
			return self.contains(id);
		}
		if !self.ancestors(id).contains(&other) {
			return false;
		}
		match self.kind(id) {
			Some(SpecKind::Declaration) => self.interfaces(id).contains(&other),
			_ => true,
		}
	}

	/// Creates a plain specification node.
	pub fn specification(&mut self, bases: &[SpecId]) -> Result<SpecId, LatticeError> {
		self.add(SpecKind::Specification, None, bases)
	}

	/// Creates a named interface.
	pub fn interface(&mut self, name: &str, bases: &[SpecId]) -> Result<SpecId, LatticeError> {
		self.add(SpecKind::Interface, Some(name), bases)
	}

	/// Creates a declaration aggregating `members`.
	pub fn declaration(&mut self, members: &[SpecId]) -> Result<SpecId, LatticeError> {
		self.add(SpecKind::Declaration, None, members)
	}

	/// Constructs a node; nothing is inserted when validation or
	/// linearization fails.
	pub fn add(
		&mut self,
		kind: SpecKind,
		name: Option<&str>,
		bases: &[SpecId],
	) -> Result<SpecId, LatticeError> {
		let bases = self.normalize_bases(kind, bases)?;
		let id = SpecId::from_u32(self.nodes.len() as u32);

		let ancestry = self.linearize(kind, id, &bases, &FxHashMap::default())?;
		for &base in &bases {
			if let Some(node) = self.node_mut(base) {
				node.dependents.insert(id);
			}
		}
		self.nodes.push(Arc::new(SpecNode {
			kind,
			name: name.map(Arc::from),
			doc: None,
			bases,
			dependents: FxHashSet::default(),
			ancestry,
		}));
		trace!(spec = %id, ?kind, "specification created");
		Ok(id)
	}

	/// Replaces the bases of `id` and re-resolves every transitive dependent.
	pub fn set_bases(&mut self, id: SpecId, bases: &[SpecId]) -> Result<(), LatticeError> {
		let kind = self.kind(id).ok_or(LatticeError::UnknownSpec { spec: id })?;
		let bases = self.normalize_bases(kind, bases)?;

		let descendants = self.structural_descendants(id);
		if let Some(&base) = bases.iter().find(|b| descendants.contains(*b)) {
			return Err(LatticeError::CyclicBase { spec: id, base });
		}

		let affected = self.dependent_closure(id);
		let order = self.resolution_order(id, &bases, &affected);
		let mut scratch: FxHashMap<SpecId, Arc<[SpecId]>> = FxHashMap::default();
		for spec in order {
			let spec_bases = if spec == id {
				bases.as_slice()
			} else {
				self.bases(spec)
			};
			let spec_kind = self.kind(spec).unwrap_or(SpecKind::Specification);
			let ancestry = self.linearize(spec_kind, spec, spec_bases, &scratch)?;
			scratch.insert(spec, ancestry);
		}

		let old = self
			.node(id)
			.map(|n| n.bases.clone())
			.unwrap_or_default();
		for base in &old {
			if let Some(node) = self.node_mut(*base) {
				node.dependents.remove(&id);
			}
		}
		for base in &bases {
			if let Some(node) = self.node_mut(*base) {
				node.dependents.insert(id);
			}
		}
		if let Some(node) = self.node_mut(id) {
			node.bases = bases;
		}

		self.revision += 1;
		let recomputed = scratch.len();
		for (spec, ancestry) in scratch {
			if let Some(node) = self.node_mut(spec) {
				node.ancestry = ancestry;
			}
		}
		debug!(spec = %id, recomputed, "bases reassigned");
		Ok(())
	}

	/// Registers `dependent` for invalidation fan-out from `base`.
	///
	/// Structural edges are maintained by construction and
	/// [`SpecGraph::set_bases`]; this adds an extra observer whose ancestry is
	/// re-resolved whenever `base` changes.
	pub fn subscribe(&mut self, base: SpecId, dependent: SpecId) -> Result<(), LatticeError> {
		if !self.contains(dependent) {
			return Err(LatticeError::UnknownSpec { spec: dependent });
		}
		if base == dependent || self.ancestors(base).contains(&dependent) {
			return Err(LatticeError::CyclicBase {
				spec: dependent,
				base,
			});
		}
		let node = self
			.node_mut(base)
			.ok_or(LatticeError::UnknownSpec { spec: base })?;
		node.dependents.insert(dependent);
		Ok(())
	}

	/// Drops an observer added with [`SpecGraph::subscribe`].
	///
	/// Returns false when nothing was removed. A node that still lists `base`
	/// among its bases stays subscribed.
	pub fn unsubscribe(&mut self, base: SpecId, dependent: SpecId) -> bool {
		if self.bases(dependent).contains(&base) {
			return false;
		}
		self.node_mut(base)
			.is_some_and(|node| node.dependents.remove(&dependent))
	}

	/// New declaration holding the interfaces of `a` followed by those of `b`.
	pub fn union(&mut self, a: SpecId, b: SpecId) -> Result<SpecId, LatticeError> {
		let mut members = self.interfaces(a);
		for iface in self.interfaces(b) {
			if !members.contains(&iface) {
				members.push(iface);
			}
		}
		self.declaration(&members)
	}

	/// New declaration holding the interfaces of `a` that extend none of the
	/// interfaces of `b`.
	pub fn difference(&mut self, a: SpecId, b: SpecId) -> Result<SpecId, LatticeError> {
		let removed = self.interfaces(b);
		let members: Vec<_> = self
			.interfaces(a)
			.into_iter()
			.filter(|&i| !removed.iter().any(|&j| self.extends(i, j)))
			.collect();
		self.declaration(&members)
	}

	fn normalize_bases(&self, kind: SpecKind, bases: &[SpecId]) -> Result<Vec<SpecId>, LatticeError> {
		let mut out: Vec<SpecId> = Vec::with_capacity(bases.len());
		for &base in bases {
			if !self.contains(base) {
				return Err(LatticeError::InvalidBase { base });
			}
			if !out.contains(&base) {
				out.push(base);
			}
		}
		if kind == SpecKind::Declaration {
			out = self.most_specific_first(out);
		}
		Ok(out)
	}

	/// Stable reordering that moves every member ahead of the members it
	/// descends from. Declarations are unordered, so this only picks the
	/// arrangement that linearizes.
	fn most_specific_first(&self, mut pending: Vec<SpecId>) -> Vec<SpecId> {
		let mut out = Vec::with_capacity(pending.len());
		while !pending.is_empty() {
			let pick = pending
				.iter()
				.position(|&m| {
					!pending
						.iter()
						.any(|&other| other != m && self.ancestors(other).contains(&m))
				})
				.unwrap_or(0);
			out.push(pending.remove(pick));
		}
		out
	}

	/// Declarations flatten their bases first-seen; every other kind goes
	/// through C3.
	fn linearize(
		&self,
		kind: SpecKind,
		spec: SpecId,
		bases: &[SpecId],
		scratch: &FxHashMap<SpecId, Arc<[SpecId]>>,
	) -> Result<Arc<[SpecId]>, LatticeError> {
		let base_ancestries: Vec<&[SpecId]> = bases
			.iter()
			.map(|b| scratch.get(b).map_or_else(|| self.ancestors(*b), |a| &a[..]))
			.collect();
		if kind == SpecKind::Declaration {
			return Ok(Arc::from(flatten(spec, &base_ancestries)));
		}
		match merge(spec, bases, &base_ancestries) {
			Some(order) => Ok(Arc::from(order)),
			None => {
				warn!(spec = %spec, ?bases, "inconsistent hierarchy rejected");
				Err(LatticeError::InconsistentHierarchy { spec })
			}
		}
	}

	/// Nodes reaching `id` through `bases` edges, `id` included. Observers
	/// added with [`SpecGraph::subscribe`] are not followed.
	fn structural_descendants(&self, id: SpecId) -> FxHashSet<SpecId> {
		let mut seen = FxHashSet::default();
		let mut stack = vec![id];
		while let Some(spec) = stack.pop() {
			if !seen.insert(spec) {
				continue;
			}
			if let Some(node) = self.node(spec) {
				stack.extend(
					node.dependents
						.iter()
						.copied()
						.filter(|&d| self.bases(d).contains(&spec)),
				);
			}
		}
		seen
	}

	fn dependent_closure(&self, id: SpecId) -> FxHashSet<SpecId> {
		let mut seen = FxHashSet::default();
		let mut stack = vec![id];
		while let Some(spec) = stack.pop() {
			if !seen.insert(spec) {
				continue;
			}
			if let Some(node) = self.node(spec) {
				stack.extend(node.dependents.iter().copied());
			}
		}
		seen
	}

	/// Orders `affected` so every node comes after its bases inside the set.
	/// `id` is resolved against `new_bases` instead of its stored ones.
	fn resolution_order(
		&self,
		id: SpecId,
		new_bases: &[SpecId],
		affected: &FxHashSet<SpecId>,
	) -> Vec<SpecId> {
		let mut pending: FxHashMap<SpecId, usize> = FxHashMap::default();
		let mut children: FxHashMap<SpecId, Vec<SpecId>> = FxHashMap::default();
		for &spec in affected {
			let bases = if spec == id { new_bases } else { self.bases(spec) };
			let inside: Vec<_> = bases.iter().filter(|b| affected.contains(*b)).collect();
			pending.insert(spec, inside.len());
			for &base in inside {
				children.entry(base).or_default().push(spec);
			}
		}

		let mut ready: Vec<SpecId> = pending
			.iter()
			.filter(|&(_, &n)| n == 0)
			.map(|(&spec, _)| spec)
			.collect();
		ready.sort_unstable();

		let mut order = Vec::with_capacity(affected.len());
		while let Some(spec) = ready.pop() {
			order.push(spec);
			for &child in children.get(&spec).map_or(&[][..], Vec::as_slice) {
				if let Some(count) = pending.get_mut(&child) {
					*count -= 1;
					if *count == 0 {
						ready.push(child);
					}
				}
			}
		}
		order
	}
}

#[cfg(test)]
mod tests;
