//! Identity-keyed declaration side table.
//!
//! # Role
//!
//! Records which interfaces host objects provide and which interfaces their
//! factories implement, without touching the host types. Every key gets
//! persistent declaration nodes in the lattice, so later declarations reach
//! existing objects through ancestry invalidation instead of rebuilding them.
//!
//! Per object the table keeps two nodes:
//!
//! - the *direct* declaration, holding interfaces provided by that object
//!   alone;
//! - the *provided* declaration, whose bases are the factory's implemented
//!   declaration (when bound) followed by the direct one.
//!
//! Per factory it keeps the *implemented* declaration, whose bases are the
//! declared interfaces followed by the implemented declarations of the
//! factories it inherits from (unless declared with `implements_only`).

use std::hash::Hash;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::{Lattice, LatticeError, SpecId};

/// Turns a host object into the declaration it currently claims.
///
/// Registries call this to derive the required specs of `get`/`call`.
pub trait DeclarationProvider<O: ?Sized> {
	fn provided_by(&self, object: &O) -> SpecId;
}

impl<O: ?Sized, F> DeclarationProvider<O> for F
where
	F: Fn(&O) -> SpecId,
{
	fn provided_by(&self, object: &O) -> SpecId {
		self(object)
	}
}

struct Implemented<K> {
	node: SpecId,
	declared: Vec<SpecId>,
	parents: Vec<K>,
	only: bool,
}

struct Provided<K> {
	direct: SpecId,
	provided: SpecId,
	factory: Option<K>,
}

struct State<K> {
	implemented: FxHashMap<K, Implemented<K>>,
	provided: FxHashMap<K, Provided<K>>,
}

/// Declaration side table keyed by object and factory identity.
pub struct Declarations<K> {
	lattice: Lattice,
	empty: SpecId,
	state: RwLock<State<K>>,
}

impl<K> Declarations<K>
where
	K: Hash + Eq + Clone,
{
	pub fn new(lattice: Lattice) -> Result<Self, LatticeError> {
		let empty = lattice.declaration(&[])?;
		Ok(Self {
			lattice,
			empty,
			state: RwLock::new(State {
				implemented: FxHashMap::default(),
				provided: FxHashMap::default(),
			}),
		})
	}

	pub fn lattice(&self) -> &Lattice {
		&self.lattice
	}

	/// Declaration of the interfaces `factory` implements, created on first
	/// use.
	pub fn implemented_by(&self, factory: &K) -> Result<SpecId, LatticeError> {
		if let Some(entry) = self.state.read().implemented.get(factory) {
			return Ok(entry.node);
		}
		let mut state = self.state.write();
		self.implemented_entry(&mut state, factory)
	}

	/// Makes `factory` inherit the implemented interfaces of `parents`, in
	/// order.
	pub fn inherit(&self, factory: &K, parents: &[K]) -> Result<(), LatticeError> {
		let mut state = self.state.write();
		self.implemented_entry(&mut state, factory)?;
		for parent in parents {
			self.implemented_entry(&mut state, parent)?;
		}
		let previous = match state.implemented.get_mut(factory) {
			Some(entry) => std::mem::replace(&mut entry.parents, parents.to_vec()),
			None => return Ok(()),
		};
		if let Err(err) = self.rebase_implemented(&state, factory) {
			if let Some(entry) = state.implemented.get_mut(factory) {
				entry.parents = previous;
			}
			return Err(err);
		}
		Ok(())
	}

	/// Adds interfaces to what `factory` implements.
	pub fn implements(&self, factory: &K, interfaces: &[SpecId]) -> Result<(), LatticeError> {
		self.declare(factory, interfaces, false)
	}

	/// Replaces what `factory` implements, dropping inherited declarations.
	pub fn implements_only(&self, factory: &K, interfaces: &[SpecId]) -> Result<(), LatticeError> {
		self.declare(factory, interfaces, true)
	}

	fn declare(&self, factory: &K, interfaces: &[SpecId], only: bool) -> Result<(), LatticeError> {
		let mut state = self.state.write();
		self.implemented_entry(&mut state, factory)?;
		let Some(entry) = state.implemented.get_mut(factory) else {
			return Ok(());
		};
		let previous = (entry.declared.clone(), entry.only);
		if only {
			entry.declared.clear();
			entry.only = true;
		}
		for &iface in interfaces {
			if !entry.declared.contains(&iface) {
				entry.declared.push(iface);
			}
		}
		if let Err(err) = self.rebase_implemented(&state, factory) {
			if let Some(entry) = state.implemented.get_mut(factory) {
				(entry.declared, entry.only) = previous;
			}
			return Err(err);
		}
		debug!(count = interfaces.len(), only, "factory declarations updated");
		Ok(())
	}

	/// Records `object` as produced by `factory`, so it provides whatever the
	/// factory implements.
	pub fn bind(&self, object: &K, factory: &K) -> Result<SpecId, LatticeError> {
		let mut state = self.state.write();
		let implemented = self.implemented_entry(&mut state, factory)?;
		let (direct, provided) = self.provided_entry(&mut state, object)?;
		self.lattice.set_bases(provided, &[implemented, direct])?;
		if let Some(entry) = state.provided.get_mut(object) {
			entry.factory = Some(factory.clone());
		}
		Ok(provided)
	}

	/// Declaration of the interfaces `object` provides by itself.
	pub fn directly_provided_by(&self, object: &K) -> Result<SpecId, LatticeError> {
		if let Some(entry) = self.state.read().provided.get(object) {
			return Ok(entry.direct);
		}
		let mut state = self.state.write();
		Ok(self.provided_entry(&mut state, object)?.0)
	}

	/// Replaces the interfaces `object` provides by itself. Interfaces coming
	/// from its factory are unaffected.
	pub fn directly_provides(&self, object: &K, interfaces: &[SpecId]) -> Result<(), LatticeError> {
		let mut state = self.state.write();
		let (direct, _) = self.provided_entry(&mut state, object)?;
		self.lattice.set_bases(direct, interfaces)
	}

	/// Adds interfaces to those `object` provides by itself.
	pub fn also_provides(&self, object: &K, interfaces: &[SpecId]) -> Result<(), LatticeError> {
		let mut state = self.state.write();
		let (direct, _) = self.provided_entry(&mut state, object)?;
		let mut members = self.lattice.interfaces(direct);
		members.extend_from_slice(interfaces);
		self.lattice.set_bases(direct, &members)
	}

	/// Stops `object` from directly providing `interface` and anything
	/// derived from it.
	pub fn no_longer_provides(&self, object: &K, interface: SpecId) -> Result<(), LatticeError> {
		let mut state = self.state.write();
		let (direct, _) = self.provided_entry(&mut state, object)?;
		let graph = self.lattice.snapshot();
		let removed = graph.interfaces(interface);
		let members: Vec<_> = graph
			.interfaces(direct)
			.into_iter()
			.filter(|&i| !removed.iter().any(|&j| graph.extends(i, j)))
			.collect();
		self.lattice.set_bases(direct, &members)
	}

	/// Drops every declaration attached to `object`.
	///
	/// Its nodes stay in the lattice but are detached from their bases.
	pub fn forget(&self, object: &K) -> Result<(), LatticeError> {
		let Some(entry) = self.state.write().provided.remove(object) else {
			return Ok(());
		};
		self.lattice.set_bases(entry.provided, &[])?;
		self.lattice.set_bases(entry.direct, &[])
	}

	/// Whether `object` claims to provide `interface`.
	pub fn is_provided_by(&self, interface: SpecId, object: &K) -> bool {
		self.lattice.extends(self.provided_by(object), interface)
	}

	/// Whether `factory` claims to implement `interface`.
	pub fn is_implemented_by(&self, interface: SpecId, factory: &K) -> bool {
		self.state
			.read()
			.implemented
			.get(factory)
			.is_some_and(|entry| self.lattice.extends(entry.node, interface))
	}

	fn implemented_entry(&self, state: &mut State<K>, factory: &K) -> Result<SpecId, LatticeError> {
		if let Some(entry) = state.implemented.get(factory) {
			return Ok(entry.node);
		}
		let node = self.lattice.declaration(&[])?;
		state.implemented.insert(
			factory.clone(),
			Implemented {
				node,
				declared: Vec::new(),
				parents: Vec::new(),
				only: false,
			},
		);
		Ok(node)
	}

	fn provided_entry(&self, state: &mut State<K>, object: &K) -> Result<(SpecId, SpecId), LatticeError> {
		if let Some(entry) = state.provided.get(object) {
			return Ok((entry.direct, entry.provided));
		}
		let direct = self.lattice.declaration(&[])?;
		let provided = self.lattice.declaration(&[direct])?;
		state.provided.insert(
			object.clone(),
			Provided {
				direct,
				provided,
				factory: None,
			},
		);
		Ok((direct, provided))
	}

	fn rebase_implemented(&self, state: &State<K>, factory: &K) -> Result<(), LatticeError> {
		let Some(entry) = state.implemented.get(factory) else {
			return Ok(());
		};
		let mut bases = entry.declared.clone();
		if !entry.only {
			for parent in &entry.parents {
				if let Some(inherited) = state.implemented.get(parent) {
					if !bases.contains(&inherited.node) {
						bases.push(inherited.node);
					}
				}
			}
		}
		self.lattice.set_bases(entry.node, &bases)
	}

	/// Factory `object` was bound to, if any.
	pub fn factory_of(&self, object: &K) -> Option<K> {
		self.state
			.read()
			.provided
			.get(object)
			.and_then(|entry| entry.factory.clone())
	}
}

impl<K> DeclarationProvider<K> for Declarations<K>
where
	K: Hash + Eq + Clone,
{
	/// Objects never declared map to a shared empty declaration.
	fn provided_by(&self, object: &K) -> SpecId {
		self.state
			.read()
			.provided
			.get(object)
			.map_or(self.empty, |entry| entry.provided)
	}
}

impl<K> Declarations<K>
where
	K: Hash + Eq + Clone,
{
	pub fn provided_by(&self, object: &K) -> SpecId {
		<Self as DeclarationProvider<K>>::provided_by(self, object)
	}
}
