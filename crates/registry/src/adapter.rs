//! Single-slot, specificity-ranked adapter registry.
//!
//! # Role
//!
//! Maps `(required..., provided, name)` keys to one value each. Lookups
//! expand every required dimension to its ancestry and the provided dimension
//! to the registered provided specs extending it, then return the most
//! specific match.
//!
//! # Invariants
//!
//! - Earlier required dimensions dominate later ones when ranking matches.
//! - A failed registration leaves the registry unchanged.
//! - Lookups never fail; a miss is `None`.

use std::collections::BTreeMap;
use std::sync::Arc;

use concord_lattice::{DeclarationProvider, Lattice, SpecId};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::key::{RegistrationKey, Required, Segment, normalize_required, prefix_segments};
use crate::registration::{Factory, Registration};
use crate::table::{OrderTable, ancestry_segments, extendor_segments, refresh_order};
use crate::{RegistryConfig, RegistryError};

/// Adapter registry over values of type `V`.
pub struct AdapterRegistry<V: ?Sized> {
	lattice: Lattice,
	config: RegistryConfig,
	tables: RwLock<FxHashMap<usize, OrderTable<Arc<V>>>>,
}

impl<V: ?Sized> std::fmt::Debug for AdapterRegistry<V> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut orders: Vec<_> = self.tables.read().keys().copied().collect();
		orders.sort_unstable();
		f.debug_struct("AdapterRegistry")
			.field("label", &self.config.label)
			.field("orders", &orders)
			.finish()
	}
}

impl<V: ?Sized> AdapterRegistry<V> {
	pub fn new(lattice: Lattice) -> Self {
		Self::with_config(lattice, RegistryConfig::default())
	}

	pub fn with_config(lattice: Lattice, config: RegistryConfig) -> Self {
		Self {
			lattice,
			config,
			tables: RwLock::new(FxHashMap::default()),
		}
	}

	pub fn lattice(&self) -> &Lattice {
		&self.lattice
	}

	pub fn config(&self) -> &RegistryConfig {
		&self.config
	}

	/// Stores the registration's value, returning the one it replaced.
	///
	/// # Errors
	///
	/// [`RegistryError::MissingValue`] without a value,
	/// [`RegistryError::UnknownSpec`] for ids outside the lattice and
	/// [`RegistryError::OrderTooLarge`] past the configured order.
	pub fn register(&self, registration: Registration<V>) -> Result<Option<Arc<V>>, RegistryError> {
		let (key, value) = registration.into_parts()?;
		let graph = self.lattice.snapshot();
		key.validate(&graph, self.config.max_order)?;

		let replaced = self
			.tables
			.write()
			.entry(key.order())
			.or_default()
			.insert(&graph, &key, value);
		debug!(
			registry = %self.config.label,
			order = key.order(),
			provided = %key.provided,
			name = %key.name,
			replaced = replaced.is_some(),
			"adapter registered"
		);
		Ok(replaced)
	}

	/// Removes the value at the exact key.
	///
	/// With `value` set, only removes when the stored value is that same
	/// allocation. Returns the removed value; a mismatch or missing key is a
	/// no-op.
	pub fn unregister(
		&self,
		required: &[SpecId],
		provided: SpecId,
		name: &str,
		value: Option<&Arc<V>>,
	) -> Option<Arc<V>> {
		let key = RegistrationKey::new(required, provided, name);
		let mut tables = self.tables.write();
		let table = tables.get_mut(&key.order())?;
		let stored = table.get(&key)?;
		if value.is_some_and(|v| !Arc::ptr_eq(stored, v)) {
			trace!(registry = %self.config.label, name, "unregister skipped: value differs");
			return None;
		}
		let removed = table.remove(&key);
		if table.is_empty() {
			tables.remove(&key.order());
		}
		debug!(registry = %self.config.label, order = key.order(), provided = %provided, name, "adapter unregistered");
		removed
	}

	/// Most specific value for `required` providing `provided` under `name`.
	///
	/// Each required dimension is matched greedily through its ancestry,
	/// first dimension first. Below the matched required specs the first
	/// registered provided spec extending `provided` that holds `name` wins.
	pub fn lookup(&self, required: &[SpecId], provided: SpecId, name: &str) -> Option<Arc<V>> {
		let required = normalize_required(required);
		let graph = self.lattice.snapshot();
		refresh_order(&self.tables, required.len(), &graph);
		let tables = self.tables.read();
		let table = tables.get(&required.len())?;
		let extendor = table.extendors().get(provided);
		if extendor.is_empty() {
			return None;
		}

		let keys: SmallVec<[Segment; 4]> = required.iter().map(|&s| Segment::Spec(s)).collect();
		let node = table
			.map()
			.detect_expansion(&keys, |_, segment| ancestry_segments(&graph, segment, false))?;
		let name = Segment::Name(Arc::from(name));
		extendor
			.iter()
			.find_map(|&p| node.child(&Segment::Spec(p))?.child(&name)?.leaf().cloned())
	}

	/// [`AdapterRegistry::lookup`] falling back to `default`.
	pub fn lookup_or(&self, required: &[SpecId], provided: SpecId, name: &str, default: Arc<V>) -> Arc<V> {
		self.lookup(required, provided, name).unwrap_or(default)
	}

	/// Every name reachable for `required` and `provided`.
	///
	/// Matches are merged from the most general required ancestry to the most
	/// specific, so a more specific registration of a name overrides a more
	/// general one.
	pub fn lookup_all(&self, required: &[SpecId], provided: SpecId) -> BTreeMap<Arc<str>, Arc<V>> {
		let required = normalize_required(required);
		let order = required.len();
		let graph = self.lattice.snapshot();
		refresh_order(&self.tables, order, &graph);
		let tables = self.tables.read();
		let mut out = BTreeMap::new();
		let Some(table) = tables.get(&order) else {
			return out;
		};
		let provided_candidates = extendor_segments(table.extendors().get(provided), true);
		if provided_candidates.is_empty() {
			return out;
		}

		let keys = prefix_segments(&required, provided);
		let nodes = table.map().select_expansions(&keys, |pos, segment| {
			if pos < order {
				ancestry_segments(&graph, segment, true)
			} else {
				provided_candidates.clone()
			}
		});
		for node in nodes {
			for (segment, child) in node.children() {
				if let (Segment::Name(name), Some(value)) = (segment, child.leaf()) {
					out.insert(name.clone(), value.clone());
				}
			}
		}
		out
	}

	/// Value registered at exactly this key, without any expansion.
	pub fn first(&self, required: &[SpecId], provided: SpecId, name: &str) -> Option<Arc<V>> {
		let key = RegistrationKey::new(required, provided, name);
		self.tables.read().get(&key.order())?.get(&key).cloned()
	}

	/// Values registered at exactly `(required, provided)`, sorted by name.
	pub fn all(&self, required: &[SpecId], provided: SpecId) -> Vec<(Arc<str>, Arc<V>)> {
		let required = normalize_required(required);
		let tables = self.tables.read();
		tables.get(&required.len()).map_or_else(Vec::new, |table| {
			table
				.named(&required, provided)
				.into_iter()
				.map(|(name, value)| (name, value.clone()))
				.collect()
		})
	}
}

impl<O, R> AdapterRegistry<Factory<O, R>> {
	/// Adapts `objects` to `provided`.
	///
	/// Each object's required spec is the declaration `provider` reports for
	/// it. The matching factory is called with the objects; `None` when no
	/// factory matches or the factory declines.
	pub fn get<P>(&self, provider: &P, objects: &[O], provided: SpecId, name: &str) -> Option<R>
	where
		P: DeclarationProvider<O> + ?Sized,
	{
		let required: Required = objects.iter().map(|o| provider.provided_by(o)).collect();
		let factory = self.lookup(&required, provided, name)?;
		factory(objects)
	}

	pub fn get_or<P>(&self, provider: &P, objects: &[O], provided: SpecId, name: &str, default: R) -> R
	where
		P: DeclarationProvider<O> + ?Sized,
	{
		self.get(provider, objects, provided, name).unwrap_or(default)
	}
}

#[cfg(test)]
mod tests;
