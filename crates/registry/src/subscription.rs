//! Multi-slot subscriber registry.
//!
//! Keys have the same shape as adapter keys but always use the empty name,
//! and each key holds an ordered list. Lookups gather every matching list,
//! least specific first, so general subscribers run before specific ones.

use std::sync::Arc;

use concord_lattice::{DeclarationProvider, Lattice, SpecId};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::key::{RegistrationKey, Required, normalize_required};
use crate::registration::{Registration, Subscriber};
use crate::table::{OrderTable, ancestry_segments, extendor_segments, refresh_order};
use crate::{RegistryConfig, RegistryError};

/// Subscription registry over values of type `V`.
pub struct SubscriptionRegistry<V: ?Sized> {
	lattice: Lattice,
	config: RegistryConfig,
	tables: RwLock<FxHashMap<usize, OrderTable<Vec<Arc<V>>>>>,
}

impl<V: ?Sized> std::fmt::Debug for SubscriptionRegistry<V> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut orders: Vec<_> = self.tables.read().keys().copied().collect();
		orders.sort_unstable();
		f.debug_struct("SubscriptionRegistry")
			.field("label", &self.config.label)
			.field("orders", &orders)
			.finish()
	}
}

impl<V: ?Sized> SubscriptionRegistry<V> {
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

	/// Appends the registration's value to the list at its key.
	///
	/// The registration's name is ignored; subscriptions are unnamed.
	pub fn subscribe(&self, registration: Registration<V>) -> Result<(), RegistryError> {
		let (mut key, value) = registration.into_parts()?;
		key.name = Arc::from("");
		let graph = self.lattice.snapshot();
		key.validate(&graph, self.config.max_order)?;

		let mut tables = self.tables.write();
		let table = tables.entry(key.order()).or_default();
		let count = match table.get_mut(&key) {
			Some(list) => {
				list.push(value);
				list.len()
			}
			None => {
				table.insert(&graph, &key, vec![value]);
				1
			}
		};
		debug!(
			registry = %self.config.label,
			order = key.order(),
			provided = %key.provided,
			count,
			"subscriber added"
		);
		Ok(())
	}

	/// Removes subscribers at the exact key.
	///
	/// With `value` set only that allocation is removed, otherwise the whole
	/// list. Returns how many subscribers were dropped.
	pub fn unsubscribe(&self, required: &[SpecId], provided: SpecId, value: Option<&Arc<V>>) -> usize {
		let key = RegistrationKey::new(required, provided, "");
		let mut tables = self.tables.write();
		let Some(table) = tables.get_mut(&key.order()) else {
			return 0;
		};
		let Some(list) = table.get_mut(&key) else {
			return 0;
		};
		let before = list.len();
		match value {
			Some(value) => list.retain(|v| !Arc::ptr_eq(v, value)),
			None => list.clear(),
		}
		let removed = before - list.len();
		if list.is_empty() {
			table.remove(&key);
		}
		if table.is_empty() {
			tables.remove(&key.order());
		}
		if removed > 0 {
			debug!(registry = %self.config.label, order = key.order(), provided = %provided, removed, "subscribers removed");
		}
		removed
	}

	/// Subscribers at exactly `(required, provided)`, in subscription order.
	pub fn select(&self, required: &[SpecId], provided: SpecId) -> Vec<Arc<V>> {
		let key = RegistrationKey::new(required, provided, "");
		self.tables
			.read()
			.get(&key.order())
			.and_then(|table| table.get(&key))
			.cloned()
			.unwrap_or_default()
	}

	/// Every subscriber matching `required` and `provided`.
	///
	/// Lists are visited from the most general required ancestry to the most
	/// specific; each list keeps subscription order.
	pub fn lookup(&self, required: &[SpecId], provided: SpecId) -> Vec<Arc<V>> {
		let required = normalize_required(required);
		let order = required.len();
		let graph = self.lattice.snapshot();
		refresh_order(&self.tables, order, &graph);
		let tables = self.tables.read();
		let Some(table) = tables.get(&order) else {
			return Vec::new();
		};
		let provided_candidates = extendor_segments(table.extendors().get(provided), true);
		if provided_candidates.is_empty() {
			return Vec::new();
		}

		let key = RegistrationKey::new(&required, provided, "");
		table
			.map()
			.select_expansions(&key.segments(), |pos, segment| match pos.cmp(&order) {
				std::cmp::Ordering::Less => ancestry_segments(&graph, segment, true),
				std::cmp::Ordering::Equal => provided_candidates.clone(),
				std::cmp::Ordering::Greater => vec![segment.clone()],
			})
			.into_iter()
			.filter_map(|node| node.leaf())
			.flat_map(|list| list.iter().cloned())
			.collect()
	}

	/// Same as [`SubscriptionRegistry::lookup`].
	pub fn all(&self, required: &[SpecId], provided: SpecId) -> Vec<Arc<V>> {
		self.lookup(required, provided)
	}
}

impl<O, R> SubscriptionRegistry<Subscriber<O, R>> {
	fn matching<P>(&self, provider: &P, objects: &[O], provided: SpecId) -> Vec<Arc<Subscriber<O, R>>>
	where
		P: DeclarationProvider<O> + ?Sized,
	{
		let required: Required = objects.iter().map(|o| provider.provided_by(o)).collect();
		self.lookup(&required, provided)
	}

	/// Calls every matching subscriber and keeps the results they produce.
	pub fn get<P>(&self, provider: &P, objects: &[O], provided: SpecId) -> Vec<R>
	where
		P: DeclarationProvider<O> + ?Sized,
	{
		self.matching(provider, objects, provided)
			.into_iter()
			.filter_map(|subscriber| subscriber(objects))
			.collect()
	}

	/// Calls every matching subscriber for its side effects. Returns how many
	/// ran.
	pub fn call<P>(&self, provider: &P, objects: &[O], provided: SpecId) -> usize
	where
		P: DeclarationProvider<O> + ?Sized,
	{
		let subscribers = self.matching(provider, objects, provided);
		for subscriber in &subscribers {
			let _ = subscriber(objects);
		}
		subscribers.len()
	}
}
