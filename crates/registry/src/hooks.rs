//! Ordered adaptation hooks.
//!
//! An [`AdapterHooks`] instance holds callbacks that try to turn objects into
//! something providing a given spec. Hooks are asked in installation order and
//! the first one producing a value wins. A registry-backed hook is installed
//! with [`AdapterHooks::install_registry`].

use std::sync::Arc;

use concord_lattice::{DeclarationProvider, SpecId};
use parking_lot::RwLock;
use tracing::trace;

use crate::RegistryError;
use crate::adapter::AdapterRegistry;
use crate::registration::Factory;

/// One adaptation attempt for `(provided spec, objects)`.
pub type AdapterHook<O, R> = dyn Fn(SpecId, &[O]) -> Option<R> + Send + Sync;

/// Installed hooks, tried in order.
pub struct AdapterHooks<O, R> {
	hooks: RwLock<Vec<Arc<AdapterHook<O, R>>>>,
}

impl<O, R> Default for AdapterHooks<O, R> {
	fn default() -> Self {
		Self {
			hooks: RwLock::new(Vec::new()),
		}
	}
}

impl<O, R> std::fmt::Debug for AdapterHooks<O, R> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AdapterHooks")
			.field("len", &self.hooks.read().len())
			.finish()
	}
}

impl<O: 'static, R: 'static> AdapterHooks<O, R> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn install(&self, hook: Arc<AdapterHook<O, R>>) {
		self.hooks.write().push(hook);
	}

	pub fn install_fn<F>(&self, hook: F)
	where
		F: Fn(SpecId, &[O]) -> Option<R> + Send + Sync + 'static,
	{
		self.install(Arc::new(hook));
	}

	/// Installs a hook that looks up the unnamed adapter in `registry`.
	///
	/// Object declarations come from `provider`.
	pub fn install_registry<P>(&self, registry: Arc<AdapterRegistry<Factory<O, R>>>, provider: Arc<P>)
	where
		P: DeclarationProvider<O> + Send + Sync + 'static,
	{
		self.install_fn(move |provided, objects| registry.get(&*provider, objects, provided, ""));
	}

	pub fn clear(&self) {
		self.hooks.write().clear();
	}

	pub fn len(&self) -> usize {
		self.hooks.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.hooks.read().is_empty()
	}

	/// First value any hook produces for `objects` as `iface`.
	///
	/// Hooks run outside the lock and may install or clear hooks themselves;
	/// such changes apply from the next call.
	pub fn adapt(&self, iface: SpecId, objects: &[O]) -> Option<R> {
		let hooks = self.hooks.read().clone();
		let found = hooks.iter().enumerate().find_map(|(idx, hook)| {
			let value = hook(iface, objects)?;
			trace!(%iface, hook = idx, "adapted");
			Some(value)
		});
		if found.is_none() {
			trace!(%iface, hooks = hooks.len(), "no hook adapted");
		}
		found
	}

	/// [`AdapterHooks::adapt`], failing when no hook produces a value.
	///
	/// # Errors
	///
	/// [`RegistryError::CouldNotAdapt`] naming the spec and object count.
	pub fn adapt_strict(&self, iface: SpecId, objects: &[O]) -> Result<R, RegistryError> {
		self.adapt(iface, objects).ok_or(RegistryError::CouldNotAdapt {
			spec: iface,
			count: objects.len(),
		})
	}
}
