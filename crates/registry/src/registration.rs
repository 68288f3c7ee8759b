use std::sync::Arc;

use concord_lattice::SpecId;

use crate::RegistryError;
use crate::key::{Required, RegistrationKey};

/// Callable adapter factory: builds a value from the adapted objects.
pub type Factory<O, R> = dyn Fn(&[O]) -> Option<R> + Send + Sync;

/// Callable subscriber: receives the objects, may produce a result.
pub type Subscriber<O, R> = dyn Fn(&[O]) -> Option<R> + Send + Sync;

/// Builder for one adapter or subscriber registration.
///
/// ```ignore
/// registry.register(
///     Registration::new()
///         .required(file)
///         .provided(reader)
///         .name("buffered")
///         .value(factory),
/// )?;
/// ```
pub struct Registration<V: ?Sized> {
	required: Required,
	provided: Option<SpecId>,
	name: Arc<str>,
	value: Option<Arc<V>>,
}

impl<V: ?Sized> Default for Registration<V> {
	fn default() -> Self {
		Self {
			required: Required::new(),
			provided: None,
			name: Arc::from(""),
			value: None,
		}
	}
}

impl<V: ?Sized> Registration<V> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a required dimension.
	pub fn required(mut self, spec: SpecId) -> Self {
		self.required.push(spec);
		self
	}

	/// Appends several required dimensions in order.
	pub fn required_all(mut self, specs: &[SpecId]) -> Self {
		self.required.extend_from_slice(specs);
		self
	}

	/// Appends a wildcard dimension that any object satisfies.
	pub fn any(self) -> Self {
		self.required(SpecId::ROOT)
	}

	pub fn provided(mut self, spec: SpecId) -> Self {
		self.provided = Some(spec);
		self
	}

	pub fn name(mut self, name: &str) -> Self {
		self.name = Arc::from(name);
		self
	}

	pub fn value(mut self, value: Arc<V>) -> Self {
		self.value = Some(value);
		self
	}

	/// Splits into the normalized key and the value.
	pub(crate) fn into_parts(self) -> Result<(RegistrationKey, Arc<V>), RegistryError> {
		let value = self.value.ok_or(RegistryError::MissingValue)?;
		let key = RegistrationKey {
			required: crate::key::normalize_required(&self.required),
			provided: self.provided.unwrap_or(SpecId::ROOT),
			name: self.name,
		};
		Ok((key, value))
	}
}

impl<O, R> Registration<Factory<O, R>> {
	/// Sets a closure as the value.
	pub fn handler<F>(self, f: F) -> Self
	where
		F: Fn(&[O]) -> Option<R> + Send + Sync + 'static,
	{
		self.value(Arc::new(f))
	}
}
