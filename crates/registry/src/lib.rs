//! Specificity-ranked dispatch over a capability lattice.
//!
//! Registrations are keyed by the specs their inputs must provide (the
//! required dimensions), the spec they produce (provided) and a name. Lookups
//! expand each required dimension through its ancestry and the provided
//! dimension through the registered specs extending it.
//!
//! - [`AdapterRegistry`] keeps one value per key and returns the most
//!   specific match.
//! - [`SubscriptionRegistry`] keeps an ordered list per key and returns every
//!   match, general before specific.
//! - [`AdapterHooks`] chains adaptation attempts, registry-backed or not.
//!
//! Storage is split by order (the number of required dimensions), each order
//! holding a [`NestedKeyMap`] and an [`ExtendorIndex`].

mod adapter;
mod config;
mod error;
mod extendor;
mod hooks;
mod key;
mod nested;
mod registration;
mod subscription;
pub(crate) mod table;

pub use adapter::AdapterRegistry;
pub use config::RegistryConfig;
pub use error::{ConfigError, RegistryError};
pub use extendor::{Extendor, ExtendorIndex};
pub use hooks::{AdapterHook, AdapterHooks};
pub use key::{RegistrationKey, Required, Segment};
pub use nested::{NestedKeyMap, Node};
pub use registration::{Factory, Registration, Subscriber};
pub use subscription::SubscriptionRegistry;
