use concord_lattice::{LatticeError, SpecId};

/// Registration and adaptation failures.
///
/// Lookups never fail for a missing entry; they return `None` or the
/// caller's default instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
	/// `register` or `subscribe` was called without a value.
	#[error("cannot register without a value")]
	MissingValue,

	/// A key names a spec the registry's lattice does not contain.
	#[error("unknown specification {spec}")]
	UnknownSpec { spec: SpecId },

	/// A key has more required dimensions than the registry accepts.
	#[error("order {order} exceeds the configured maximum of {max}")]
	OrderTooLarge { order: usize, max: usize },

	/// No adapter hook produced a value for the requested interface.
	#[error("could not adapt {count} object(s) to {spec}")]
	CouldNotAdapt { spec: SpecId, count: usize },

	#[error(transparent)]
	Lattice(#[from] LatticeError),
}

/// Registry configuration could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("invalid registry config: {0}")]
	Parse(#[from] toml::de::Error),

	#[error("max_order must be at least 1")]
	ZeroOrder,
}
