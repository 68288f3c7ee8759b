//! Registry tuning loaded from TOML.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Settings shared by adapter and subscription registries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
	/// Name attached to every log event the registry emits.
	#[serde(default = "default_label")]
	pub label: String,
	/// Largest number of required dimensions a key may have.
	#[serde(default = "default_max_order")]
	pub max_order: usize,
}

fn default_label() -> String {
	"default".to_string()
}

/// Returns the default cap on required dimensions.
fn default_max_order() -> usize {
	8
}

impl Default for RegistryConfig {
	fn default() -> Self {
		Self {
			label: default_label(),
			max_order: default_max_order(),
		}
	}
}

impl RegistryConfig {
	pub fn labeled(label: impl Into<String>) -> Self {
		Self {
			label: label.into(),
			..Self::default()
		}
	}

	/// Parses a config table; missing fields take their defaults.
	pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(source)?;
		if config.max_order == 0 {
			return Err(ConfigError::ZeroOrder);
		}
		Ok(config)
	}
}
