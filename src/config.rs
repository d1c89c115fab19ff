//! Model configuration
//!
//! Coefficients of both models and the input-validation policy, loaded from
//! TOML. Every section is optional; missing fields take the reference values
//! from each model's `constants` module.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::memo::DEFAULT_MAX_ENTRIES;
use crate::params::UnknownParameters;
use crate::policy::PolicyCoefficients;
use crate::reactor::ReactorCoefficients;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid coefficient `{field}` = {value}: {reason}")]
    Invalid {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ValidationConfig {
    pub unknown_parameters: UnknownParameters,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Distinct results kept before the oldest is evicted
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ModelConfig {
    pub reactor: ReactorCoefficients,
    pub policy: PolicyCoefficients,
    pub validation: ValidationConfig,
    pub cache: CacheConfig,
}

impl ModelConfig {
    /// Load and check a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        log::info!("loaded model config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: ModelConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject coefficients that would put the models outside their domain
    pub fn validate(&self) -> Result<(), ConfigError> {
        let r = &self.reactor;
        let p = &self.policy;
        positive("reactor.nominal_thermal_mw", r.nominal_thermal_mw)?;
        positive("reactor.heavy_metal_t", r.heavy_metal_t)?;
        positive("reactor.sink_temperature_k", r.sink_temperature_k)?;
        positive("reactor.thermal_time_constant_s", r.thermal_time_constant_s)?;
        non_negative("reactor.fuel_temperature_rise_k", r.fuel_temperature_rise_k)?;
        fraction("policy.capacity_factor", p.capacity_factor)?;
        fraction("policy.fossil_share", p.fossil_share)?;
        positive("policy.ev_kwh_per_km", p.ev_kwh_per_km)?;
        positive("policy.km_per_vehicle_year", p.km_per_vehicle_year)?;
        positive("cache.max_entries", self.cache.max_entries as f64)?;
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid { field, value, reason: "must be a positive number" })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid { field, value, reason: "must not be negative" })
    }
}

fn fraction(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid { field, value, reason: "must lie in [0, 1]" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_is_default() {
        let config = ModelConfig::from_toml_str("").unwrap();
        assert_eq!(config, ModelConfig::default());
        assert_eq!(config.validation.unknown_parameters, UnknownParameters::Reject);
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config = ModelConfig::from_toml_str(
            r#"
            [reactor]
            nominal_thermal_mw = 2500.0

            [validation]
            unknown_parameters = "ignore"
            "#,
        )
        .unwrap();
        assert_eq!(config.reactor.nominal_thermal_mw, 2500.0);
        assert_eq!(config.reactor.heavy_metal_t, crate::reactor::constants::HEAVY_METAL_T);
        assert_eq!(config.validation.unknown_parameters, UnknownParameters::Ignore);
    }

    #[test]
    fn test_invalid_coefficient_rejected() {
        let err = ModelConfig::from_toml_str("[policy]\nfossil_share = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "policy.fossil_share", .. }));
    }

    #[test]
    fn test_cache_capacity() {
        let config = ModelConfig::from_toml_str("[cache]\nmax_entries = 64\n").unwrap();
        assert_eq!(config.cache.max_entries, 64);

        let err = ModelConfig::from_toml_str("[cache]\nmax_entries = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "cache.max_entries", .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[policy]\ncapacity_factor = 0.9").unwrap();
        let config = ModelConfig::load(file.path()).unwrap();
        assert_eq!(config.policy.capacity_factor, 0.9);
    }

    #[test]
    fn test_missing_file() {
        let err = ModelConfig::load("/nonexistent/thorium-sim.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_bundled_sample_config() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/thorium-sim.toml");
        let config = ModelConfig::load(path).unwrap();
        assert_eq!(config, ModelConfig::default());
    }
}
