// ⚙️ Configuration - business constants as data
// Loaded from a JSON file; every field has a default, so `{}` is a valid config.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::normalize::{BrandNormalizer, DEFAULT_BRAND_SUFFIXES, DEFAULT_CITY_GAZETTEER};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconConfig {
    /// Absolute tolerance for delivery prices (default: 0.01)
    pub price_tolerance: f64,

    /// Generic words stripped from the end of park brands
    pub brand_suffixes: Vec<String>,

    /// City names stripped anywhere in park brands
    pub city_gazetteer: Vec<String>,

    /// Prefix of the record id given to synthesized counterparts
    pub placeholder_prefix: String,
}

impl Default for ReconConfig {
    fn default() -> Self {
        ReconConfig {
            price_tolerance: 0.01,
            brand_suffixes: DEFAULT_BRAND_SUFFIXES.iter().map(|s| s.to_string()).collect(),
            city_gazetteer: DEFAULT_CITY_GAZETTEER.iter().map(|s| s.to_string()).collect(),
            placeholder_prefix: "SYN".to_string(),
        }
    }
}

impl ReconConfig {
    /// Load configuration from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: ReconConfig =
            serde_json::from_str(content).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.price_tolerance.is_finite() || self.price_tolerance < 0.0 {
            bail!(
                "price_tolerance must be a non-negative number, got {}",
                self.price_tolerance
            );
        }
        if self.placeholder_prefix.trim().is_empty() {
            bail!("placeholder_prefix must not be empty");
        }
        Ok(())
    }

    pub fn brand_normalizer(&self) -> BrandNormalizer {
        BrandNormalizer::new(self.brand_suffixes.as_slice(), self.city_gazetteer.as_slice())
    }
}
