//! TOML-loadable run configuration (spec §6): the `BranchAndBoundSettings`
//! and `GreedySettings` option sets, plus which greedy variant to use for
//! initialization or as a standalone solve.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::bnb::BranchAndBoundSettings;
use crate::error::{LayoutEmbeddingError, Result};
use crate::greedy::GreedySettings;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GreedyVariant {
    Praun,
    Kraevoy,
    Schreiner,
    BlockingAware,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub greedy_variant: GreedyVariant,
    pub greedy: GreedySettings,
    pub branch_and_bound: BranchAndBoundSettings,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            greedy_variant: GreedyVariant::Praun,
            greedy: GreedySettings::default(),
            branch_and_bound: BranchAndBoundSettings::default(),
        }
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| LayoutEmbeddingError::InvalidInput(format!("malformed config: {e}")))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| LayoutEmbeddingError::InvalidInput(format!("cannot serialize config: {e}")))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = Config::default();
        let text = config.to_toml_string().unwrap();
        let reloaded = Config::from_toml_str(&text).unwrap();
        assert_eq!(reloaded.greedy_variant, config.greedy_variant);
        assert_eq!(reloaded.branch_and_bound.time_limit_secs, config.branch_and_bound.time_limit_secs);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config = Config::from_toml_str("greedy_variant = \"kraevoy\"\n").unwrap();
        assert_eq!(config.greedy_variant, GreedyVariant::Kraevoy);
        assert_eq!(config.branch_and_bound.time_limit_secs, BranchAndBoundSettings::default().time_limit_secs);
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(Config::from_toml_str("not valid toml :::").is_err());
    }
}
