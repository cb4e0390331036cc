// Training configuration, loaded from YAML with per-field defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{Result, SpaceError};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyNetworkConfig {
    pub num_hidden_nodes: usize,
}

impl Default for PolicyNetworkConfig {
    fn default() -> Self { Self { num_hidden_nodes: 64 } }
}

/// Configuration of a behaviour-cloning run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Base seed; trial `i` runs its environment with `seed + i`.
    pub seed: u64,
    pub num_trials: usize,
    pub policy_network: PolicyNetworkConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: 12,
            num_trials: 10,
            policy_network: PolicyNetworkConfig::default(),
        }
    }
}

impl TrainingConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.policy_network.num_hidden_nodes == 0 {
            return Err(SpaceError::InvalidConfig(
                "policy_network.num_hidden_nodes must be > 0".into(),
            ));
        }
        Ok(())
    }
}
