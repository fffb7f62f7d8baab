use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{compute::BackendKind, Activation, Error, Result};

/// Settings of a training run. Every field has a default, so a YAML file only
/// needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainConfig {
    /// Hidden layer size, used only when weights are generated.
    pub hidden: usize,
    pub learning_rate: f64,
    pub max_epochs: usize,
    pub activation: Activation,
    pub backend: BackendKind,
    /// Parallel backend pool size; `0` uses rayon's global pool.
    pub threads: usize,
    /// Weight generation seed, drawn at random when absent.
    pub seed: Option<u64>,
    pub output_prefix: String,
    pub save_improvements: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            hidden: 1,
            learning_rate: 0.5,
            max_epochs: 1_000_000,
            activation: Activation::Sigmoid,
            backend: BackendKind::Sequential,
            threads: 0,
            seed: None,
            output_prefix: "W".to_string(),
            save_improvements: true,
        }
    }
}

impl TrainConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = serde_yaml::from_str(&std::fs::read_to_string(path)?)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.learning_rate.is_finite() || self.learning_rate <= 0. {
            return Err(Error::InvalidConfig(format!(
                "learning rate must be a positive number, got {}",
                self.learning_rate
            )));
        }
        if self.hidden == 0 {
            return Err(Error::InvalidConfig("hidden layer needs at least one neuron".to_string()));
        }
        Ok(())
    }
}
