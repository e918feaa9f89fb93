use crate::error::VecEnvError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_RENDER_INTERVAL: u32 = 100;

/// Executor tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Completed step rounds between render broadcasts. Must be positive.
    pub render_interval: u32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self { render_interval: DEFAULT_RENDER_INTERVAL }
    }
}

impl ExecutorConfig {
    /// # Errors
    ///
    /// [`VecEnvError::InvalidConfig`] for a zero interval.
    pub fn new(render_interval: u32) -> Result<Self, VecEnvError> {
        let config = Self { render_interval };
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// [`VecEnvError::InvalidConfig`] for a zero interval; a deserialized
    /// config should be validated before use.
    pub fn validate(&self) -> Result<(), VecEnvError> {
        if self.render_interval == 0 {
            return Err(VecEnvError::InvalidConfig("render_interval must be positive".to_owned()));
        }
        Ok(())
    }
}
