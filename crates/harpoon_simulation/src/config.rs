//! Конфигурация симуляции (TOML)
//!
//! ```toml
//! [arbitration]
//! parallel_threshold = 8
//! chunk_size = 16
//! min_parallel_chunks = 2
//! drain_interval_ms = 16
//!
//! [network]
//! role = "server"
//!
//! [simulation]
//! tick_hz = 60.0
//! seed = 42
//! ```
//!
//! Все секции опциональны, отсутствующие поля берут default.

use std::time::Duration;

use bevy::prelude::*;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("arbitration.parallel_threshold must be >= 2 (got {0})")]
    ParallelThreshold(usize),

    #[error("arbitration.chunk_size must be >= 1")]
    ChunkSize,

    #[error("simulation.tick_hz must be positive (got {0})")]
    TickRate(f64),
}

/// Корневой config файл.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HarpoonConfig {
    pub arbitration: ArbiterConfig,
    pub network: NetworkConfig,
    pub simulation: SimulationConfig,
}

impl HarpoonConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: HarpoonConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.arbitration.validate()?;

        if !(self.simulation.tick_hz > 0.0) {
            return Err(ConfigError::TickRate(self.simulation.tick_hz));
        }

        Ok(())
    }
}

/// Параметры batching/parallel политики arbiter'а.
#[derive(Resource, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArbiterConfig {
    /// Batch size, начиная с которого drain уходит в parallel job.
    /// Deferral включается на половине этого значения.
    pub parallel_threshold: usize,

    /// Checks per worker chunk
    pub chunk_size: usize,

    /// Меньше стольких chunks → job выполняется на одном потоке
    pub min_parallel_chunks: usize,

    pub drain_interval_ms: u64,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: 8,
            chunk_size: 16,
            min_parallel_chunks: 2,
            drain_interval_ms: 16, // ~60Hz
        }
    }
}

impl ArbiterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parallel_threshold < 2 {
            return Err(ConfigError::ParallelThreshold(self.parallel_threshold));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::ChunkSize);
        }
        Ok(())
    }

    /// Queue length at which new contacts start being deferred.
    pub fn deferral_threshold(&self) -> usize {
        self.parallel_threshold / 2
    }

    /// Queue length that forces a drain without waiting for the interval.
    pub fn forced_drain_len(&self) -> usize {
        self.parallel_threshold * 2
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub role: NetworkRole,
}

/// Authority текущего процесса.
///
/// Только server выполняет destructive изменения (delete-on-remove,
/// manual removal). Client повторяет физику, но не удаляет entities.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Reflect)]
#[serde(rename_all = "lowercase")]
pub enum NetworkRole {
    #[default]
    Server,
    Client,
}

impl NetworkRole {
    pub fn is_server(&self) -> bool {
        matches!(self, NetworkRole::Server)
    }

    pub fn is_client(&self) -> bool {
        matches!(self, NetworkRole::Client)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub tick_hz: f64,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_hz: 60.0,
            seed: 42,
        }
    }
}
