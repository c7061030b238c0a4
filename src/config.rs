use crate::transport::SerialSettings;
use crate::types::{
    COMPLETION_MARKER, DEFAULT_BAUD_RATE, DEFAULT_HISTORY_SIZE, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_READ_TIMEOUT_MS, DEFAULT_SETTLE_MS,
};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("history_size debe ser mayor que 0")]
    EmptyHistory,

    #[error("completion_marker no puede estar vacío")]
    EmptyMarker,

    #[error("baud_rate debe ser mayor que 0")]
    InvalidBaudRate,

    #[error("read_timeout_ms debe ser mayor que 0")]
    InvalidReadTimeout,
}

/// Configuración del proceso
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Puerto serie; `"AUTO"` para detectar, ausente para modo sin actuador
    pub port: Option<String>,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    /// Espera tras abrir el puerto antes de limpiar la entrada
    pub settle_ms: u64,
    pub history_size: usize,
    pub completion_marker: String,
    /// Cada cuánto se revisa la señal de parada si no llegan frames
    pub poll_interval_ms: u64,
    /// Ritmo de reproducción de CSV (≈30 fps)
    pub replay_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            settle_ms: DEFAULT_SETTLE_MS,
            history_size: DEFAULT_HISTORY_SIZE,
            completion_marker: COMPLETION_MARKER.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            replay_interval_ms: 33,
        }
    }
}

impl Config {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_size == 0 {
            return Err(ConfigError::EmptyHistory);
        }
        if self.completion_marker.is_empty() {
            return Err(ConfigError::EmptyMarker);
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::InvalidBaudRate);
        }
        // Con timeout 0 el hilo lector giraría sin pausa
        if self.read_timeout_ms == 0 {
            return Err(ConfigError::InvalidReadTimeout);
        }
        Ok(())
    }

    /// Parámetros serie para un puerto ya resuelto
    pub fn serial_settings(&self, port: &str) -> SerialSettings {
        SerialSettings {
            port: port.to_string(),
            baud_rate: self.baud_rate,
            read_timeout_ms: self.read_timeout_ms,
            settle_ms: self.settle_ms,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn replay_interval(&self) -> Duration {
        Duration::from_millis(self.replay_interval_ms)
    }
}
