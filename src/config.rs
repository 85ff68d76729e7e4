//! Configuration management.
//!
//! Settings come from three layers: built-in defaults, an optional
//! `config/<name>.toml` file, and `POWER_STREAM_*` environment variables.
//! The bus transport itself is a platform collaborator; these settings only
//! parameterize it.

use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{AppResult, MonitorError};

fn default_i2c_bus() -> u8 {
    1
}

fn default_device_address() -> u8 {
    crate::driver::DEFAULT_ADDRESS
}

fn default_shunt_resistor_ohms() -> f64 {
    crate::driver::DEFAULT_SHUNT_RESISTOR
}

fn default_sample_period_secs() -> f64 {
    1.0
}

fn default_mean_period_cnt() -> usize {
    30
}

fn default_machine_id_path() -> PathBuf {
    PathBuf::from(crate::identity::DEFAULT_MACHINE_ID_PATH)
}

/// Application settings with documented defaults.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Platform bus number the device sits on.
    #[serde(default = "default_i2c_bus")]
    pub i2c_bus: u8,
    /// Device bus address (0x40 with A0 and A1 grounded).
    #[serde(default = "default_device_address")]
    pub device_address: u8,
    /// Shunt resistor value in ohms.
    #[serde(default = "default_shunt_resistor_ohms")]
    pub shunt_resistor_ohms: f64,
    /// Seconds between raw samples.
    #[serde(default = "default_sample_period_secs")]
    pub sample_period_secs: f64,
    /// Raw samples averaged into one mean record.
    #[serde(default = "default_mean_period_cnt")]
    pub mean_period_cnt: usize,
    /// Machine identity source.
    #[serde(default = "default_machine_id_path")]
    pub machine_id_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            i2c_bus: default_i2c_bus(),
            device_address: default_device_address(),
            shunt_resistor_ohms: default_shunt_resistor_ohms(),
            sample_period_secs: default_sample_period_secs(),
            mean_period_cnt: default_mean_period_cnt(),
            machine_id_path: default_machine_id_path(),
        }
    }
}

impl Settings {
    /// Load settings from `config/<name>.toml` (optional) layered with
    /// `POWER_STREAM_*` environment overrides.
    pub fn new(config_name: Option<&str>) -> AppResult<Self> {
        let config_path = format!("config/{}", config_name.unwrap_or("default"));
        let s = Config::builder()
            .add_source(File::with_name(&config_path).required(false))
            .add_source(Environment::with_prefix("POWER_STREAM"))
            .build()
            .map_err(MonitorError::Config)?;

        let settings: Settings = s.try_deserialize().map_err(MonitorError::Config)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that parse but cannot run.
    pub fn validate(&self) -> AppResult<()> {
        if self.sample_period_secs <= 0.0 {
            return Err(MonitorError::Configuration(format!(
                "sample_period_secs must be positive, got {}",
                self.sample_period_secs
            )));
        }
        if self.mean_period_cnt == 0 {
            return Err(MonitorError::Configuration(
                "mean_period_cnt must be at least 1".into(),
            ));
        }
        if self.device_address > 0x7f {
            return Err(MonitorError::Configuration(format!(
                "device_address {:#04x} is not a 7-bit bus address",
                self.device_address
            )));
        }
        Ok(())
    }
}
