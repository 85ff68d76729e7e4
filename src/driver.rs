//! INA3221 device driver.
//!
//! Owns the bring-up handshake (reset, operating configuration, first
//! conversion convergence) and exposes calibrated per-channel voltage and
//! current readings over any [`BusTransport`].
//!
//! Scaling constants are device calibration, not derivable from first
//! principles here: bus voltage is `counts / 1000` volts, shunt voltage is
//! `counts / 1000 / 2 / 10` volts (×20 internal gain, 10 µV LSB), and current
//! is `shunt_volts / shunt_resistor * 100` amps. The ×100 factor composes
//! with the shunt scale to give correct amps for the resistor value in ohms;
//! it must be preserved exactly.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::bus::BusTransport;
use crate::error::{AppResult, MonitorError};
use crate::registers::{self, Channel, ConfigWord, Register};

/// Default INA3221 bus address (A0 + A1 tied to GND).
pub const DEFAULT_ADDRESS: u8 = 0x40;

/// Default shunt resistor value in ohms.
pub const DEFAULT_SHUNT_RESISTOR: f64 = 0.1;

/// Attempts to observe the reset bit reading back clear before the device is
/// declared unresponsive.
const RESET_POLL_LIMIT: u32 = 100;

/// Startup convergence bound: attempts and the pause between them.
const CONVERGENCE_ATTEMPTS: u32 = 10;
const CONVERGENCE_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Which voltage register family to read for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoltageKind {
    /// Absolute voltage at the channel's load-side measurement point.
    Bus,
    /// Voltage drop across the channel's shunt resistor.
    Shunt,
}

/// Outcome of the bounded startup convergence wait.
///
/// The device reports all-zero readings until its first conversion cycle
/// completes. Initialization polls for non-zero readings on every channel;
/// if the bound expires the driver proceeds anyway, but the degraded outcome
/// is reported here rather than swallowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupConvergence {
    /// All channels reported non-zero voltage and current.
    Converged {
        /// Poll iterations it took (1-based).
        iterations: u32,
    },
    /// The bound expired; first readings may be inaccurate.
    TimedOut,
}

/// Driver for the TI INA3221 three-channel voltage/current monitor.
pub struct Ina3221<B> {
    bus: B,
    shunt_resistor: f64,
}

impl<B: BusTransport> Ina3221<B> {
    /// Create a driver over a transport bound to the device, with the shunt
    /// resistor value in ohms.
    pub fn new(bus: B, shunt_resistor: f64) -> Self {
        Self {
            bus,
            shunt_resistor,
        }
    }

    /// Reset and configure the device, then wait for the first conversion
    /// cycle to converge.
    ///
    /// Sequence: write the reset bit, poll the config register until the
    /// reset bit reads back clear (bounded — an unresponsive device is a
    /// hardware error, not an infinite spin), write the operating
    /// configuration, then poll all three channels for non-zero readings.
    pub async fn initialize(&self) -> AppResult<StartupConvergence> {
        self.write_register(Register::Config, ConfigWord::reset().bits())
            .await?;

        let mut polls = 0;
        loop {
            let config = self.read_register(Register::Config).await?;
            if !ConfigWord::reset_pending(config) {
                break;
            }
            polls += 1;
            if polls >= RESET_POLL_LIMIT {
                return Err(MonitorError::hardware(format!(
                    "reset bit still set after {RESET_POLL_LIMIT} config reads"
                )));
            }
        }

        self.write_register(Register::Config, ConfigWord::operating().bits())
            .await?;
        debug!(
            "operating configuration written: {:#06x}",
            ConfigWord::operating().bits()
        );

        let convergence = self.wait_for_convergence().await?;
        match convergence {
            StartupConvergence::Converged { iterations } => {
                info!(iterations, "INA3221 initialized");
            }
            StartupConvergence::TimedOut => {
                warn!(
                    attempts = CONVERGENCE_ATTEMPTS,
                    "INA3221 initialized but channels never reported non-zero; \
                     first readings may be inaccurate"
                );
            }
        }
        Ok(convergence)
    }

    /// Poll until every channel reports non-zero voltage and current, or the
    /// attempt bound expires.
    async fn wait_for_convergence(&self) -> AppResult<StartupConvergence> {
        for iteration in 1..=CONVERGENCE_ATTEMPTS {
            let mut all_live = true;
            for ch in Channel::ALL {
                let voltage = self.voltage(ch, VoltageKind::Bus).await?;
                let current = self.current(ch).await?;
                if voltage == 0.0 || current == 0.0 {
                    all_live = false;
                    break;
                }
            }
            if all_live {
                return Ok(StartupConvergence::Converged { iterations: iteration });
            }
            tokio::time::sleep(CONVERGENCE_POLL_INTERVAL).await;
        }
        Ok(StartupConvergence::TimedOut)
    }

    /// Voltage for a channel in volts.
    pub async fn voltage(&self, channel: Channel, kind: VoltageKind) -> AppResult<f64> {
        let register = match kind {
            VoltageKind::Bus => Register::BusVoltage(channel),
            VoltageKind::Shunt => Register::ShuntVoltage(channel),
        };
        let counts = registers::to_signed(self.read_register(register).await?);
        Ok(match kind {
            VoltageKind::Bus => f64::from(counts) / 1000.0,
            VoltageKind::Shunt => f64::from(counts) / 1000.0 / 2.0 / 10.0,
        })
    }

    /// Current for a channel in amps, derived from the shunt voltage drop.
    pub async fn current(&self, channel: Channel) -> AppResult<f64> {
        Ok(self.voltage(channel, VoltageKind::Shunt).await? / self.shunt_resistor * 100.0)
    }

    /// Sum of all shunt voltages in volts.
    pub async fn shunt_voltage_sum(&self) -> AppResult<f64> {
        let counts = registers::to_signed(self.read_register(Register::ShuntVoltageSum).await?);
        Ok(f64::from(counts) / 1000.0 / 2.0 / 10.0)
    }

    /// Read a register and canonicalize to host order.
    async fn read_register(&self, register: Register) -> AppResult<u16> {
        let raw = self.bus.read_register(register.address()).await?;
        Ok(registers::decode_register(raw))
    }

    /// Write a host-order value in transport order.
    async fn write_register(&self, register: Register, value: u16) -> AppResult<()> {
        self.bus
            .write_register(register.address(), registers::encode_register(value))
            .await
    }
}
