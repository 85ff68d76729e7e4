//! Bus transport seam and simulated implementation.
//!
//! The raw word-level bus primitives are a platform concern: on the target
//! machine a Linux I2C transport implements [`BusTransport`] against the
//! kernel device node, while tests and hardware-free runs use
//! [`SimulatedBus`]. The driver only ever sees transport-order words; byte
//! order is handled by [`crate::registers`].

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;

use crate::error::AppResult;
use crate::registers::{self, Channel, ConfigWord, Register};

/// Word-level access to the monitoring chip at its fixed bus address.
///
/// Implementations are pre-bound to one device; errors surface as
/// [`crate::error::MonitorError::HardwareCommunication`] and are treated as
/// fatal by callers. Individual transfers are expected to fail fast rather
/// than hang — transfer timeouts are the transport's responsibility.
#[async_trait]
pub trait BusTransport: Send + Sync {
    /// Read the 16-bit transport word at a register address.
    async fn read_register(&self, address: u8) -> AppResult<u16>;

    /// Write a 16-bit transport word to a register address.
    async fn write_register(&self, address: u8, word: u16) -> AppResult<()>;
}

// =============================================================================
// SimulatedBus - in-memory INA3221 stand-in
// =============================================================================

/// Simulated INA3221 register file.
///
/// Emulates the pieces of device behavior the driver depends on: a reset
/// request that reads back clear, per-channel shunt/bus voltage registers,
/// and optional jitter so sampled values are not bit-identical. Values are
/// stored device-order and converted at the word boundary, the same place the
/// real transport swaps bytes.
pub struct SimulatedBus {
    registers: Mutex<HashMap<u8, u16>>,
    jitter: u16,
}

impl SimulatedBus {
    /// Default simulated shunt register value (decoded, device order).
    pub const DEFAULT_SHUNT_RAW: u16 = 1000;
    /// Default simulated bus register value: 12.0 V after scaling.
    pub const DEFAULT_BUS_RAW: u16 = 12000;

    /// Simulated device with fixed register values (no jitter).
    pub fn new() -> Self {
        Self::with_values(Self::DEFAULT_SHUNT_RAW, Self::DEFAULT_BUS_RAW)
    }

    /// Simulated device returning `shunt_raw` / `bus_raw` on every channel.
    pub fn with_values(shunt_raw: u16, bus_raw: u16) -> Self {
        let mut registers = HashMap::new();
        for ch in Channel::ALL {
            registers.insert(Register::ShuntVoltage(ch).address(), shunt_raw);
            registers.insert(Register::BusVoltage(ch).address(), bus_raw);
        }
        registers.insert(
            Register::ShuntVoltageSum.address(),
            shunt_raw.wrapping_mul(3),
        );
        registers.insert(Register::Config.address(), 0);
        Self {
            registers: Mutex::new(registers),
            jitter: 0,
        }
    }

    /// Add uniform jitter of up to `jitter` counts to every voltage read.
    pub fn with_jitter(mut self, jitter: u16) -> Self {
        self.jitter = jitter;
        self
    }

    /// Overwrite a register with a device-order value.
    pub fn set_register(&self, register: Register, value: u16) {
        self.registers.lock().insert(register.address(), value);
    }
}

impl Default for SimulatedBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BusTransport for SimulatedBus {
    async fn read_register(&self, address: u8) -> AppResult<u16> {
        let mut value = self
            .registers
            .lock()
            .get(&address)
            .copied()
            .unwrap_or_default();
        if self.jitter > 0 && address != Register::Config.address() {
            value = value.wrapping_add(rand::thread_rng().gen_range(0..=self.jitter));
        }
        Ok(registers::encode_register(value))
    }

    async fn write_register(&self, address: u8, word: u16) -> AppResult<()> {
        let mut value = registers::decode_register(word);
        if address == Register::Config.address() && ConfigWord::reset_pending(value) {
            // A real part completes its reset faster than the next poll.
            value &= !ConfigWord::RESET;
        }
        self.registers.lock().insert(address, value);
        Ok(())
    }
}
