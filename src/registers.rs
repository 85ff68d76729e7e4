//! INA3221 register map and 16-bit register codec.
//!
//! The INA3221 presents big-endian 16-bit registers, while the word-oriented
//! bus primitive hands them over in the opposite byte order. The codec here
//! canonicalizes every transfer to a host-order `u16` and back; the rest of
//! the crate never sees a transport-order word.
//!
//! Register addressing, channel restrictions, and the operating configuration
//! bits are closed types rather than raw integers, so an invalid channel or a
//! stray config bit cannot be expressed at a call site.

use crate::error::MonitorError;

// =============================================================================
// Register Codec
// =============================================================================

/// Convert a raw transport word into the device's host-order register value.
///
/// Total over the full 16-bit domain; `decode_register(encode_register(v)) == v`.
pub fn decode_register(raw: u16) -> u16 {
    raw.swap_bytes()
}

/// Convert a host-order register value into its transport word. Exact inverse
/// of [`decode_register`].
pub fn encode_register(value: u16) -> u16 {
    value.swap_bytes()
}

/// Reconstruct the signed magnitude of a register value.
///
/// Voltage registers are two's-complement: values above 32767 represent
/// negative readings (`value - 65536`).
pub fn to_signed(value: u16) -> i32 {
    if value > 0x7fff {
        i32::from(value) - 65536
    } else {
        i32::from(value)
    }
}

// =============================================================================
// Channels
// =============================================================================

/// One of the INA3221's three measurement channels.
///
/// Constructed via `TryFrom<u8>`, which rejects anything outside {0, 1, 2};
/// driver calls therefore cannot name a channel the device does not have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Channel 1 (index 0).
    Ch1,
    /// Channel 2 (index 1).
    Ch2,
    /// Channel 3 (index 2).
    Ch3,
}

impl Channel {
    /// All channels, in register order.
    pub const ALL: [Channel; 3] = [Channel::Ch1, Channel::Ch2, Channel::Ch3];

    /// Zero-based channel index used in register addressing.
    pub fn index(self) -> u8 {
        match self {
            Channel::Ch1 => 0,
            Channel::Ch2 => 1,
            Channel::Ch3 => 2,
        }
    }
}

impl TryFrom<u8> for Channel {
    type Error = MonitorError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        match index {
            0 => Ok(Channel::Ch1),
            1 => Ok(Channel::Ch2),
            2 => Ok(Channel::Ch3),
            other => Err(MonitorError::InvalidChannel(other)),
        }
    }
}

// =============================================================================
// Register Addresses
// =============================================================================

/// Addressable INA3221 registers.
///
/// Per-channel voltage registers are interleaved: shunt at `0x01 + index*2`,
/// bus at `0x02 + index*2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    /// Configuration register (0x00).
    Config,
    /// Shunt voltage for a channel (0x01, 0x03, 0x05).
    ShuntVoltage(Channel),
    /// Bus voltage for a channel (0x02, 0x04, 0x06).
    BusVoltage(Channel),
    /// Sum of all shunt voltages (0x0d).
    ShuntVoltageSum,
}

impl Register {
    const CONFIG: u8 = 0x00;
    const SHUNT_VOLTAGE_BASE: u8 = 0x01;
    const BUS_VOLTAGE_BASE: u8 = 0x02;
    const SHUNT_VOLTAGE_SUM: u8 = 0x0d;

    /// Bus address of the register.
    pub fn address(self) -> u8 {
        match self {
            Register::Config => Self::CONFIG,
            Register::ShuntVoltage(ch) => Self::SHUNT_VOLTAGE_BASE + ch.index() * 2,
            Register::BusVoltage(ch) => Self::BUS_VOLTAGE_BASE + ch.index() * 2,
            Register::ShuntVoltageSum => Self::SHUNT_VOLTAGE_SUM,
        }
    }
}

// =============================================================================
// Configuration Word
// =============================================================================

/// 16-bit configuration register bitfield.
///
/// Bit 15 is the reset request; it must read back as zero before the device
/// is usable. Bits 14..12 enable channels, 11..9 select averaging depth,
/// 8..6 and 5..3 the bus/shunt conversion times, and 2..0 the operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigWord(u16);

impl ConfigWord {
    /// Reset request / reset-in-progress bit.
    pub const RESET: u16 = 1 << 15;
    /// Channel 1 enable.
    pub const CH1_ENABLE: u16 = 1 << 14;
    /// Channel 2 enable.
    pub const CH2_ENABLE: u16 = 1 << 13;
    /// Channel 3 enable.
    pub const CH3_ENABLE: u16 = 1 << 12;
    /// Averaging mode bit 2.
    pub const AVG_2: u16 = 1 << 11;
    /// Averaging mode bit 1.
    pub const AVG_1: u16 = 1 << 10;
    /// Averaging mode bit 0.
    pub const AVG_0: u16 = 1 << 9;
    /// Bus-voltage conversion time bit 2.
    pub const VBUS_CT_2: u16 = 1 << 8;
    /// Bus-voltage conversion time bit 1.
    pub const VBUS_CT_1: u16 = 1 << 7;
    /// Bus-voltage conversion time bit 0.
    pub const VBUS_CT_0: u16 = 1 << 6;
    /// Shunt-voltage conversion time bit 2.
    pub const VSHUNT_CT_2: u16 = 1 << 5;
    /// Shunt-voltage conversion time bit 1.
    pub const VSHUNT_CT_1: u16 = 1 << 4;
    /// Shunt-voltage conversion time bit 0.
    pub const VSHUNT_CT_0: u16 = 1 << 3;
    /// Operating mode bit 2.
    pub const MODE_2: u16 = 1 << 2;
    /// Operating mode bit 1.
    pub const MODE_1: u16 = 1 << 1;
    /// Operating mode bit 0.
    pub const MODE_0: u16 = 1 << 0;

    /// Configuration word that requests a device reset.
    pub fn reset() -> Self {
        ConfigWord(Self::RESET)
    }

    /// Operating configuration: all three channels enabled, maximum
    /// averaging depth, maximum bus conversion time, continuous shunt+bus
    /// measurement mode.
    ///
    /// The shunt conversion-time field intentionally sets only its high bit;
    /// this matches the deployed calibration and must not be "completed".
    pub fn operating() -> Self {
        ConfigWord(
            Self::CH1_ENABLE
                | Self::CH2_ENABLE
                | Self::CH3_ENABLE
                | Self::AVG_2
                | Self::AVG_1
                | Self::AVG_0
                | Self::VBUS_CT_2
                | Self::VBUS_CT_1
                | Self::VBUS_CT_0
                | Self::VSHUNT_CT_2
                | Self::MODE_2
                | Self::MODE_1
                | Self::MODE_0,
        )
    }

    /// Raw register value.
    pub fn bits(self) -> u16 {
        self.0
    }

    /// Whether a raw config register value still reports a reset in progress.
    pub fn reset_pending(raw: u16) -> bool {
        raw & Self::RESET != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_round_trips_full_domain() {
        for v in 0..=u16::MAX {
            assert_eq!(decode_register(encode_register(v)), v);
            assert_eq!(encode_register(decode_register(v)), v);
        }
    }

    #[test]
    fn codec_swaps_bytes() {
        assert_eq!(decode_register(0x3412), 0x1234);
        assert_eq!(encode_register(0x1234), 0x3412);
    }

    #[test]
    fn to_signed_splits_at_32767() {
        assert_eq!(to_signed(0), 0);
        assert_eq!(to_signed(1000), 1000);
        assert_eq!(to_signed(32767), 32767);
        assert_eq!(to_signed(32768), -32768);
        assert_eq!(to_signed(65535), -1);
        assert_eq!(to_signed(64536), -1000);
    }

    #[test]
    fn channel_construction_rejects_out_of_range() {
        assert_eq!(Channel::try_from(0).unwrap(), Channel::Ch1);
        assert_eq!(Channel::try_from(1).unwrap(), Channel::Ch2);
        assert_eq!(Channel::try_from(2).unwrap(), Channel::Ch3);
        for bad in [3u8, 4, 255] {
            match Channel::try_from(bad) {
                Err(MonitorError::InvalidChannel(idx)) => assert_eq!(idx, bad),
                other => panic!("expected InvalidChannel, got {other:?}"),
            }
        }
    }

    #[test]
    fn register_addresses_interleave_per_channel() {
        assert_eq!(Register::Config.address(), 0x00);
        assert_eq!(Register::ShuntVoltage(Channel::Ch1).address(), 0x01);
        assert_eq!(Register::BusVoltage(Channel::Ch1).address(), 0x02);
        assert_eq!(Register::ShuntVoltage(Channel::Ch2).address(), 0x03);
        assert_eq!(Register::BusVoltage(Channel::Ch2).address(), 0x04);
        assert_eq!(Register::ShuntVoltage(Channel::Ch3).address(), 0x05);
        assert_eq!(Register::BusVoltage(Channel::Ch3).address(), 0x06);
        assert_eq!(Register::ShuntVoltageSum.address(), 0x0d);
    }

    #[test]
    fn operating_word_matches_deployed_configuration() {
        assert_eq!(ConfigWord::operating().bits(), 0x7fe7);
        assert!(!ConfigWord::reset_pending(ConfigWord::operating().bits()));
        assert!(ConfigWord::reset_pending(ConfigWord::reset().bits()));
    }
}
