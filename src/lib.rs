//! # power-stream
//!
//! Library for a solar power monitor built around the TI INA3221 three-channel
//! voltage/current monitor. It polls the chip over a register-based bus,
//! derives per-channel load voltage and current, averages a rolling window of
//! raw samples, and emits one timestamped JSON record per window for
//! downstream time-series ingestion.
//!
//! ## Crate Structure
//!
//! - **`registers`**: 16-bit register codec (byte-order canonicalization,
//!   two's-complement reconstruction) and the closed register/channel/config
//!   types.
//! - **`bus`**: the `BusTransport` seam for the platform's word-level bus
//!   primitives, plus a simulated transport for tests and hardware-free runs.
//! - **`driver`**: the `Ina3221` driver — reset/configuration handshake,
//!   startup convergence wait, calibrated voltage/current queries.
//! - **`measurement`**: raw/mean sample records and the bounded sample window.
//! - **`scheduler`**: absolute-time task queue with the mean-before-sample
//!   tie-break.
//! - **`monitor`**: the `PowerMonitor` service loop tying driver, window, and
//!   record sink together.
//! - **`identity`**: per-host machine-id lookup.
//! - **`config`**: settings loading and validation.
//! - **`error`**: the crate-wide `MonitorError` type.

pub mod bus;
pub mod config;
pub mod driver;
pub mod error;
pub mod identity;
pub mod measurement;
pub mod monitor;
pub mod registers;
pub mod scheduler;

pub use bus::{BusTransport, SimulatedBus};
pub use config::Settings;
pub use driver::{Ina3221, StartupConvergence, VoltageKind};
pub use error::{AppResult, MonitorError};
pub use measurement::{ChannelReading, MeanSample, RawSample, SampleWindow};
pub use monitor::{PowerMonitor, RecordSink, StdoutSink};
pub use registers::{Channel, ConfigWord, Register};
