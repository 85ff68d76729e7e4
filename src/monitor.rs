//! The sampling service loop.
//!
//! [`PowerMonitor`] owns the driver, the task queue, and the sample window —
//! nothing else may touch the window (single-threaded cooperative execution,
//! exclusive ownership). Two recurring tasks drive it: a `Sample` task at a
//! fixed period and a `CalcMean` task once per full window.
//!
//! Sample tasks reschedule themselves at `previous_scheduled_time + period`,
//! not `now + period`, so dispatch latency never accumulates into drift.
//! The run loop has no terminal state; it runs until the process is stopped.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::bus::BusTransport;
use crate::driver::{Ina3221, VoltageKind};
use crate::error::AppResult;
use crate::measurement::{ChannelReading, MeanSample, RawSample, SampleWindow};
use crate::registers::Channel;
use crate::scheduler::{TaskKind, TaskQueue};

/// A named physical channel with its wiring-orientation gain.
#[derive(Debug, Clone, Copy)]
pub struct ChannelSpec {
    /// Record key for this channel.
    pub name: &'static str,
    /// Device channel it is wired to.
    pub channel: Channel,
    /// Sign correcting for source vs. sink orientation.
    pub gain: f64,
}

/// Fixed channel map for the solar installation: panel and battery are
/// sources (negated), the load output is a sink.
pub const CHANNELS: [ChannelSpec; 3] = [
    ChannelSpec {
        name: "solar",
        channel: Channel::Ch1,
        gain: -1.0,
    },
    ChannelSpec {
        name: "battery",
        channel: Channel::Ch2,
        gain: -1.0,
    },
    ChannelSpec {
        name: "output",
        channel: Channel::Ch3,
        gain: 1.0,
    },
];

/// Destination for emitted mean records.
#[async_trait]
pub trait RecordSink: Send {
    /// Emit one record.
    async fn emit(&mut self, record: &MeanSample) -> AppResult<()>;
}

/// Writes one JSON line per mean record to standard output — the interface
/// the downstream forwarder consumes.
#[derive(Debug, Default)]
pub struct StdoutSink;

#[async_trait]
impl RecordSink for StdoutSink {
    async fn emit(&mut self, record: &MeanSample) -> AppResult<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut stdout = tokio::io::stdout();
        stdout.write_all(line.as_bytes()).await?;
        stdout.flush().await?;
        Ok(())
    }
}

/// The periodic sampling-and-averaging service.
pub struct PowerMonitor<B, S> {
    driver: Ina3221<B>,
    sink: S,
    machine_id: String,
    sample_period: Duration,
    window: SampleWindow,
    queue: TaskQueue,
}

impl<B: BusTransport, S: RecordSink> PowerMonitor<B, S> {
    /// Build a monitor over an initialized driver.
    pub fn new(
        driver: Ina3221<B>,
        sink: S,
        machine_id: impl Into<String>,
        sample_period: Duration,
        window_size: usize,
    ) -> Self {
        Self {
            driver,
            sink,
            machine_id: machine_id.into(),
            sample_period,
            window: SampleWindow::new(window_size),
            queue: TaskQueue::new(),
        }
    }

    /// Run the sampling loop, anchoring the first sample at "now".
    ///
    /// This never returns under normal operation; a hardware failure
    /// propagates out and is expected to terminate the process.
    pub async fn run(&mut self) -> AppResult<()> {
        info!(
            period_s = self.sample_period.as_secs_f64(),
            machine_id = %self.machine_id,
            "sampling started"
        );
        self.queue.enter_abs(Instant::now(), TaskKind::Sample);
        while let Some(task) = self.queue.pop() {
            tokio::time::sleep_until(task.at).await;
            match task.kind {
                TaskKind::Sample => self.sample(task.at).await?,
                TaskKind::CalcMean => self.flush_window().await?,
            }
        }
        Ok(())
    }

    /// One tick: read every channel, append to the window, reschedule.
    async fn sample(&mut self, scheduled_at: Instant) -> AppResult<()> {
        let mut channels = BTreeMap::new();
        for spec in &CHANNELS {
            channels.insert(spec.name.to_string(), self.read_channel(spec).await?);
        }
        let sample = RawSample {
            machine_id: self.machine_id.clone(),
            time: Utc::now(),
            channels,
        };

        // Absolute-time accumulation keeps the cadence drift-free.
        self.queue
            .enter_abs(scheduled_at + self.sample_period, TaskKind::Sample);

        self.window.push(sample);
        if self.window.is_full() {
            self.queue.enter_abs(Instant::now(), TaskKind::CalcMean);
        }
        Ok(())
    }

    /// Read one channel and apply its gain to the reported current.
    async fn read_channel(&self, spec: &ChannelSpec) -> AppResult<ChannelReading> {
        let v_load = self.driver.voltage(spec.channel, VoltageKind::Bus).await?;
        let current = self.driver.current(spec.channel).await? / 1000.0 * spec.gain;
        Ok(ChannelReading { v_load, current })
    }

    /// Flush the full window into a mean record and emit it.
    async fn flush_window(&mut self) -> AppResult<()> {
        let samples = self.window.drain();
        if samples.is_empty() {
            return Ok(());
        }
        let mean = MeanSample::from_samples(self.machine_id.clone(), Utc::now(), &samples);
        debug!(samples = samples.len(), "window flushed");
        self.sink.emit(&mean).await
    }
}
