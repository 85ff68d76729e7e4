//! Measurement records and the rolling sample window.
//!
//! A [`RawSample`] is produced once per scheduler tick and owned by the
//! [`SampleWindow`] until the window fills; a [`MeanSample`] is the per-field
//! arithmetic mean over one full window and is the only record emitted
//! externally. Both serialize with the `@machine_id` / `@time` metadata keys
//! the downstream forwarder expects, timestamps at second precision.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

/// Derived readings for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelReading {
    /// Load-side bus voltage in volts.
    pub v_load: f64,
    /// Signed channel current in amps (gain applied).
    pub current: f64,
}

fn serialize_seconds<S: Serializer>(
    time: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&time.to_rfc3339_opts(SecondsFormat::Secs, false))
}

/// One tick's readings across all channels. Internal only; never emitted.
#[derive(Debug, Clone, Serialize)]
pub struct RawSample {
    /// Stable per-host identifier.
    #[serde(rename = "@machine_id")]
    pub machine_id: String,
    /// Wall-clock UTC timestamp of the tick.
    #[serde(rename = "@time", serialize_with = "serialize_seconds")]
    pub time: DateTime<Utc>,
    /// Readings keyed by channel name.
    #[serde(flatten)]
    pub channels: BTreeMap<String, ChannelReading>,
}

/// Per-channel field means over one completed window; emitted as one JSON
/// line per window.
#[derive(Debug, Clone, Serialize)]
pub struct MeanSample {
    /// Stable per-host identifier.
    #[serde(rename = "@machine_id")]
    pub machine_id: String,
    /// Wall-clock UTC timestamp of the flush.
    #[serde(rename = "@time", serialize_with = "serialize_seconds")]
    pub time: DateTime<Utc>,
    /// Mean readings keyed by channel name.
    #[serde(flatten)]
    pub channels: BTreeMap<String, ChannelReading>,
}

impl MeanSample {
    /// Compute per-channel, per-field arithmetic means over `samples`.
    ///
    /// Channel keys are taken from the samples themselves; every sample in a
    /// window carries the same fixed channel set.
    pub fn from_samples(
        machine_id: impl Into<String>,
        time: DateTime<Utc>,
        samples: &[RawSample],
    ) -> Self {
        let count = samples.len() as f64;
        let mut channels: BTreeMap<String, ChannelReading> = BTreeMap::new();
        if let Some(first) = samples.first() {
            for name in first.channels.keys() {
                let (v_load_sum, current_sum) = samples
                    .iter()
                    .filter_map(|sample| sample.channels.get(name))
                    .fold((0.0, 0.0), |(v, c), reading| {
                        (v + reading.v_load, c + reading.current)
                    });
                channels.insert(
                    name.clone(),
                    ChannelReading {
                        v_load: v_load_sum / count,
                        current: current_sum / count,
                    },
                );
            }
        }
        Self {
            machine_id: machine_id.into(),
            time,
            channels,
        }
    }
}

// =============================================================================
// Sample Window
// =============================================================================

/// Bounded, ordered buffer of raw samples.
///
/// The window has exactly one owner (the scheduler task currently running);
/// it flushes only when full, never partially, and a flush drains it
/// completely so the next tick starts a fresh window.
#[derive(Debug)]
pub struct SampleWindow {
    capacity: usize,
    samples: Vec<RawSample>,
}

impl SampleWindow {
    /// Window holding `capacity` samples per mean.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: Vec::with_capacity(capacity),
        }
    }

    /// Append one sample.
    pub fn push(&mut self, sample: RawSample) {
        self.samples.push(sample);
    }

    /// Whether the window has reached its flush threshold.
    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    /// Number of buffered samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the window holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Drain every buffered sample, leaving the window empty.
    pub fn drain(&mut self) -> Vec<RawSample> {
        std::mem::take(&mut self.samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(machine_id: &str, v_load: f64, current: f64) -> RawSample {
        let mut channels = BTreeMap::new();
        for name in ["solar", "battery", "output"] {
            channels.insert(name.to_string(), ChannelReading { v_load, current });
        }
        RawSample {
            machine_id: machine_id.to_string(),
            time: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            channels,
        }
    }

    #[test]
    fn mean_is_exact_over_arithmetic_sequence() {
        // 30 samples with v_load = 1..=30; mean = 15.5.
        let samples: Vec<RawSample> = (1..=30)
            .map(|i| sample("m", f64::from(i), f64::from(i) * 2.0))
            .collect();
        let mean = MeanSample::from_samples(
            "m",
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 30).unwrap(),
            &samples,
        );
        for name in ["solar", "battery", "output"] {
            let reading = &mean.channels[name];
            assert_eq!(reading.v_load, 15.5);
            assert_eq!(reading.current, 31.0);
        }
    }

    #[test]
    fn window_flushes_only_at_capacity() {
        let mut window = SampleWindow::new(3);
        window.push(sample("m", 1.0, 1.0));
        window.push(sample("m", 2.0, 2.0));
        assert!(!window.is_full());
        window.push(sample("m", 3.0, 3.0));
        assert!(window.is_full());

        let drained = window.drain();
        assert_eq!(drained.len(), 3);
        assert!(window.is_empty());
        assert!(!window.is_full());
    }

    #[test]
    fn next_window_has_no_carryover() {
        let mut window = SampleWindow::new(2);
        window.push(sample("m", 10.0, 10.0));
        window.push(sample("m", 20.0, 20.0));
        let _ = window.drain();

        window.push(sample("m", 2.0, 2.0));
        window.push(sample("m", 4.0, 4.0));
        let mean = MeanSample::from_samples(
            "m",
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 2).unwrap(),
            &window.drain(),
        );
        assert_eq!(mean.channels["solar"].v_load, 3.0);
    }

    #[test]
    fn records_serialize_with_metadata_keys_and_second_precision() {
        let mean = MeanSample::from_samples(
            "abc123",
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 30).unwrap(),
            &[sample("abc123", 12.0, -0.05)],
        );
        let json = serde_json::to_value(&mean).unwrap();
        assert_eq!(json["@machine_id"], "abc123");
        assert_eq!(json["@time"], "2024-06-01T12:00:30+00:00");
        assert_eq!(json["solar"]["v_load"], 12.0);
        assert_eq!(json["battery"]["current"], -0.05);
        assert!(json.get("output").is_some());
    }
}
