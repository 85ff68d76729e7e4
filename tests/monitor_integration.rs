//! End-to-end run over the simulated transport: bring-up handshake, a window
//! of one-second samples, and emitted mean records with the exact scale and
//! gain arithmetic.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use parking_lot::Mutex;
use power_stream::driver::DEFAULT_SHUNT_RESISTOR;
use power_stream::monitor::RecordSink;
use power_stream::{
    AppResult, Ina3221, MeanSample, PowerMonitor, SimulatedBus, StartupConvergence,
};

#[derive(Default, Clone)]
struct MemorySink {
    records: Arc<Mutex<Vec<MeanSample>>>,
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn emit(&mut self, record: &MeanSample) -> AppResult<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn streams_mean_records_with_exact_arithmetic() {
    // Fixed registers: every channel reads 1000 shunt counts and 12000 bus
    // counts, so v_load = 12.0 V and |current| = 50 A / 1000 = 0.05 A.
    let bus = SimulatedBus::with_values(1000, 12000);
    let driver = Ina3221::new(bus, DEFAULT_SHUNT_RESISTOR);
    assert_eq!(
        driver.initialize().await.unwrap(),
        StartupConvergence::Converged { iterations: 1 }
    );

    let sink = MemorySink::default();
    let mut monitor = PowerMonitor::new(
        driver,
        sink.clone(),
        "machine-under-test",
        Duration::from_secs(1),
        30,
    );

    // Two full windows complete inside 65 virtual seconds; the loop itself
    // never returns, so cut it off with a timeout.
    let result = tokio::time::timeout(Duration::from_secs(65), monitor.run()).await;
    assert!(result.is_err(), "run loop should outlive the timeout");

    let records = sink.records.lock();
    assert_eq!(records.len(), 2);
    for record in records.iter() {
        assert_eq!(record.machine_id, "machine-under-test");
        for name in ["solar", "battery", "output"] {
            assert_eq!(record.channels[name].v_load, 12.0);
        }
        assert_eq!(record.channels["solar"].current, -0.05);
        assert_eq!(record.channels["battery"].current, -0.05);
        assert_eq!(record.channels["output"].current, 0.05);
    }
}

#[tokio::test(start_paused = true)]
async fn mean_records_serialize_to_the_forwarder_line_shape() {
    let bus = SimulatedBus::with_values(1000, 12000);
    let driver = Ina3221::new(bus, DEFAULT_SHUNT_RESISTOR);
    driver.initialize().await.unwrap();

    let sink = MemorySink::default();
    let mut monitor = PowerMonitor::new(
        driver,
        sink.clone(),
        "machine-under-test",
        Duration::from_secs(1),
        5,
    );
    let _ = tokio::time::timeout(Duration::from_secs(6), monitor.run()).await;

    let records = sink.records.lock();
    assert!(!records.is_empty());
    let json = serde_json::to_value(&records[0]).unwrap();

    assert_eq!(json["@machine_id"], "machine-under-test");
    let time = json["@time"].as_str().unwrap();
    assert!(DateTime::parse_from_rfc3339(time).is_ok(), "bad @time: {time}");
    for name in ["solar", "battery", "output"] {
        assert!(json[name].get("v_load").is_some());
        assert!(json[name].get("current").is_some());
    }
    // Only metadata keys and the three channels appear on a record.
    assert_eq!(json.as_object().unwrap().len(), 5);
}

#[tokio::test(start_paused = true)]
async fn unconverged_device_still_streams() {
    // All-zero registers: convergence times out but the monitor proceeds
    // with (zero) readings rather than failing.
    let bus = SimulatedBus::with_values(0, 0);
    let driver = Ina3221::new(bus, DEFAULT_SHUNT_RESISTOR);
    assert_eq!(
        driver.initialize().await.unwrap(),
        StartupConvergence::TimedOut
    );

    let sink = MemorySink::default();
    let mut monitor = PowerMonitor::new(
        driver,
        sink.clone(),
        "machine-under-test",
        Duration::from_secs(1),
        3,
    );
    let _ = tokio::time::timeout(Duration::from_secs(4), monitor.run()).await;

    let records = sink.records.lock();
    assert!(!records.is_empty());
    assert_eq!(records[0].channels["solar"].v_load, 0.0);
    assert_eq!(records[0].channels["solar"].current, 0.0);
}
