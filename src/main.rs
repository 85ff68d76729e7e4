//! CLI entry point for power-stream.
//!
//! Loads settings, resolves the machine identity, brings up the INA3221, and
//! runs the sampling loop until the process is stopped. Mean records go to
//! standard output, one JSON line per window; everything else goes to stderr
//! via `tracing`.

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use mimalloc::MiMalloc;
use power_stream::driver::Ina3221;
use power_stream::monitor::{PowerMonitor, StdoutSink};
use power_stream::{identity, Settings, SimulatedBus, StartupConvergence};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(name = "power-stream")]
#[command(about = "Stream INA3221 channel means as line-delimited JSON", long_about = None)]
struct Cli {
    /// Config name under config/ (without extension)
    #[arg(long)]
    config: Option<String>,

    /// Override the sample period in seconds
    #[arg(long)]
    sample_period: Option<f64>,

    /// Override the number of samples per mean record
    #[arg(long)]
    window: Option<usize>,

    /// Override the shunt resistor value in ohms
    #[arg(long)]
    shunt: Option<f64>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut settings = Settings::new(cli.config.as_deref()).context("loading settings")?;
    if let Some(period) = cli.sample_period {
        settings.sample_period_secs = period;
    }
    if let Some(window) = cli.window {
        settings.mean_period_cnt = window;
    }
    if let Some(shunt) = cli.shunt {
        settings.shunt_resistor_ohms = shunt;
    }
    settings.validate()?;

    let machine_id =
        identity::load_machine_id(&settings.machine_id_path).context("resolving machine id")?;

    // The word-level bus primitives are a platform collaborator; this build
    // wires in the simulated transport (see BusTransport for the seam).
    let bus = SimulatedBus::new().with_jitter(20);
    info!(
        bus = settings.i2c_bus,
        address = settings.device_address,
        shunt_ohms = settings.shunt_resistor_ohms,
        "bringing up INA3221 (simulated transport)"
    );

    let driver = Ina3221::new(bus, settings.shunt_resistor_ohms);
    if driver.initialize().await? == StartupConvergence::TimedOut {
        warn!("continuing with possibly inaccurate first readings");
    }

    let mut monitor = PowerMonitor::new(
        driver,
        StdoutSink,
        machine_id,
        Duration::from_secs_f64(settings.sample_period_secs),
        settings.mean_period_cnt,
    );
    monitor.run().await?;
    Ok(())
}
