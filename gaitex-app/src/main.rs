mod app;

use anyhow::{Context, Result};
use app::{App, Runner};
use clap::Parser;
use gaitex_core::{ActuatorSink, EventSink};
use gaitex_experiment::{BlockController, SequenceRunner, SessionConfig};
use gaitex_io::{
    LogActuatorSink, LogEventSink, OptoApiClient, TcpActuatorSink, TcpEventSink, opto,
};
use std::fs;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Gait/dual-task experiment controller")]
struct Args {
    /// Path to a JSON session configuration
    #[arg(long)]
    config: Option<String>,

    /// Counterbalancing sequence to run (1-12)
    #[arg(long, default_value_t = 1)]
    sequence: usize,

    /// Marker bridge address (host:port); markers go to the log otherwise
    #[arg(long)]
    marker_addr: Option<String>,

    /// Stimulus box address (host:port); commands go to the log otherwise
    #[arg(long)]
    actuator_addr: Option<String>,

    /// Bracket gait passes with OptoGait measurements
    #[arg(long, default_value_t = false)]
    opto: bool,

    /// OptoGait API host
    #[arg(long, default_value = "127.0.0.1")]
    opto_host: String,

    /// OptoGait API port
    #[arg(long, default_value_t = opto::DEFAULT_PORT)]
    opto_port: u16,

    /// Tick rate of the state machine loop
    #[arg(long, default_value_t = 90.0)]
    tick_hz: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let session = match &args.config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading session config {path}"))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing session config {path}"))?
        }
        None => SessionConfig::default(),
    };

    let events: Box<dyn EventSink> = match &args.marker_addr {
        Some(addr) => match TcpEventSink::connect(addr) {
            Ok(sink) => Box::new(sink),
            Err(err) => {
                // Non-fatal: the session still runs, markers go to the log.
                warn!(%err, addr, "marker bridge unreachable, logging markers only");
                Box::new(LogEventSink)
            }
        },
        None => Box::new(LogEventSink),
    };

    let actuator: Box<dyn ActuatorSink> = match &args.actuator_addr {
        Some(addr) => match TcpActuatorSink::connect(addr) {
            Ok(sink) => Box::new(sink),
            Err(err) => {
                warn!(%err, addr, "stimulus box unreachable, logging commands only");
                Box::new(LogActuatorSink)
            }
        },
        None => Box::new(LogActuatorSink),
    };

    let opto_client = if args.opto {
        let mut client = OptoApiClient::new(&args.opto_host, args.opto_port);
        client.connect().context("connecting to the OptoGait API")?;
        match client.check_connection() {
            Ok(true) => info!("OptoGait hardware connection OK"),
            Ok(false) => warn!("OptoGait reports no hardware connection"),
            Err(err) => warn!(%err, "OptoGait connection check failed"),
        }
        Some(client)
    } else {
        None
    };

    let patient_id = session
        .participant
        .as_ref()
        .map_or_else(|| "anonymous".to_string(), |p| p.id.clone());

    let controller = BlockController::new(events, actuator, session.stimulus_intensity, rand::rng());
    let runner: Runner = SequenceRunner::new(controller, session);

    App::new(runner, opto_client, args.tick_hz, patient_id).run(args.sequence)
}
