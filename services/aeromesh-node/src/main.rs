use aeromesh_core::logging::{self, LogFormat};
use aeromesh_core::{Clock, Config, SystemClock};
use aeromesh_mesh::{IntelligentMeshRadio, MeshRadio, Metar};
use aeromesh_radio::SimulatedDriver;
use aeromesh_rf::{HeuristicModel, PropagationIntelligence, PropagationService};
use anyhow::{bail, Context};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const NODE_PROTOCOL_VERSION: u32 = 1;
const NODE_RUNTIME_VERSION: u32 = 1;

/// Broadcast target for locally originated reports.
const BROADCAST: &str = "broadcast";

#[derive(Debug, Serialize)]
struct NodeVersionHandshake {
    version: &'static str,
    runtime_version: u32,
    protocol_version: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|arg| arg == "--version-json") {
        let handshake = NodeVersionHandshake {
            version: env!("CARGO_PKG_VERSION"),
            runtime_version: NODE_RUNTIME_VERSION,
            protocol_version: NODE_PROTOCOL_VERSION,
        };
        println!("{}", serde_json::to_string(&handshake)?);
        return Ok(());
    }

    let format = std::env::var("AEROMESH_LOG_FORMAT")
        .ok()
        .and_then(|v| LogFormat::parse(&v))
        .unwrap_or(LogFormat::Pretty);
    logging::init_with(format, logging::DEFAULT_FILTER);

    let config = match parse_config_path(&args)? {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default_config(),
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let model = match config.propagation.seed {
        Some(seed) => HeuristicModel::with_seed(seed),
        None => HeuristicModel::new(),
    };
    let intelligence = Arc::new(PropagationIntelligence::new(
        &config,
        Arc::new(model),
        Arc::clone(&clock),
    ));
    let interval = Duration::from_secs(config.propagation.sample_interval_secs);
    let service = PropagationService::new(Arc::clone(&intelligence), interval);
    service.start()?;

    let radio = MeshRadio::new(&config, Arc::new(SimulatedDriver::new()), clock)
        .context("initializing mesh radio")?;
    let radio = IntelligentMeshRadio::new(radio, intelligence);

    tracing::info!(
        node_id = %format!("{:08x}", radio.node_id()),
        public_key = %radio.public_key().key_id(),
        icao = %config.node.default_icao,
        "aeromesh node started"
    );

    send_station_report(&radio, &config.node.default_icao).await?;

    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown requested");
                break;
            }
            _ = ticker.tick() => {
                let report = radio.get_network_optimization_report();
                tracing::info!(report = %serde_json::to_string(&report)?, "network optimization report");
                tracing::info!(stats = %serde_json::to_string(&radio.stats())?, "radio stats");
            }
        }
    }

    service.stop().await?;
    Ok(())
}

/// Originate one METAR from this station so the node has traffic on start.
async fn send_station_report(radio: &IntelligentMeshRadio, icao: &str) -> anyhow::Result<()> {
    let metar = Metar {
        wind_speed: 12,
        wind_gust: None,
        wind_dir: 270,
        qnh: 1013,
        visibility: 9999,
        temperature: 15,
        dewpoint: Some(9),
        clouds: None,
        weather: None,
        raw_metar: format!("{icao} AUTO 27012KT 9999 15/09 Q1013"),
    };
    let packet = radio.create_metar_message(metar, icao)?;
    let outcome = radio.intelligent_try_transmit(&packet, BROADCAST).await;
    tracing::info!(bytes = packet.len(), outcome = ?outcome, "station report");
    Ok(())
}

/// `--config <path>` is optional; defaults apply when it is absent.
fn parse_config_path(args: &[String]) -> anyhow::Result<Option<PathBuf>> {
    let mut args_iter = args.iter();
    while let Some(arg) = args_iter.next() {
        if arg == "--config" {
            if let Some(path) = args_iter.next() {
                return Ok(Some(PathBuf::from(path)));
            }
            bail!("--config was provided without a path");
        }
    }
    Ok(None)
}
