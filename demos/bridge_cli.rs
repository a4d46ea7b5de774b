//! Drive a bulb session from JSON lines on stdin.
//!
//! Device commands and bus events are printed instead of being sent.
//!
//! Run with: cargo run --example bridge_cli -- --help
//!
//! Each input line is one of:
//!
//! ```text
//! {"command": "setBrightness", "payload": [0.4]}
//! {"channel": "color", "method": "set", "payload": {"mode": "temperature", "temperature": 2700}}
//! {"command": "startBatch"}
//! {"command": "endBatch"}
//! {"report": {"power": 65535, "hue": 0, "saturation": 0, "brightness": 30000, "kelvin": 3500}}
//! {"illuminance": 250.0}
//! ```

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};

use lifx_bridge::runtime::BoxFuture;
use lifx_bridge::{
    BridgeConfig, BulbClient, BulbRegistry, BusEvent, DeviceCommand, DeviceReport,
    DiscoveredBulb, EventSink,
};

#[derive(Parser)]
#[command(name = "bridge-cli")]
#[command(about = "Feed bus commands to a simulated LIFX bulb", long_about = None)]
struct Cli {
    /// Address of the simulated bulb
    #[arg(short, long, default_value = "127.0.0.1:56700")]
    address: String,

    /// Bulb label
    #[arg(short, long)]
    label: Option<String>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Device command timeout in milliseconds, overrides the configuration
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Print diagnostics when input ends
    #[arg(short, long)]
    diagnostics: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Line {
    Channel {
        channel: String,
        method: String,
        #[serde(default)]
        payload: Value,
    },
    Command {
        command: String,
        #[serde(default)]
        payload: Value,
    },
    Report {
        report: DeviceReport,
    },
    Illuminance {
        illuminance: f64,
    },
}

struct PrintingClient;

impl BulbClient for PrintingClient {
    fn apply<'a>(&'a self, command: &'a DeviceCommand) -> BoxFuture<'a, io::Result<()>> {
        Box::pin(async move {
            let json = serde_json::to_string(command).map_err(io::Error::other)?;
            println!("device <- {}", json);
            Ok(())
        })
    }
}

struct PrintingSink;

impl EventSink for PrintingSink {
    fn emit(&self, event: BusEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => println!("bus    -> {}", json),
            Err(e) => eprintln!("failed to encode event: {}", e),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => BridgeConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => BridgeConfig::default(),
    };
    if let Some(millis) = cli.timeout {
        config = config.with_command_timeout(Some(Duration::from_millis(millis)));
    }

    let registry = BulbRegistry::new(config, Arc::new(PrintingSink));
    let bulb = DiscoveredBulb::new(&cli.address, cli.label.as_deref());
    let session = registry
        .register(&bulb, Arc::new(PrintingClient))
        .ok_or("bulb already registered")?;
    println!("bulb {} registered as {}", session.address(), session.id());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parsed: Line = match serde_json::from_str(line) {
            Ok(parsed) => parsed,
            Err(e) => {
                eprintln!("unreadable line: {}", e);
                continue;
            }
        };

        let result = match parsed {
            Line::Channel {
                channel,
                method,
                payload,
            } => session.handle(&channel, &method, &payload).await,
            Line::Command { command, payload } => match command.as_str() {
                "startBatch" => {
                    if !session.start_batch().await {
                        eprintln!("batch already open");
                    }
                    Ok(())
                }
                "endBatch" => session.end_batch().await,
                _ => session.dispatch(&command, &payload).await,
            },
            Line::Report { report } => {
                session.report_state(&report).await;
                Ok(())
            }
            Line::Illuminance { illuminance } => {
                session.report_illuminance(illuminance).await;
                Ok(())
            }
        };

        if let Err(e) = result {
            eprintln!("Error: {}", e);
        }
    }

    if cli.diagnostics {
        println!("{}", serde_json::to_string_pretty(&session.diagnostics().await)?);
    }
    Ok(())
}
