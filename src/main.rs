use clap::Parser;
use ios_battery_bridge::config::{self, Config};
use ios_battery_bridge::hub::{ConfigEntry, EntityPlatform, SENSOR_DOMAIN, StateMachine};
use ios_battery_bridge::input::spawn_stdin_feed;
use ios_battery_bridge::ios::{self, DeviceStore};
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;

/// Battery level and state sensors for iOS devices.
#[derive(Parser, Debug)]
#[command(name = "ios-battery-bridge", version, about)]
struct Cli {
    /// Device file (`{"devices": {...}}`)
    #[arg(long, env = "IOS_CONFIG_FILE")]
    config_file: Option<PathBuf>,

    /// Read device reports (one JSON record per line) from stdin
    #[arg(long)]
    follow: bool,

    /// Log filter, e.g. `debug` or `ios_battery_bridge=trace`
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log_level: String,
}

/// `filter` already falls back to `RUST_LOG` through clap, so the
/// environment is not consulted again here.
fn logger_builder(filter: &str) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(filter).format_timestamp_millis();
    builder
}

fn init_logger(filter: &str) {
    logger_builder(filter).init();
}

#[tokio::main]
async fn main() {
    config::load_dotenv();
    let cli = Cli::parse();
    init_logger(&cli.log_level);
    info!("Starting iOS Battery Bridge");

    let mut config = Config::from_env();
    if let Some(path) = cli.config_file {
        config.ios.config_file = path;
    }
    info!("Configuration loaded:");
    info!("  Device file: {:?}", config.ios.config_file);

    let store = match DeviceStore::load(&config.ios.config_file) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Failed to load devices: {}", e);
            std::process::exit(1);
        }
    };

    let states = Arc::new(StateMachine::new());
    let mut changes = states.subscribe();
    let mut platform = EntityPlatform::new(SENSOR_DOMAIN, ios::DOMAIN, states.clone());
    let entry = ConfigEntry::new("ios", ios::DOMAIN, "iOS");

    if let Err(e) = ios::setup_entry(&store, &entry, &mut platform).await {
        error!("Failed to set up iOS sensors: {}", e);
        std::process::exit(1);
    }

    for state in states.all() {
        match serde_json::to_string(&state) {
            Ok(json) => println!("{json}"),
            Err(e) => error!("Failed to encode state of {}: {}", state.entity_id, e),
        }
    }

    if cli.follow {
        info!("iOS Battery Bridge is running");
        info!("  - {} sensor(s) registered", platform.len());
        info!("  - Reading device reports from stdin, Ctrl+C to exit");

        let feed = spawn_stdin_feed(store.clone());

        let log_changes = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => match change.new_state {
                        Some(new_state) => info!(
                            "{} = {} ({})",
                            change.entity_id,
                            new_state.state.as_deref().unwrap_or("unknown"),
                            new_state.icon.as_deref().unwrap_or("-")
                        ),
                        None => info!("{} removed", change.entity_id),
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        info!("Skipped {} state change(s)", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal");
            }
            Err(e) => {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        }

        feed.abort();
        log_changes.abort();
    }

    platform.unload().await;
    info!("iOS Battery Bridge stopped");
}
