// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Hostwatch - host telemetry agent

use anyhow::Result;
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use std::path::PathBuf;

use hostwatch::{Agent, Config, NAME, VERSION};

/// Hostwatch - host telemetry agent
#[derive(Parser, Debug)]
#[command(name = "hostwatch")]
#[command(version = VERSION)]
#[command(about = "Collects host sensors and publishes them over MQTT")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// MQTT broker address, enables MQTT
    #[arg(long)]
    mqtt_broker: Option<String>,

    /// Override the device name
    #[arg(long)]
    device_name: Option<String>,

    /// Log every entity update
    #[arg(long)]
    log_entities: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load or create configuration
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;

    // Initialize logging
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        config.log_level.parse().unwrap_or(Level::INFO)
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive(LevelFilter::from_level(log_level).into()))
        .with_target(false)
        .with_thread_ids(true)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{} v{}", NAME, VERSION);
    info!("Configuration loaded from {:?}", config_path);

    // Override with command line args
    if let Some(mqtt) = args.mqtt_broker {
        config.mqtt.enabled = true;
        config.mqtt.server = mqtt;
    }
    if let Some(device_name) = args.device_name {
        config.device_name = device_name;
    }
    config.validate()?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(config, args.log_entities))
}

async fn run(config: Config, log_entities: bool) -> Result<()> {
    let agent = Agent::new(config);

    let token = agent.token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received, cleaning up...");
            token.cancel();
        }
    });

    info!("Press Ctrl+C to shutdown");
    agent.run(log_entities).await?;

    info!("{} shutdown complete", NAME);
    Ok(())
}
