//! WAB host (wab-host) - Main entry point
//!
//! Runs a WebAssembly sample producer against the system audio output (or the
//! null output), forwarding host visibility and gesture events typed on stdin.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wab_bridge::audio::{platform_for, CpalPlatform};
use wab_bridge::host::Runner;
use wab_bridge::AudioBridge;
use wab_common::config::{AudioBackend, ConfigResolver, LoggingConfig, TomlConfig};
use wab_common::EventHub;

/// Command-line arguments for wab-host
#[derive(Parser, Debug)]
#[command(name = "wab-host")]
#[command(about = "Runs a WebAssembly sample producer against an audio output")]
#[command(version)]
struct Args {
    /// Producer module (.wasm or .wat)
    #[arg(required_unless_present = "list_devices")]
    module: Option<PathBuf>,

    /// Config file (overrides WAB_CONFIG and the platform config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output backend: cpal or null
    #[arg(short, long, env = "WAB_BACKEND")]
    backend: Option<AudioBackend>,

    /// Output device name
    #[arg(short, long, env = "WAB_DEVICE")]
    device: Option<String>,

    /// Milliseconds between calls to the producer's frame export
    #[arg(long)]
    frame_interval_ms: Option<u64>,

    /// Keep the output suspended until the first gesture
    #[arg(long)]
    require_gesture: bool,

    /// List output devices and exit
    #[arg(long)]
    list_devices: bool,
}

impl Args {
    fn apply_overrides(&self, config: &mut TomlConfig) {
        if let Some(backend) = self.backend {
            config.audio.backend = backend;
        }
        if let Some(device) = &self.device {
            config.audio.device = Some(device.clone());
        }
        if let Some(interval) = self.frame_interval_ms {
            config.host.frame_interval_ms = interval;
        }
        if self.require_gesture {
            config.unlock.require_gesture = true;
        }
    }
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let level = &logging.level;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("wab_host={level},wab_bridge={level},wab_common={level}").into()
    });

    let file_layer = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let source = ConfigResolver::new().resolve(args.config.as_deref());
    let mut config = TomlConfig::from_source(&source).context("Failed to load configuration")?;
    args.apply_overrides(&mut config);
    config.validate().context("Invalid configuration")?;

    init_logging(&config.logging)?;

    info!(
        "Starting WAB host (git {} built {} {})",
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    source.log();

    if args.list_devices {
        for name in CpalPlatform::list_devices().context("Failed to enumerate output devices")? {
            println!("{}", name);
        }
        return Ok(());
    }

    let module = args.module.context("A producer module is required")?;

    info!(
        backend = ?config.audio.backend,
        device = config.audio.device.as_deref().unwrap_or("default"),
        require_gesture = config.unlock.require_gesture,
        "Audio output configured"
    );

    let hub = Arc::new(EventHub::new());
    let platform = platform_for(&config.audio, &config.unlock);
    let bridge = AudioBridge::new(platform, hub.clone());

    let runner = Runner::from_file(&module, bridge, hub, config.host.clone())?;
    runner.run().await?;

    info!("Shutdown complete");
    Ok(())
}
