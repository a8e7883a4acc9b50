//! M8 headless host entry point.
//!
//! Wires together the USB host, engine connection, preference store, and UI
//! bridge, then runs the session event loop on the Tokio runtime.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load AppConfig            -- --config path or platform config dir
//!  └─ init tracing              -- RUST_LOG > --log-level > [logging] level
//!  └─ events::channel()         -- the single inbound event channel
//!  └─ get_preferences()         -- log the settings the session will use
//!  └─ SessionController::new()
//!  └─ Ctrl-C handler            -- posts HostEvent::Shutdown
//!  └─ post HostEvent::Start
//!  └─ run_event_loop()
//! ```
//!
//! # USB host and engine
//!
//! A platform shell embeds this crate as a library and supplies its own
//! `UsbHost` and engine.  The standalone binary uses `MockUsbHost` with one
//! simulated, already-authorised M8 attached (unless `--no-device`), and a
//! `SerialEngine` writing controller messages to a null sink.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use m8_client::application::{
    command_bridge::HostSurface,
    events::{self, HostEvent},
    input::EngineConnection,
    permission::UsbHost,
    session::{PreferenceStore, SessionController},
};
use m8_client::infrastructure::{
    engine::SerialEngine,
    storage::config::{config_file_path, load_config_from, TomlPreferenceStore},
    ui_bridge::{get_preferences, get_session_status, HostAppState, StatusSurface},
    usb::mock::MockUsbHost,
};
use m8_core::{DeviceDescriptor, DeviceHandle, M8_HARDWARE_IDS};

/// Host for a headless Dirtywave M8.
#[derive(Debug, Parser)]
#[command(name = "m8-client", version, about)]
struct Cli {
    /// Path to the TOML config file (defaults to the platform config dir).
    #[arg(long, env = "M8_CLIENT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level filter, overriding the config file (RUST_LOG wins over both).
    #[arg(long)]
    log_level: Option<String>,

    /// Start without a simulated M8 attached.
    #[arg(long)]
    no_device: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => config_file_path().context("cannot locate config file")?,
    };
    let config = load_config_from(&config_path)
        .with_context(|| format!("cannot load config from {}", config_path.display()))?;

    // Initialise structured logging.
    let level = cli.log_level.unwrap_or_else(|| config.logging.level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    info!("M8 client starting (config: {})", config_path.display());

    // ── Event channel ─────────────────────────────────────────────────────────
    let (sender, receiver) = events::channel(config.usb.event_channel_capacity);

    // ── Adapters ──────────────────────────────────────────────────────────────
    let usb = Arc::new(MockUsbHost::new());
    if cli.no_device {
        info!("no simulated device attached");
    } else {
        let id = M8_HARDWARE_IDS[0];
        let handle = DeviceHandle(1);
        usb.attach(
            DeviceDescriptor::new(handle, id.vendor_id, id.product_id).with_product_name("M8"),
        );
        usb.grant(handle);
    }

    let engine = SerialEngine::new(std::io::sink()).with_events(sender.clone());
    let preferences: Arc<dyn PreferenceStore> = Arc::new(TomlPreferenceStore::new(&config_path));
    let startup = get_preferences(Arc::clone(&preferences)).await;
    match startup.data {
        Some(prefs) => info!(
            "preferences: audio driver {}, audio device {}, buttons {}, orientation lock {}",
            prefs.audio_driver, prefs.audio_device, prefs.show_buttons, prefs.lock_orientation
        ),
        None => warn!(
            "preferences unavailable: {}",
            startup.error.as_deref().unwrap_or("unknown error")
        ),
    }
    let app_state = HostAppState::new();
    let surface = StatusSurface::new(Arc::clone(&app_state));

    let controller = SessionController::new(
        usb as Arc<dyn UsbHost>,
        Arc::new(engine) as Arc<dyn EngineConnection>,
        preferences,
        Arc::new(surface) as Arc<dyn HostSurface>,
    );

    // ── Ctrl-C handler ────────────────────────────────────────────────────────
    let shutdown = sender.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            if let Err(e) = shutdown.send(HostEvent::Shutdown).await {
                warn!("could not deliver shutdown: {e}");
            }
        }
    });

    sender
        .send(HostEvent::Start)
        .await
        .context("event loop closed before start")?;
    drop(sender);

    info!("M8 client ready");
    events::run_event_loop(controller, receiver)
        .await
        .context("session ended with a fatal error")?;

    let status = get_session_status(app_state).await;
    if let Some(dto) = status.data {
        info!(
            "final session state {} (last report: {})",
            dto.state,
            dto.last_report.as_deref().unwrap_or("none")
        );
    }
    Ok(())
}
