mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, ConfigCommand, KeyCommand};
use hid_relay_bridge::bridge::{Bridge, BurstPaste, CommandLink, EventOutcome};
use hid_relay_bridge::domain::models::{AppEvent, InputEvent, MessageSeverity};
use hid_relay_bridge::domain::settings::SettingsService;
use hid_relay_bridge::infrastructure::bluetooth::ota::LogProgress;
use hid_relay_bridge::infrastructure::bluetooth::transport::WriterSink;
use hid_relay_bridge::infrastructure::bluetooth::{
    EncryptionContext, KeyHandle, OtaController, SecureFramer, TransportSink,
};
use hid_relay_bridge::infrastructure::cancel::CancelToken;
use hid_relay_bridge::infrastructure::clipboard::{ClipboardSource, FileClipboard, NoClipboard};
use hid_relay_bridge::infrastructure::credentials::{CredentialStore, KeyringCredentialStore};
use hid_relay_bridge::infrastructure::logging::init_logger;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Housekeeping period for scroll decay and gesture timeouts (~60 Hz)
const TICK_INTERVAL: Duration = Duration::from_millis(16);

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = match cli.config {
        Some(path) => SettingsService::with_path(path),
        None => SettingsService::new()?,
    };

    // Keep the guard alive for the whole process so file logs are flushed
    let _logging_guard = match init_logger(&settings.get().log_settings) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    info!("Starting HID relay bridge v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Run {
            key_env,
            clipboard_file,
        } => run_session(&settings, key_env, clipboard_file).await,
        Commands::Flash { firmware } => flash(firmware).await,
        Commands::Key { action } => manage_key(action),
        Commands::Config { action } => manage_config(&mut settings, action),
    }
}

async fn run_session(
    settings: &SettingsService,
    key_env: Option<String>,
    clipboard_file: Option<PathBuf>,
) -> Result<()> {
    let config = settings.get();
    info!(
        "Relay: name prefix {:?}, service {}",
        config.ble_device_name_prefix, config.ble_service_uuid
    );
    debug!(
        "Characteristics: mouse {}, key {}, ota {}",
        config.ble_mouse_char_uuid, config.ble_key_char_uuid, config.ble_ota_char_uuid
    );

    let keys = KeyHandle::new();
    let passphrase = match &key_env {
        Some(var) => std::env::var(var).ok(),
        None => KeyringCredentialStore::new().load()?,
    };
    match passphrase {
        Some(passphrase) => {
            keys.set(EncryptionContext::from_passphrase(&passphrase).context("Invalid relay key")?)
        }
        None => warn!("No relay key configured; commands will be dropped until one is set"),
    }

    let sink: Arc<dyn TransportSink> = Arc::new(WriterSink::new(std::io::stdout()));
    let link = CommandLink::new(SecureFramer::new(keys), sink);
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();

    let mut bridge = Bridge::new(config.shaping, link.clone());
    let burst = BurstPaste::new(link, Duration::from_millis(config.burst_char_delay_ms))
        .with_events(events_tx);
    let clipboard: Arc<dyn ClipboardSource> = match clipboard_file {
        Some(path) => Arc::new(FileClipboard::new(path)),
        None => Arc::new(NoClipboard),
    };

    let cancel = CancelToken::new();
    let mut burst_task: Option<JoinHandle<()>> = None;

    let start = Instant::now();
    let session_ms = || start.elapsed().as_secs_f64() * 1000.0;

    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    info!("Reading input events from stdin");
    loop {
        tokio::select! {
            _ = ticker.tick() => bridge.tick(session_ms()).await,
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    debug!("Input closed");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let event: InputEvent = match serde_json::from_str(&line) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!("Ignoring malformed event {:?}: {}", line, e);
                        continue;
                    }
                };
                let now = event.timestamp().unwrap_or_else(session_ms);
                if bridge.handle_event(&event, now).await == EventOutcome::BurstPasteRequested {
                    if burst_task.as_ref().is_some_and(|task| !task.is_finished()) {
                        warn!("Burst paste already running");
                        continue;
                    }
                    let burst = burst.clone();
                    let clipboard = clipboard.clone();
                    let cancel = cancel.clone();
                    burst_task = Some(tokio::spawn(async move {
                        if let Err(e) = burst.run(clipboard.as_ref(), &cancel).await {
                            warn!("{}", e);
                        }
                    }));
                }
            }
            Some(event) = events_rx.recv() => log_app_event(event),
            _ = &mut ctrl_c => {
                info!("Interrupted");
                cancel.cancel();
                break;
            }
        }
    }

    // A lone backtick still inside its window would otherwise be lost
    bridge.flush(session_ms()).await;

    // Let a paste started from a script finish before exiting
    if let Some(task) = burst_task {
        if let Err(e) = task.await {
            error!("Burst paste task failed: {}", e);
        }
    }
    while let Ok(event) = events_rx.try_recv() {
        log_app_event(event);
    }

    info!("Session ended");
    Ok(())
}

fn log_app_event(event: AppEvent) {
    match event {
        AppEvent::Status(status) => match status.severity {
            MessageSeverity::Info | MessageSeverity::Success => info!("{}", status.message),
            MessageSeverity::Warning => warn!("{}", status.message),
            MessageSeverity::Error => error!("{}", status.message),
        },
        AppEvent::BurstProgress { sent, total } => debug!("Burst paste {}/{}", sent, total),
    }
}

async fn flash(path: PathBuf) -> Result<()> {
    let firmware =
        std::fs::read(&path).with_context(|| format!("Failed to read firmware {:?}", path))?;

    let mut ota = OtaController::new();
    ota.begin(firmware)?;

    let cancel = CancelToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let sink = WriterSink::new(std::io::stdout());
    let mut progress = LogProgress::default();
    ota.run(&sink, &mut progress, &cancel).await?;
    Ok(())
}

fn manage_key(action: KeyCommand) -> Result<()> {
    let store = KeyringCredentialStore::new();
    match action {
        KeyCommand::Set { passphrase } => {
            EncryptionContext::from_passphrase(&passphrase)?;
            store.save(&passphrase)?;
            println!("Relay key stored");
        }
        KeyCommand::Clear => {
            store.clear()?;
            println!("Relay key cleared");
        }
        KeyCommand::Status => match store.load_context() {
            Ok(Some(_)) => println!("Relay key: set"),
            Ok(None) => println!("Relay key: not set"),
            Err(e) => println!("Relay key: invalid ({:#})", e),
        },
    }
    Ok(())
}

fn manage_config(settings: &mut SettingsService, action: ConfigCommand) -> Result<()> {
    match action {
        ConfigCommand::Show => {
            println!("{}", serde_json::to_string_pretty(settings.get())?);
        }
        ConfigCommand::Shaping {
            sensitivity,
            decay,
            boost,
        } => {
            let mut shaping = settings.get().shaping;
            if let Some(sensitivity) = sensitivity {
                shaping.mouse_sensitivity = sensitivity;
            }
            if let Some(decay) = decay {
                shaping.scroll_decay = decay;
            }
            if let Some(boost) = boost {
                shaping.scroll_boost = boost;
            }
            settings.update_shaping(shaping)?;
            info!("Shaping updated: {:?}", settings.get().shaping);
        }
    }
    Ok(())
}
