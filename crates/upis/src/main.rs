use std::sync::Arc;

use anyhow::Context;
use tokio::io::BufReader;
use tracing::{info, warn};

use upis_core::{
    config::Config,
    dispatcher::Dispatcher,
    domain::{InboundEvent, StopRequest},
    service::{Collaborators, UpiSpeakerService},
    settings::FilePreferences,
};
use upis_desktop::{pump_lines, CommandSpeech, DesktopNotifier};
use upis_sqlite::SqliteTransactionSink;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    upis_core::logging::init("upis")?;

    let cfg = Arc::new(Config::load()?);
    info!(
        "Transactions at {}, preferences in {}",
        cfg.db_path.display(),
        cfg.prefs_dir.display()
    );

    let events = Dispatcher::<InboundEvent>::new("events");
    let control = Dispatcher::<StopRequest>::new("control");
    let sink = SqliteTransactionSink::open(&cfg.db_path)
        .with_context(|| format!("opening {}", cfg.db_path.display()))?;

    let service = UpiSpeakerService::new(
        cfg.clone(),
        Collaborators {
            events: Arc::new(events.clone()),
            stop_signal: Arc::new(control.clone()),
            settings: Arc::new(FilePreferences::new(cfg.prefs_dir.clone())),
            sink: Arc::new(sink),
            speech: Arc::new(CommandSpeech::new(cfg.tts_command.clone())),
            notifier: Arc::new(DesktopNotifier::new(cfg.notifications_enabled)),
        },
    );
    service.start().await.context("starting service")?;

    tokio::spawn(async move {
        let stdin = BufReader::new(tokio::io::stdin());
        match pump_lines(stdin, &events, &control).await {
            Ok(n) => info!("Message feed closed after {n} items"),
            Err(e) => warn!("Message feed failed: {e}"),
        }
    });

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                warn!("Failed to listen for Ctrl-C: {e}");
            }
            info!("Interrupted, stopping");
            service.stop().await;
        }
        _ = service.wait_stopped() => {
            info!("Service stopped");
        }
    }

    Ok(())
}
