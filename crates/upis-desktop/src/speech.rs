//! Speech engine backed by an external text-to-speech program
//! (`espeak-ng`, `espeak` or macOS `say`).
//!
//! Utterances are played one at a time by a background task, so `speak`
//! returns as soon as the text is queued.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use tokio::{
    process::Command,
    sync::{mpsc, Mutex, Notify},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use upis_core::{
    errors::Error,
    ports::{QueueMode, SpeechEngine},
    Result,
};

pub struct CommandSpeech {
    program: Option<PathBuf>,
    playback: Mutex<Option<Playback>>,
}

struct Playback {
    tx: mpsc::UnboundedSender<Utterance>,
    generation: Arc<AtomicU64>,
    interrupt: Arc<Notify>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Debug)]
struct Utterance {
    text: String,
    generation: u64,
}

impl CommandSpeech {
    pub fn new(program: Option<PathBuf>) -> Self {
        Self {
            program,
            playback: Mutex::new(None),
        }
    }
}

/// Arguments selecting the voice for `locale`, per program flavour.
fn voice_args(program: &Path, locale: &str) -> Vec<String> {
    let name = program
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    match name {
        "espeak-ng" | "espeak" => vec!["-v".to_string(), locale.to_lowercase()],
        _ => Vec::new(),
    }
}

async fn play_loop(
    program: PathBuf,
    args: Vec<String>,
    mut rx: mpsc::UnboundedReceiver<Utterance>,
    generation: Arc<AtomicU64>,
    interrupt: Arc<Notify>,
    cancel: CancellationToken,
) {
    loop {
        let utterance = tokio::select! {
            _ = cancel.cancelled() => break,
            u = rx.recv() => match u {
                Some(u) => u,
                None => break,
            },
        };

        if utterance.generation < generation.load(Ordering::SeqCst) {
            debug!("Skipping flushed utterance: {}", utterance.text);
            continue;
        }

        let mut child = match Command::new(&program)
            .args(&args)
            .arg(&utterance.text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to start {}: {e}", program.display());
                continue;
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = child.kill().await;
                break;
            }
            _ = interrupt.notified() => {
                let _ = child.kill().await;
            }
            status = child.wait() => match status {
                Ok(s) if !s.success() => warn!("{} exited with {s}", program.display()),
                Ok(_) => {}
                Err(e) => warn!("Failed to wait for {}: {e}", program.display()),
            },
        }
    }
    debug!("Speech playback loop exited");
}

#[async_trait]
impl SpeechEngine for CommandSpeech {
    async fn init(&self, locale: &str) -> Result<()> {
        let program = self
            .program
            .clone()
            .ok_or_else(|| Error::Speech("no text-to-speech program found".to_string()))?;
        if !program.is_file() {
            return Err(Error::Speech(format!(
                "text-to-speech program not found: {}",
                program.display()
            )));
        }

        let mut playback = self.playback.lock().await;
        if playback.is_some() {
            return Ok(());
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let generation = Arc::new(AtomicU64::new(0));
        let interrupt = Arc::new(Notify::new());
        let cancel = CancellationToken::new();
        let args = voice_args(&program, locale);
        info!("Using {} for speech {:?}", program.display(), args);

        let handle = tokio::spawn(play_loop(
            program,
            args,
            rx,
            generation.clone(),
            interrupt.clone(),
            cancel.clone(),
        ));

        *playback = Some(Playback {
            tx,
            generation,
            interrupt,
            cancel,
            handle,
        });
        Ok(())
    }

    async fn speak(&self, text: &str, mode: QueueMode) -> Result<()> {
        let playback = self.playback.lock().await;
        let Some(p) = playback.as_ref() else {
            return Err(Error::Speech("speech engine not initialized".to_string()));
        };

        let generation = match mode {
            QueueMode::Add => p.generation.load(Ordering::SeqCst),
            QueueMode::Flush => {
                let g = p.generation.fetch_add(1, Ordering::SeqCst) + 1;
                p.interrupt.notify_waiters();
                g
            }
        };

        p.tx.send(Utterance {
            text: text.to_string(),
            generation,
        })
        .map_err(|_| Error::Speech("speech playback loop has stopped".to_string()))
    }

    async fn shutdown(&self) {
        let Some(p) = self.playback.lock().await.take() else {
            return;
        };
        p.cancel.cancel();
        drop(p.tx);
        if let Err(e) = p.handle.await {
            warn!("Speech playback task ended abnormally: {e}");
        }
    }
}
