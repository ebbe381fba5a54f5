//! Hand-written collaborator fakes shared by the unit tests.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::{
    domain::{NotificationChannel, NotificationId, TransactionRecord},
    ports::{Notifier, QueueMode, SpeechEngine, TransactionSink},
    Error, Result,
};

#[derive(Default)]
pub struct FakeSpeech {
    fail_init: bool,
    fail_speak: AtomicBool,
    locale: Mutex<Option<String>>,
    spoken: Mutex<Vec<(String, QueueMode)>>,
    shutdowns: AtomicUsize,
    gate: Option<Arc<Notify>>,
    started: AtomicUsize,
}

impl FakeSpeech {
    pub fn failing_init() -> Self {
        Self {
            fail_init: true,
            ..Default::default()
        }
    }

    /// Every `speak` blocks until `gate` is notified.
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Default::default()
        }
    }

    /// Number of `speak` calls entered, finished or not.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn fail_speak(&self) {
        self.fail_speak.store(true, Ordering::SeqCst);
    }

    pub fn spoken(&self) -> Vec<(String, QueueMode)> {
        self.spoken.lock().unwrap().clone()
    }

    pub fn spoken_text(&self) -> Vec<String> {
        self.spoken().into_iter().map(|(t, _)| t).collect()
    }

    pub fn locale(&self) -> Option<String> {
        self.locale.lock().unwrap().clone()
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechEngine for FakeSpeech {
    async fn init(&self, locale: &str) -> Result<()> {
        if self.fail_init {
            return Err(Error::Speech("no engine installed".to_string()));
        }
        *self.locale.lock().unwrap() = Some(locale.to_string());
        Ok(())
    }

    async fn speak(&self, text: &str, mode: QueueMode) -> Result<()> {
        if self.fail_speak.load(Ordering::SeqCst) {
            return Err(Error::Speech("audio device busy".to_string()));
        }
        self.started.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.spoken.lock().unwrap().push((text.to_string(), mode));
        Ok(())
    }

    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakeNotifier {
    fail_show: AtomicBool,
    channels: Mutex<Vec<NotificationChannel>>,
    shown: Mutex<Vec<(NotificationId, String, String)>>,
    cancelled: Mutex<Vec<NotificationId>>,
}

impl FakeNotifier {
    pub fn fail_show(&self) {
        self.fail_show.store(true, Ordering::SeqCst);
    }

    pub fn channels(&self) -> Vec<NotificationChannel> {
        self.channels.lock().unwrap().clone()
    }

    pub fn shown(&self) -> Vec<(NotificationId, String, String)> {
        self.shown.lock().unwrap().clone()
    }

    /// Bodies of announcement notifications, in display order.
    pub fn announcements(&self) -> Vec<String> {
        self.shown()
            .into_iter()
            .filter(|(id, _, _)| *id == NotificationId::ANNOUNCEMENT)
            .map(|(_, _, body)| body)
            .collect()
    }

    pub fn cancelled(&self) -> Vec<NotificationId> {
        self.cancelled.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn create_channel(&self, channel: &NotificationChannel) -> Result<()> {
        self.channels.lock().unwrap().push(channel.clone());
        Ok(())
    }

    async fn show(&self, id: NotificationId, title: &str, body: &str) -> Result<()> {
        if self.fail_show.load(Ordering::SeqCst) {
            return Err(Error::Notification("no notification daemon".to_string()));
        }
        self.shown
            .lock()
            .unwrap()
            .push((id, title.to_string(), body.to_string()));
        Ok(())
    }

    async fn cancel(&self, id: NotificationId) -> Result<()> {
        self.cancelled.lock().unwrap().push(id);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeSink {
    fail: AtomicBool,
    panic_once: AtomicBool,
    rows: Mutex<Vec<TransactionRecord>>,
}

impl FakeSink {
    pub fn failing() -> Self {
        Self {
            fail: AtomicBool::new(true),
            ..Default::default()
        }
    }

    /// The first insert panics; later ones succeed.
    pub fn panicking_once() -> Self {
        Self {
            panic_once: AtomicBool::new(true),
            ..Default::default()
        }
    }

    pub fn rows(&self) -> Vec<TransactionRecord> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransactionSink for FakeSink {
    async fn insert(&self, record: &TransactionRecord) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Store("database is locked".to_string()));
        }
        if self.panic_once.swap(false, Ordering::SeqCst) {
            panic!("sink exploded");
        }
        self.rows.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Poll `cond` until it holds or two seconds pass.
pub async fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}
