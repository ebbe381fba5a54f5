//! Hexagonal ports for every collaborator the core talks to.
//!
//! Adapters live in the `upis-desktop` and `upis-sqlite` crates; tests use
//! hand-written fakes.

use async_trait::async_trait;

use crate::{
    domain::{InboundEvent, NotificationChannel, NotificationId, StopRequest, TransactionRecord},
    subscription::Subscription,
    Result,
};

/// Source of raw inbound text events.
pub trait EventSource: Send + Sync {
    fn subscribe(&self) -> Result<Subscription<InboundEvent>>;
}

/// Out-of-band shutdown broadcast.
pub trait StopSignal: Send + Sync {
    fn subscribe(&self) -> Result<Subscription<StopRequest>>;
}

/// Key-value settings store, grouped by namespace.
///
/// Reads are expected to be cheap and are performed fresh for every message.
pub trait SettingsStore: Send + Sync {
    fn get_bool(&self, namespace: &str, key: &str, default: bool) -> bool;
}

/// Persistence collaborator. Append-only.
#[async_trait]
pub trait TransactionSink: Send + Sync {
    async fn insert(&self, record: &TransactionRecord) -> Result<()>;
}

/// How a new utterance relates to the ones already queued by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueMode {
    /// Play after everything already queued.
    Add,
    /// Drop queued utterances and play immediately.
    Flush,
}

/// Text-to-speech collaborator.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Prepare the engine and select the language once.
    async fn init(&self, locale: &str) -> Result<()>;
    async fn speak(&self, text: &str, mode: QueueMode) -> Result<()>;
    /// Release engine resources. Must tolerate repeated calls.
    async fn shutdown(&self);
}

/// Visible notification collaborator.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn create_channel(&self, channel: &NotificationChannel) -> Result<()>;
    async fn show(&self, id: NotificationId, title: &str, body: &str) -> Result<()>;
    async fn cancel(&self, id: NotificationId) -> Result<()>;
}
