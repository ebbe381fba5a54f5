//! Message interceptor: inbound text -> persisted record + queued announcement.

use std::sync::Arc;

use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, info, warn};

use crate::{
    classifier::classify,
    domain::{InboundEvent, TransactionRecord},
    ports::SettingsStore,
    queue::AnnouncementQueue,
    settings::SMS_ENABLED_KEY,
    store::TransactionStore,
};

pub struct MessageInterceptor {
    settings: Arc<dyn SettingsStore>,
    namespace: String,
    store: Arc<TransactionStore>,
    queue: Arc<AnnouncementQueue>,
    tasks: TaskTracker,
    cancel: CancellationToken,
}

impl MessageInterceptor {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        namespace: impl Into<String>,
        store: Arc<TransactionStore>,
        queue: Arc<AnnouncementQueue>,
        tasks: TaskTracker,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            settings,
            namespace: namespace.into(),
            store,
            queue,
            tasks,
            cancel,
        }
    }

    /// Process every payload of an SMS event, in delivery order.
    pub fn handle_event(&self, event: InboundEvent) {
        if !event.is_sms() {
            debug!("Ignoring inbound event with action {}", event.action);
            return;
        }

        for payload in event.payloads {
            match payload {
                Some(text) if !text.trim().is_empty() => {
                    self.handle_message(&text);
                }
                _ => debug!("Dropping inbound payload without text"),
            }
        }
    }

    /// Classify one message body. On a match the record is persisted by a
    /// detached task and its announcement is queued right away.
    pub fn handle_message(&self, text: &str) -> Option<TransactionRecord> {
        if self.cancel.is_cancelled() {
            debug!("Service stopping, ignoring message");
            return None;
        }

        let enabled = self
            .settings
            .get_bool(&self.namespace, SMS_ENABLED_KEY, true);
        debug!("Processing message: {text}");
        if !enabled {
            debug!("SMS announcements are disabled, skipping");
            return None;
        }

        let Some(record) = classify(text) else {
            debug!("Message does not match criteria for announcement");
            return None;
        };

        self.spawn_persist(record.clone());

        let announcement = record.announcement();
        info!("Queueing announcement: {announcement}");
        self.queue.push(announcement);

        Some(record)
    }

    fn spawn_persist(&self, record: TransactionRecord) {
        let slot = self.store.reserve();
        let store = self.store.clone();
        self.tasks.spawn(async move {
            match store.persist_in(slot, &record).await {
                Ok(()) => debug!(
                    "Persisted {} of {} at {}",
                    record.kind,
                    record.amount,
                    record.formatted_timestamp()
                ),
                Err(e) => warn!("Failed to persist transaction: {e}"),
            }
        });
    }
}
