//! Announcement worker: drains the queue one entry per tick.
//!
//! Polling keeps cancellation simple: the token is checked at the top of every
//! iteration and raced against the sleep, but never against an announcement
//! that is already being spoken or shown.

use std::{sync::Arc, time::Duration};

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{domain::NotificationId, ports::Notifier, queue::AnnouncementQueue, speech::Speaker};

/// Title of every announcement notification.
pub const ANNOUNCEMENT_TITLE: &str = "UPI Credit";

pub struct AnnouncementWorker {
    queue: Arc<AnnouncementQueue>,
    speaker: Arc<Speaker>,
    notifier: Arc<dyn Notifier>,
    poll_interval: Duration,
}

impl AnnouncementWorker {
    pub fn new(
        queue: Arc<AnnouncementQueue>,
        speaker: Arc<Speaker>,
        notifier: Arc<dyn Notifier>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            queue,
            speaker,
            notifier,
            poll_interval,
        }
    }

    pub async fn run(self, cancel: CancellationToken) {
        info!(
            "Announcement worker started (poll every {:?})",
            self.poll_interval
        );
        loop {
            if cancel.is_cancelled() {
                break;
            }

            if let Some(entry) = self.queue.pop_or_none() {
                self.announce(&entry).await;
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(self.poll_interval) => {}
            }
        }
        info!(
            "Announcement worker stopped ({} pending)",
            self.queue.len()
        );
    }

    /// Speak `entry`, then show it. Failures of either side are logged only.
    pub async fn announce(&self, entry: &str) {
        info!("Announcing: {entry}");
        self.speaker.speak(entry).await;
        if let Err(e) = self
            .notifier
            .show(NotificationId::ANNOUNCEMENT, ANNOUNCEMENT_TITLE, entry)
            .await
        {
            warn!("Failed to show announcement notification: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{eventually, FakeNotifier, FakeSpeech};
    use crate::ports::QueueMode;
    use tokio::sync::Notify;

    struct Rig {
        queue: Arc<AnnouncementQueue>,
        speech: Arc<FakeSpeech>,
        notifier: Arc<FakeNotifier>,
        worker: AnnouncementWorker,
    }

    async fn rig(speech: FakeSpeech) -> Rig {
        let queue = Arc::new(AnnouncementQueue::new());
        let speech = Arc::new(speech);
        let speaker = Arc::new(Speaker::new(speech.clone()));
        speaker.init("en-US").await;
        let notifier = Arc::new(FakeNotifier::default());
        let worker = AnnouncementWorker::new(
            queue.clone(),
            speaker,
            notifier.clone(),
            Duration::from_millis(5),
        );
        Rig {
            queue,
            speech,
            notifier,
            worker,
        }
    }

    #[tokio::test]
    async fn announces_in_fifo_order() {
        let r = rig(FakeSpeech::default()).await;
        for e in ["A", "B", "C"] {
            r.queue.push(e);
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(r.worker.run(cancel.clone()));

        let notifier = r.notifier.clone();
        assert!(eventually(|| notifier.announcements().len() == 3).await);
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(r.speech.spoken_text(), ["A", "B", "C"]);
        assert!(r.speech.spoken().iter().all(|(_, m)| *m == QueueMode::Add));
        assert_eq!(r.notifier.announcements(), ["A", "B", "C"]);
        assert!(r
            .notifier
            .shown()
            .iter()
            .all(|(id, title, _)| *id == NotificationId::ANNOUNCEMENT && title == ANNOUNCEMENT_TITLE));
    }

    #[tokio::test]
    async fn cancelled_worker_dequeues_nothing() {
        let r = rig(FakeSpeech::default()).await;
        r.queue.push("never");

        let cancel = CancellationToken::new();
        cancel.cancel();
        r.worker.run(cancel).await;

        assert_eq!(r.queue.len(), 1);
        assert!(r.speech.spoken().is_empty());
    }

    #[tokio::test]
    async fn notification_still_fires_without_speech() {
        let r = rig(FakeSpeech::failing_init()).await;
        r.worker.announce("Received Rupees 10.0").await;
        assert!(r.speech.spoken().is_empty());
        assert_eq!(r.notifier.announcements(), ["Received Rupees 10.0"]);
    }

    #[tokio::test]
    async fn collaborator_failures_do_not_stop_the_loop() {
        let r = rig(FakeSpeech::default()).await;
        r.speech.fail_speak();
        r.notifier.fail_show();
        r.queue.push("one");
        r.queue.push("two");

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(r.worker.run(cancel.clone()));
        let queue = r.queue.clone();
        assert!(eventually(|| queue.is_empty()).await);
        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn cancellation_lets_inflight_announcement_finish() {
        let gate = Arc::new(Notify::new());
        let r = rig(FakeSpeech::gated(gate.clone())).await;
        r.queue.push("first");
        r.queue.push("second");

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(r.worker.run(cancel.clone()));

        let speech = r.speech.clone();
        assert!(eventually(|| speech.started() == 1).await);
        cancel.cancel();
        gate.notify_one();
        handle.await.unwrap();

        assert_eq!(r.speech.spoken_text(), ["first"]);
        assert_eq!(r.notifier.announcements(), ["first"]);
        assert_eq!(r.queue.len(), 1);
        assert_eq!(r.speech.started(), 1);
    }
}
