use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tracing::{debug, info, warn};

use crate::ports::{QueueMode, SpeechEngine};

/// Speech collaborator as seen by the worker.
///
/// A failed initialisation leaves the speaker silent instead of failing the
/// service; every utterance is appended to the engine's own queue.
pub struct Speaker {
    engine: Arc<dyn SpeechEngine>,
    ready: AtomicBool,
}

impl Speaker {
    pub fn new(engine: Arc<dyn SpeechEngine>) -> Self {
        Self {
            engine,
            ready: AtomicBool::new(false),
        }
    }

    pub async fn init(&self, locale: &str) -> bool {
        match self.engine.init(locale).await {
            Ok(()) => {
                info!("Speech engine ready ({locale})");
                self.ready.store(true, Ordering::SeqCst);
                true
            }
            Err(e) => {
                warn!("Speech engine unavailable, announcements will be silent: {e}");
                self.ready.store(false, Ordering::SeqCst);
                false
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub async fn speak(&self, text: &str) {
        if !self.is_ready() {
            debug!("Speech not ready, skipping audio for: {text}");
            return;
        }
        if let Err(e) = self.engine.speak(text, QueueMode::Add).await {
            warn!("Failed to speak announcement: {e}");
        }
    }

    pub async fn release(&self) {
        self.ready.store(false, Ordering::SeqCst);
        self.engine.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeSpeech;

    #[tokio::test]
    async fn speaks_after_successful_init() {
        let engine = Arc::new(FakeSpeech::default());
        let speaker = Speaker::new(engine.clone());
        assert!(speaker.init("en-US").await);
        speaker.speak("hello").await;
        assert_eq!(engine.spoken(), vec![("hello".to_string(), QueueMode::Add)]);
        assert_eq!(engine.locale().as_deref(), Some("en-US"));
    }

    #[tokio::test]
    async fn failed_init_makes_speaker_silent() {
        let engine = Arc::new(FakeSpeech::failing_init());
        let speaker = Speaker::new(engine.clone());
        assert!(!speaker.init("en-US").await);
        speaker.speak("hello").await;
        assert!(engine.spoken().is_empty());
    }

    #[tokio::test]
    async fn release_shuts_engine_down_and_silences() {
        let engine = Arc::new(FakeSpeech::default());
        let speaker = Speaker::new(engine.clone());
        speaker.init("en-US").await;
        speaker.release().await;
        speaker.speak("late").await;
        assert_eq!(engine.shutdowns(), 1);
        assert!(engine.spoken().is_empty());
    }
}
