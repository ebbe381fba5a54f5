//! Service lifecycle controller.
//!
//! STOPPED → STARTING → RUNNING → STOPPING → STOPPED
//!
//! While running, a supervisor task owns both subscriptions and the message
//! interceptor; the announcement worker runs beside it under the same
//! cancellation token, and every persistence write is a short-lived task in a
//! tracker. Child tasks are plain tokio tasks, so a panic in one of them
//! never takes the supervisor or its siblings down.

use std::sync::{Arc, Weak};

use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    domain::{InboundEvent, NotificationChannel, NotificationId, ServiceState, StopRequest},
    interceptor::MessageInterceptor,
    ports::{EventSource, Notifier, SettingsStore, SpeechEngine, StopSignal, TransactionSink},
    queue::AnnouncementQueue,
    speech::Speaker,
    store::TransactionStore,
    subscription::Subscription,
    worker::AnnouncementWorker,
    Result,
};

pub const STATUS_TITLE: &str = "UPI Speaker Mode";
pub const STATUS_BODY: &str = "Service is running";

/// Everything the service talks to, injected at construction.
#[derive(Clone)]
pub struct Collaborators {
    pub events: Arc<dyn EventSource>,
    pub stop_signal: Arc<dyn StopSignal>,
    pub settings: Arc<dyn SettingsStore>,
    pub sink: Arc<dyn TransactionSink>,
    pub speech: Arc<dyn SpeechEngine>,
    pub notifier: Arc<dyn Notifier>,
}

#[derive(Clone)]
pub struct UpiSpeakerService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    cfg: Arc<Config>,
    deps: Collaborators,
    store: Arc<TransactionStore>,
    state: watch::Sender<ServiceState>,
    running: Mutex<Option<Running>>,
}

struct Running {
    cancel: CancellationToken,
    supervisor: JoinHandle<()>,
    worker: JoinHandle<()>,
    tasks: TaskTracker,
    speaker: Arc<Speaker>,
    queue: Arc<AnnouncementQueue>,
}

impl UpiSpeakerService {
    pub fn new(cfg: Arc<Config>, deps: Collaborators) -> Self {
        let store = Arc::new(TransactionStore::new(deps.sink.clone()));
        let (state, _) = watch::channel(ServiceState::Stopped);
        Self {
            inner: Arc::new(ServiceInner {
                cfg,
                deps,
                store,
                state,
                running: Mutex::new(None),
            }),
        }
    }

    pub fn state(&self) -> ServiceState {
        *self.inner.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ServiceState> {
        self.inner.state.subscribe()
    }

    /// Resolve once the service is (back) in `Stopped`.
    pub async fn wait_stopped(&self) {
        let mut rx = self.inner.state.subscribe();
        let _ = rx.wait_for(|s| *s == ServiceState::Stopped).await;
    }

    /// Announcements queued but not yet spoken; zero when not running.
    pub async fn pending_announcements(&self) -> usize {
        self.inner
            .running
            .lock()
            .await
            .as_ref()
            .map(|r| r.queue.len())
            .unwrap_or(0)
    }

    /// Start the service. A call outside `Stopped` is a no-op.
    ///
    /// Failing to subscribe to either event source rolls the start back and
    /// returns the error; speech and notification failures are only logged.
    pub async fn start(&self) -> Result<()> {
        let mut running = self.inner.running.lock().await;
        let state = self.state();
        if running.is_some() || state != ServiceState::Stopped {
            debug!("Start ignored in state {state}");
            return Ok(());
        }

        self.set_state(ServiceState::Starting);
        info!("State: STOPPED → STARTING");

        let cfg = &self.inner.cfg;
        let deps = &self.inner.deps;

        let speaker = Arc::new(Speaker::new(deps.speech.clone()));
        speaker.init(&cfg.speech_locale).await;

        let (events, stops) = match self.subscribe_all() {
            Ok(subs) => subs,
            Err(e) => {
                warn!("Failed to subscribe, rolling back start: {e}");
                speaker.release().await;
                self.set_state(ServiceState::Stopped);
                return Err(e);
            }
        };

        if let Err(e) = deps
            .notifier
            .create_channel(&NotificationChannel::sms_service())
            .await
        {
            warn!("Failed to create notification channel: {e}");
        }
        if let Err(e) = deps
            .notifier
            .show(NotificationId::STATUS, STATUS_TITLE, STATUS_BODY)
            .await
        {
            warn!("Failed to show status notification: {e}");
        }

        let cancel = CancellationToken::new();
        let tasks = TaskTracker::new();
        let queue = Arc::new(AnnouncementQueue::new());

        let worker = AnnouncementWorker::new(
            queue.clone(),
            speaker.clone(),
            deps.notifier.clone(),
            cfg.poll_interval,
        );
        let worker = tokio::spawn(worker.run(cancel.clone()));

        let interceptor = MessageInterceptor::new(
            deps.settings.clone(),
            cfg.prefs_namespace.clone(),
            self.inner.store.clone(),
            queue.clone(),
            tasks.clone(),
            cancel.clone(),
        );
        let supervisor = tokio::spawn(supervise(
            Arc::downgrade(&self.inner),
            interceptor,
            events,
            stops,
            cancel.clone(),
        ));

        *running = Some(Running {
            cancel,
            supervisor,
            worker,
            tasks,
            speaker,
            queue,
        });
        self.set_state(ServiceState::Running);
        info!("State: STARTING → RUNNING");

        Ok(())
    }

    /// Stop the service and wait until it reaches `Stopped`.
    ///
    /// Idempotent: stopping a stopped service returns immediately, and a stop
    /// racing another stop waits for the first one to finish.
    pub async fn stop(&self) {
        let running = self.inner.running.lock().await.take();
        let Some(running) = running else {
            self.wait_stopped().await;
            return;
        };

        self.set_state(ServiceState::Stopping);
        info!("State: RUNNING → STOPPING");

        let Running {
            cancel,
            supervisor,
            worker,
            tasks,
            speaker,
            queue,
        } = running;

        cancel.cancel();
        if let Err(e) = supervisor.await {
            warn!("Supervisor task ended abnormally: {e}");
        }

        // An announcement or write already in flight may finish; past the
        // grace period it is left to complete on its own.
        tasks.close();
        let grace = self.inner.cfg.shutdown_grace;
        let drain = async {
            if let Err(e) = worker.await {
                warn!("Announcement worker ended abnormally: {e}");
            }
            tasks.wait().await;
        };
        if tokio::time::timeout(grace, drain).await.is_err() {
            warn!("In-flight work still running after {grace:?}, detaching");
        }
        if !queue.is_empty() {
            info!("Dropping {} unannounced entries", queue.len());
        }

        speaker.release().await;
        if let Err(e) = self.inner.deps.notifier.cancel(NotificationId::STATUS).await {
            warn!("Failed to remove status notification: {e}");
        }

        self.set_state(ServiceState::Stopped);
        info!("State: STOPPING → STOPPED");
    }

    fn subscribe_all(&self) -> Result<(Subscription<InboundEvent>, Subscription<StopRequest>)> {
        let events = self.inner.deps.events.subscribe()?;
        let stops = self.inner.deps.stop_signal.subscribe()?;
        Ok((events, stops))
    }

    fn set_state(&self, state: ServiceState) {
        self.inner.state.send_replace(state);
    }
}

async fn supervise(
    service: Weak<ServiceInner>,
    interceptor: MessageInterceptor,
    mut events: Subscription<InboundEvent>,
    mut stops: Subscription<StopRequest>,
    cancel: CancellationToken,
) {
    let mut events_open = true;
    let mut stops_open = true;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            req = stops.recv(), if stops_open => match req {
                Some(req) if req.is_stop() => {
                    info!("Stop signal received");
                    if let Some(inner) = service.upgrade() {
                        let svc = UpiSpeakerService { inner };
                        tokio::spawn(async move { svc.stop().await });
                    }
                    break;
                }
                Some(req) => debug!("Ignoring control message {}", req.action),
                None => {
                    warn!("Stop signal source closed");
                    stops_open = false;
                }
            },
            ev = events.recv(), if events_open => match ev {
                Some(ev) => interceptor.handle_event(ev),
                None => {
                    warn!("Inbound event source closed");
                    events_open = false;
                }
            },
        }
    }

    events.unsubscribe();
    stops.unsubscribe();
    debug!("Supervisor exited, subscriptions released");
}
