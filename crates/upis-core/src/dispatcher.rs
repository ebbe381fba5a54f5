//! Process-local broadcast dispatcher.
//!
//! Host adapters publish inbound events and control messages here; the
//! service subscribes through the [`EventSource`] / [`StopSignal`] ports.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, Weak,
    },
};

use tokio::sync::mpsc;
use tracing::debug;

use crate::{
    domain::{InboundEvent, StopRequest},
    ports::{EventSource, StopSignal},
    subscription::Subscription,
    Error, Result,
};

pub struct Dispatcher<T> {
    inner: Arc<DispatcherInner<T>>,
}

struct DispatcherInner<T> {
    name: &'static str,
    next_id: AtomicU64,
    subscribers: Mutex<BTreeMap<u64, mpsc::UnboundedSender<T>>>,
}

impl<T> DispatcherInner<T> {
    fn remove(&self, id: u64) {
        if let Ok(mut subs) = self.subscribers.lock() {
            if subs.remove(&id).is_some() {
                debug!("{}: subscriber {id} released", self.name);
            }
        }
    }
}

impl<T: Clone + Send + 'static> Dispatcher<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                name,
                next_id: AtomicU64::new(1),
                subscribers: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    /// Deliver `item` to every live subscriber, in registration order.
    /// Returns how many subscribers received it.
    pub fn publish(&self, item: T) -> usize {
        let Ok(mut subs) = self.inner.subscribers.lock() else {
            return 0;
        };
        subs.retain(|_, tx| !tx.is_closed());
        let mut delivered = 0usize;
        for tx in subs.values() {
            if tx.send(item.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    pub fn register(&self) -> Result<Subscription<T>> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut subs = self.inner.subscribers.lock().map_err(|_| {
                Error::Subscription(format!("{} dispatcher lock poisoned", self.inner.name))
            })?;
            subs.insert(id, tx);
        }
        debug!("{}: subscriber {id} registered", self.inner.name);

        let weak: Weak<DispatcherInner<T>> = Arc::downgrade(&self.inner);
        Ok(Subscription::new(rx, move || {
            if let Some(inner) = weak.upgrade() {
                inner.remove(id);
            }
        }))
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .map(|subs| subs.values().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }
}

impl<T> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl EventSource for Dispatcher<InboundEvent> {
    fn subscribe(&self) -> Result<Subscription<InboundEvent>> {
        self.register()
    }
}

impl StopSignal for Dispatcher<StopRequest> {
    fn subscribe(&self) -> Result<Subscription<StopRequest>> {
        self.register()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publishes_to_every_subscriber() {
        let d: Dispatcher<InboundEvent> = Dispatcher::new("sms");
        let mut a = EventSource::subscribe(&d).unwrap();
        let mut b = EventSource::subscribe(&d).unwrap();

        let ev = InboundEvent::sms(["Rs 5 credited"]);
        assert_eq!(d.publish(ev.clone()), 2);
        assert_eq!(a.recv().await, Some(ev.clone()));
        assert_eq!(b.recv().await, Some(ev));
    }

    #[test]
    fn dropping_subscription_unregisters() {
        let d: Dispatcher<StopRequest> = Dispatcher::new("control");
        let sub = StopSignal::subscribe(&d).unwrap();
        assert_eq!(d.subscriber_count(), 1);
        drop(sub);
        assert_eq!(d.subscriber_count(), 0);
        assert_eq!(d.publish(StopRequest::stop_service()), 0);
    }

    #[test]
    fn release_after_dispatcher_dropped_is_harmless() {
        let d: Dispatcher<StopRequest> = Dispatcher::new("control");
        let sub = d.register().unwrap();
        drop(d);
        sub.unsubscribe();
    }

    #[tokio::test]
    async fn preserves_publish_order() {
        let d: Dispatcher<StopRequest> = Dispatcher::new("control");
        let mut sub = d.register().unwrap();
        for action in ["a", "b", "c"] {
            d.publish(StopRequest {
                action: action.to_string(),
            });
        }
        let mut seen = Vec::new();
        while let Some(req) = sub.try_recv() {
            seen.push(req.action);
        }
        assert_eq!(seen, ["a", "b", "c"]);
    }
}
