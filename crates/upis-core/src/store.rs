//! Append-only transaction persistence in arrival order.
//!
//! Writes are fire-and-forget from the interceptor's point of view, but each
//! write waits for every earlier one to finish before it reaches the sink.
//! The order is fixed when a [`WriteSlot`] is reserved, which the interceptor
//! does synchronously while handling a message.

use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use crate::{domain::TransactionRecord, ports::TransactionSink, Result};

pub struct TransactionStore {
    sink: Arc<dyn TransactionSink>,
    tail: Mutex<Option<oneshot::Receiver<()>>>,
}

/// Position in the write order. Dropping a slot unblocks the next one.
#[derive(Debug)]
pub struct WriteSlot {
    after: Option<oneshot::Receiver<()>>,
    done: oneshot::Sender<()>,
}

impl TransactionStore {
    pub fn new(sink: Arc<dyn TransactionSink>) -> Self {
        Self {
            sink,
            tail: Mutex::new(None),
        }
    }

    pub fn reserve(&self) -> WriteSlot {
        let (done, rx) = oneshot::channel();
        let after = match self.tail.lock() {
            Ok(mut tail) => tail.replace(rx),
            Err(poisoned) => poisoned.into_inner().replace(rx),
        };
        WriteSlot { after, done }
    }

    pub async fn persist(&self, record: &TransactionRecord) -> Result<()> {
        let slot = self.reserve();
        self.persist_in(slot, record).await
    }

    pub async fn persist_in(&self, slot: WriteSlot, record: &TransactionRecord) -> Result<()> {
        let WriteSlot { after, done } = slot;
        if let Some(prev) = after {
            // Err means the previous writer went away without finishing; either way it is our turn.
            let _ = prev.await;
        }
        let res = self.sink.insert(record).await;
        let _ = done.send(());
        res
    }
}
