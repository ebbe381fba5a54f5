use std::{collections::VecDeque, sync::Mutex};

/// Unbounded FIFO of ready-to-speak announcement strings.
///
/// Safe for many producers and a single consumer without external locking.
/// Neither side ever waits: `push` appends, `pop_or_none` returns immediately.
#[derive(Debug, Default)]
pub struct AnnouncementQueue {
    entries: Mutex<VecDeque<String>>,
}

impl AnnouncementQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        let entry = entry.into();
        match self.entries.lock() {
            Ok(mut q) => q.push_back(entry),
            Err(poisoned) => poisoned.into_inner().push_back(entry),
        }
    }

    pub fn pop_or_none(&self) -> Option<String> {
        match self.entries.lock() {
            Ok(mut q) => q.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        }
    }

    pub fn len(&self) -> usize {
        match self.entries.lock() {
            Ok(q) => q.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
