// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-capacity circular buffer for session output history.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::event::OutputEvent;

/// Bounded in-memory event log.
///
/// When full, a write overwrites the oldest entry. Cloning shares the
/// underlying buffer. Safe under concurrent writers and readers.
#[derive(Clone)]
pub struct RingBuffer {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    buf: VecDeque<OutputEvent>,
    capacity: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                buf: VecDeque::with_capacity(capacity.min(1024)),
                capacity: capacity.max(1),
            })),
        }
    }

    pub fn write(&self, event: OutputEvent) {
        let mut inner = self.inner.lock();
        if inner.buf.len() == inner.capacity {
            inner.buf.pop_front();
        }
        inner.buf.push_back(event);
    }

    /// Copy of the current contents in insertion order.
    pub fn snapshot(&self) -> Vec<OutputEvent> {
        self.inner.lock().buf.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().buf.is_empty()
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("RingBuffer")
            .field("len", &inner.buf.len())
            .field("capacity", &inner.capacity)
            .finish()
    }
}

#[cfg(test)]
#[path = "ring_tests.rs"]
mod tests;
