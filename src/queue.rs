//! A bounded FIFO with a coalesced wake signal.
//!
//! Many producers [Queue::add] concurrently; a single consumer waits on
//! [Queue::notified] and then drains with [Queue::get_next] until the queue is empty.
//! The wake signal holds at most one pending permit, so a burst of additions produces
//! at least one wake but never queues up one wake per item.
use crate::{Error, Result};

use tokio::sync::futures::Notified;
use tokio::sync::Notify;
use tracing::trace;

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
pub struct Queue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
    notify: Notify,
}

impl<T> Queue<T> {
    pub fn new(capacity: u16) -> Self {
        let capacity = capacity as usize;
        Queue { items: Mutex::new(VecDeque::with_capacity(capacity)), capacity, notify: Notify::new() }
    }

    fn items(&self) -> MutexGuard<'_, VecDeque<T>> {
        // The lock is never held across user code, so a poisoned queue is still consistent.
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `item` at the tail, or fails with [Error::QueueFull] leaving the queue as it
    /// was. Never blocks.
    pub fn add(&self, item: T) -> Result<()> {
        {
            let mut items = self.items();
            if items.len() >= self.capacity {
                return Err(Error::QueueFull);
            }
            items.push_back(item);
            trace!("queued item ({}/{})", items.len(), self.capacity);
        }
        // Stores a single permit if nobody is waiting; further calls are no-ops until the
        // permit is consumed.
        self.notify.notify_one();
        Ok(())
    }

    /// Pops the head of the queue, if any.
    pub fn get_next(&self) -> Option<T> {
        self.items().pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Resolves once a wake is pending. Consumes the pending wake.
    pub fn notified(&self) -> Notified<'_> {
        self.notify.notified()
    }
}
