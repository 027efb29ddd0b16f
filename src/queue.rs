//! Holds the [`Queue`] type and methods

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::{Mutex, MutexGuard, PoisonError};

use heapless::Deque;

use crate::KernelError;
use crate::scheduler::{self, TaskContext};

/// A bounded FIFO message queue, holding up to `N` items
///
/// Sending never blocks. Receiving blocks the calling task until an item
/// arrives or the timeout expires.
pub struct Queue<T, const N: usize> {
    inner: Mutex<QueueInner<T, N>>,
}

struct QueueInner<T, const N: usize> {
    items: Deque<T, N>,
    /// Tasks blocked in [`Queue::receive`]
    receivers: Vec<TaskContext>,
}

impl<T, const N: usize> QueueInner<T, N> {
    fn forget_receiver(&mut self, context: &TaskContext) {
        self.receivers.retain(|waiter| waiter.id != context.id);
    }
}

impl<T, const N: usize> Queue<T, N> {
    /// Create an empty queue
    pub fn new() -> Self {
        Queue {
            inner: Mutex::new(QueueInner {
                items: Deque::new(),
                receivers: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner<T, N>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an item to the back of the queue without blocking
    ///
    /// Gives the item back if the queue is full. If a higher priority task was
    /// waiting for this item, it runs before this call returns.
    pub fn try_send(&self, item: T) -> Result<(), T> {
        let receiver = {
            let mut inner = self.lock();
            inner.items.push_back(item)?;
            if inner.receivers.is_empty() {
                None
            } else {
                Some(inner.receivers.remove(0))
            }
        };
        if let Some(receiver) = receiver {
            receiver.kernel.wake(receiver.id);
            if let Some(context) = scheduler::current() {
                context.kernel.preempt(context.id);
            }
        }
        Ok(())
    }

    /// Take an item from the front of the queue, waiting up to `timeout`
    /// ticks for one to arrive
    pub fn receive(&self, timeout: u32) -> Result<T, KernelError> {
        let context = scheduler::current().ok_or(KernelError::NotInTask)?;
        let deadline = context.kernel.now().wrapping_add(timeout);
        loop {
            {
                let mut inner = self.lock();
                if let Some(item) = inner.items.pop_front() {
                    inner.forget_receiver(&context);
                    return Ok(item);
                }
                if scheduler::reached(context.kernel.now(), deadline) {
                    inner.forget_receiver(&context);
                    return Err(KernelError::Timeout);
                }
                if !inner.receivers.iter().any(|waiter| waiter.id == context.id) {
                    inner.receivers.push(context.clone());
                }
            }
            context.kernel.block(context.id, Some(deadline))?;
        }
    }

    /// Take an item from the front of the queue, if there is one
    pub fn try_receive(&self) -> Option<T> {
        self.lock().items.pop_front()
    }

    /// How many items are waiting
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Is the queue empty?
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// The most items this queue can hold
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<T, const N: usize> Default for Queue<T, N> {
    fn default() -> Self {
        Queue::new()
    }
}


// End of File
