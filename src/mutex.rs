//! Holds the [`Mutex`] type and methods

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use std::cell::UnsafeCell;
use std::collections::VecDeque;
use std::sync::{Mutex as StdMutex, MutexGuard as StdMutexGuard, PoisonError};

use crate::scheduler::{self, TaskContext};
use crate::{KernelError, Priority, TaskId};

/// A mutual exclusion lock which suspends the waiting task
///
/// Unlike a spin lock, a task waiting here gives up the CPU. When the owner
/// unlocks, ownership passes straight to the highest priority waiter (first
/// come, first served between equals).
///
/// The lock is not recursive: a task locking it twice waits on itself.
pub struct Mutex<T> {
    ownership: StdMutex<Ownership>,
    contents: UnsafeCell<T>,
}

struct Ownership {
    owner: Option<TaskId>,
    waiters: VecDeque<Waiter>,
}

struct Waiter {
    context: TaskContext,
    priority: Priority,
}

impl Ownership {
    /// Remove and return the waiter that should own the lock next
    fn next_owner(&mut self) -> Option<Waiter> {
        let mut best: Option<usize> = None;
        for (idx, waiter) in self.waiters.iter().enumerate() {
            match best {
                Some(best_idx) if self.waiters[best_idx].priority >= waiter.priority => {}
                _ => best = Some(idx),
            }
        }
        best.and_then(|idx| self.waiters.remove(idx))
    }
}

impl<T> Mutex<T> {
    /// Create a new, unlocked, mutex
    pub const fn new(value: T) -> Mutex<T> {
        Mutex {
            ownership: StdMutex::new(Ownership {
                owner: None,
                waiters: VecDeque::new(),
            }),
            contents: UnsafeCell::new(value),
        }
    }

    fn ownership(&self) -> StdMutexGuard<'_, Ownership> {
        self.ownership.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the mutex, suspending the calling task until it is ours
    pub fn lock(&self) -> Result<MutexGuard<'_, T>, KernelError> {
        let context = scheduler::current().ok_or(KernelError::NotInTask)?;
        let mut queued = false;
        loop {
            {
                let mut ownership = self.ownership();
                match ownership.owner {
                    None => {
                        ownership.owner = Some(context.id);
                        break;
                    }
                    // Handed over to us by the previous owner
                    Some(owner) if queued && owner == context.id => break,
                    Some(owner) => {
                        if !queued {
                            log::trace!("- {} waits for lock held by {}", context.id, owner);
                            let priority = context.kernel.priority(context.id);
                            ownership.waiters.push_back(Waiter {
                                context: context.clone(),
                                priority,
                            });
                            queued = true;
                        }
                    }
                }
            }
            if let Err(e) = context.kernel.block(context.id, None) {
                self.ownership()
                    .waiters
                    .retain(|waiter| waiter.context.id != context.id);
                return Err(e);
            }
        }
        Ok(MutexGuard {
            mutex: self,
            owner: context,
        })
    }

    /// Is anyone holding the lock right now?
    pub fn is_locked(&self) -> bool {
        self.ownership().owner.is_some()
    }

    /// Get the contents back out
    pub fn into_inner(self) -> T {
        self.contents.into_inner()
    }

    fn unlock(&self) {
        let next = {
            let mut ownership = self.ownership();
            let next = ownership.next_owner();
            ownership.owner = next.as_ref().map(|waiter| waiter.context.id);
            next
        };
        if let Some(waiter) = next {
            waiter.context.kernel.wake(waiter.context.id);
        }
    }
}

/// SAFETY: Only the task recorded as owner can reach the contents, through
/// its [`MutexGuard`], and ownership changes under the inner lock.
unsafe impl<T: Send> Sync for Mutex<T> {}

/// Exclusive access to the contents of a [`Mutex`]
///
/// Dropping the guard unlocks the mutex. If that makes a higher priority
/// task ready, it runs straight away.
pub struct MutexGuard<'a, T> {
    mutex: &'a Mutex<T>,
    owner: TaskContext,
}

impl<T> core::ops::Deref for MutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: we own the lock, so nobody else is looking at the contents
        unsafe { &*self.mutex.contents.get() }
    }
}

impl<T> core::ops::DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: we own the lock, so nobody else is looking at the contents
        unsafe { &mut *self.mutex.contents.get() }
    }
}

impl<T> Drop for MutexGuard<'_, T> {
    fn drop(&mut self) {
        self.mutex.unlock();
        self.owner.kernel.preempt(self.owner.id);
    }
}


// End of File
