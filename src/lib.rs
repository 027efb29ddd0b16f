//! # sortrace
//!
//! Three sorting algorithms race each other on a simulated single-CPU,
//! priority-preemptive kernel. Every worker gives up the CPU after each
//! step, so the console shows the tasks interleaving as they go.
//!
//! The kernel ([`Scheduler`], [`Queue`], [`Mutex`]) is usable on its own;
//! [`Demo`] wires up the workers and the coordinator.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod console;
pub mod coordinator;
pub mod demo;
mod error;
pub mod input;
pub mod job;
mod mutex;
mod queue;
mod scheduler;
pub mod sort;
mod task;
pub mod timer;
pub mod worker;

pub use demo::{Demo, DemoConfig, TimeSource};
pub use error::{Error, KernelError, Result};
pub use job::{MAX_N, QUEUE_CAPACITY};
pub use mutex::{Mutex, MutexGuard};
pub use queue::Queue;
pub use scheduler::{
    HaltHandle, KernelConfig, RunReport, Scheduler, StopReason, TaskFailure, TaskId,
};
pub use task::{Priority, Task, TaskEntryFn};

/// Delay the calling task for at least the given number of ticks
///
/// A delay of zero just lets other ready tasks of the same priority run.
/// Fails with [`KernelError::Halted`] once the scheduler has stopped.
pub fn delay(ticks: u32) -> core::result::Result<(), KernelError> {
    let context = scheduler::current().ok_or(KernelError::NotInTask)?;
    context.kernel.delay(context.id, ticks)
}

/// Give up the CPU to any other ready task of equal or higher priority
pub fn yield_now() -> core::result::Result<(), KernelError> {
    let context = scheduler::current().ok_or(KernelError::NotInTask)?;
    context.kernel.yield_now(context.id)
}

/// Get the current time in ticks
///
/// Outside of a task there is no clock, so you get `u32::MAX`.
pub fn now() -> u32 {
    match scheduler::current() {
        Some(context) => context.kernel.now(),
        None => 0xFFFF_FFFF,
    }
}

/// Get the ID of the running task
pub fn task_id() -> TaskId {
    match scheduler::current() {
        Some(context) => context.id,
        None => TaskId::invalid(),
    }
}

/// Stop the scheduler this task belongs to
///
/// Every other task gets [`KernelError::Halted`] from its next kernel call.
/// Does nothing outside of a task.
pub fn halt() {
    if let Some(context) = scheduler::current() {
        context.kernel.halt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_calls_outside_a_task() {
        assert_eq!(delay(1), Err(KernelError::NotInTask));
        assert_eq!(yield_now(), Err(KernelError::NotInTask));
        assert_eq!(now(), u32::MAX);
        assert!(task_id().is_invalid());
        halt();
    }

    #[test]
    fn task_ids_follow_spawn_order() {
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut scheduler = Scheduler::new(KernelConfig::default());
        let mut spawned = Vec::new();
        for name in ["first", "second"] {
            let seen = seen.clone();
            spawned.push(scheduler.spawn(Task::new(name, Priority::Normal, move || {
                seen.lock().unwrap().push(task_id());
                Ok(())
            })));
        }
        scheduler.run().unwrap();
        assert_eq!(*seen.lock().unwrap(), spawned);
    }
}

// End of File
