//! Holds the [`Task`] type and methods

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::Error;

/// The code a task runs
///
/// Task bodies normally loop forever and only return when a kernel call
/// reports that the scheduler has stopped.
pub type TaskEntryFn = Box<dyn FnOnce() -> Result<(), Error> + Send + 'static>;

/// Static task priority
///
/// When more than one task is runnable, the one with the highest priority
/// gets the CPU.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl core::fmt::Display for Priority {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        };
        fmt.write_str(name)
    }
}

/// Represents a task that the scheduler will manage
pub struct Task {
    name: &'static str,
    priority: Priority,
    entry_fn: TaskEntryFn,
}

impl Task {
    /// Create a new [`Task`] object
    pub fn new<F>(name: &'static str, priority: Priority, entry_fn: F) -> Task
    where
        F: FnOnce() -> Result<(), Error> + Send + 'static,
    {
        Task {
            name,
            priority,
            entry_fn: Box::new(entry_fn),
        }
    }

    /// Get the name of this task
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Get the static priority of this task
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Take the entry function out, so it can be moved onto the task thread
    pub(crate) fn into_parts(self) -> (&'static str, Priority, TaskEntryFn) {
        (self.name, self.priority, self.entry_fn)
    }
}

impl core::fmt::Debug for Task {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        fmt.debug_struct("Task")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

// End of File
