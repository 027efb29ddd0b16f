//! Error types for sortrace

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use std::io;

use thiserror::Error;

/// Errors a kernel call can report back to the calling task
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// The scheduler has stopped; the task should unwind
    #[error("scheduler halted")]
    Halted,

    /// A bounded wait expired before the event arrived
    #[error("timed out")]
    Timeout,

    /// A blocking call was made from outside a scheduler task
    #[error("kernel call made outside of a task")]
    NotInTask,
}

/// Top-level error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("task '{0}' panicked")]
    Panicked(&'static str),
}

impl Error {
    /// Is this just the scheduler telling a task to stop?
    pub fn is_halt(&self) -> bool {
        matches!(self, Error::Kernel(KernelError::Halted))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

// End of File
