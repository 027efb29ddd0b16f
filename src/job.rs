//! Sort jobs, and the flags that say when they are done

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::Queue;
use crate::sort::Algorithm;

/// The largest array a job can carry
pub const MAX_N: usize = 100;

/// How many jobs fit in each worker's queue
pub const QUEUE_CAPACITY: usize = 10;

/// The elements of a job
pub type JobData = heapless::Vec<i32, MAX_N>;

/// Carries jobs from the coordinator to one worker
pub type WorkQueue = Queue<SortJob, QUEUE_CAPACITY>;

/// One array to be sorted
///
/// Every worker gets its own copy, so they can all sort in place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortJob {
    data: JobData,
}

impl SortJob {
    /// Make a job from a slice, or `None` if it is empty or too long
    pub fn from_slice(values: &[i32]) -> Option<SortJob> {
        if values.is_empty() {
            return None;
        }
        let mut data = JobData::new();
        for value in values {
            data.push(*value).ok()?;
        }
        Some(SortJob { data })
    }

    /// Number of elements, always between 1 and [`MAX_N`]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.data
    }

    /// Hand over the elements, for sorting in place
    pub fn into_data(self) -> JobData {
        self.data
    }
}

/// Says whether a worker has finished its latest job
///
/// Only the coordinator clears it (just before handing out a job) and only
/// the worker sets it (once the job is done), so no lock is needed. Starts
/// out set: a fresh worker is idle.
#[derive(Debug)]
pub struct DoneFlag {
    done: AtomicBool,
}

impl DoneFlag {
    pub const fn new() -> DoneFlag {
        DoneFlag {
            done: AtomicBool::new(true),
        }
    }

    /// Worker side: the job is finished
    pub fn set(&self) {
        self.done.store(true, Ordering::Release);
    }

    /// Coordinator side: a job is about to be handed out
    pub fn clear(&self) {
        self.done.store(false, Ordering::Release);
    }

    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

impl Default for DoneFlag {
    fn default() -> Self {
        DoneFlag::new()
    }
}

/// What the outside world can see of one worker
#[derive(Debug, Clone)]
pub struct WorkerState {
    pub algorithm: Algorithm,
    pub done: Arc<DoneFlag>,
}

/// The coordinator's view of every worker's done flag
#[derive(Debug, Clone)]
pub struct CompletionGate {
    workers: Vec<WorkerState>,
}

impl CompletionGate {
    pub fn new(workers: Vec<WorkerState>) -> CompletionGate {
        CompletionGate { workers }
    }

    /// Have all workers finished? Reads the flags afresh on every call.
    pub fn all_idle(&self) -> bool {
        self.workers.iter().all(|worker| worker.done.is_done())
    }

    /// Mark every worker busy, ahead of handing out a job
    pub fn clear_all(&self) {
        for worker in self.workers.iter() {
            worker.done.clear();
        }
    }

    pub fn workers(&self) -> &[WorkerState] {
        &self.workers
    }
}


// End of File
