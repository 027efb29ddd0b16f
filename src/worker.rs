//! The sort worker task

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::Arc;

use crate::console::{Console, Record};
use crate::job::{DoneFlag, SortJob, WorkQueue};
use crate::sort::{Algorithm, SortObserver};
use crate::timer::{Clock, Stopwatch};
use crate::{Error, KernelError};

/// Takes jobs off its queue and sorts them with one algorithm, in full view
pub struct SortWorker<C> {
    algorithm: Algorithm,
    queue: Arc<WorkQueue>,
    done: Arc<DoneFlag>,
    console: Console,
    stopwatch: Stopwatch<C>,
    /// How long to wait on the queue before checking again
    receive_timeout: u32,
    /// How long each forced yield lasts
    step_delay: u32,
}

impl<C: Clock> SortWorker<C> {
    pub fn new(
        algorithm: Algorithm,
        queue: Arc<WorkQueue>,
        done: Arc<DoneFlag>,
        console: Console,
        clock: C,
    ) -> SortWorker<C> {
        SortWorker {
            algorithm,
            queue,
            done,
            console,
            stopwatch: Stopwatch::new(clock),
            receive_timeout: 10,
            step_delay: 1,
        }
    }

    /// Set how many ticks a queue read waits before retrying, at least one
    pub fn with_receive_timeout(mut self, ticks: u32) -> Self {
        self.receive_timeout = ticks.max(1);
        self
    }

    /// Set how many ticks each forced yield lasts, at least one
    ///
    /// A zero-length delay would only yield to equal or higher priorities,
    /// and the lower-priority workers would never get a turn mid-sort.
    pub fn with_step_delay(mut self, ticks: u32) -> Self {
        self.step_delay = ticks.max(1);
        self
    }

    /// The task body. Only returns when the scheduler stops, or the
    /// console breaks.
    pub fn run(mut self) -> Result<(), Error> {
        log::debug!("{} worker running", self.algorithm);
        loop {
            let job = match self.queue.receive(self.receive_timeout) {
                Ok(job) => job,
                Err(KernelError::Timeout) => continue,
                Err(e) => return Err(e.into()),
            };
            self.process(job)?;
        }
    }

    /// Sort one job, printing as we go, then raise the done flag
    fn process(&mut self, job: SortJob) -> Result<(), Error> {
        self.stopwatch.start();
        log::debug!(
            "{} worker took a job of {} at tick {}",
            self.algorithm,
            job.len(),
            crate::now()
        );
        let mut data = job.into_data();
        let mut observer = Observer {
            algorithm: self.algorithm,
            console: &self.console,
            step_delay: self.step_delay,
        };
        self.algorithm.sort(&mut data, &mut observer)?;
        let micros = self.stopwatch.stop();
        self.console.log(&Record::Sorted {
            algorithm: self.algorithm,
            tick: crate::now(),
            data: &data,
            micros,
        })?;
        self.done.set();
        Ok(())
    }
}

/// Yields the CPU after each step and prints each pass
struct Observer<'a> {
    algorithm: Algorithm,
    console: &'a Console,
    step_delay: u32,
}

impl SortObserver for Observer<'_> {
    type Error = Error;

    fn step(&mut self) -> Result<(), Error> {
        crate::delay(self.step_delay)?;
        Ok(())
    }

    fn pass(&mut self, data: &[i32]) -> Result<(), Error> {
        self.console.log(&Record::Progress {
            algorithm: self.algorithm,
            tick: crate::now(),
            data,
        })
    }
}


// End of File
