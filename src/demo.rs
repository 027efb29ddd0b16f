//! Puts the workers and the coordinator together on one scheduler

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use crate::console::Console;
use crate::coordinator::{Coordinator, Generator, RandomGenerator};
use crate::input::{ByteSource, InputPort};
use crate::job::{CompletionGate, DoneFlag, WorkQueue, WorkerState};
use crate::sort::Algorithm;
use crate::timer::{AnyClock, HostClock, TickClock};
use crate::worker::SortWorker;
use crate::{Error, KernelConfig, Priority, RunReport, Scheduler, Task};

/// Where the workers' elapsed times come from
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TimeSource {
    /// Wall-clock time on the host
    Host,
    /// Scheduler ticks at `tick_hz`, for repeatable runs
    Ticks,
}

/// Settings for a [`Demo`]
#[derive(Clone, Debug)]
pub struct DemoConfig {
    /// Largest array size the operator may ask for, up to [`crate::MAX_N`]
    pub max_n: usize,
    /// Seed for the random job data
    pub seed: u64,
    /// Ticks between coordinator checks, and the worker queue timeout
    pub poll_interval: u32,
    /// Ticks the coordinator waits before the first prompt
    pub startup_delay: u32,
    /// Length of each forced yield, in ticks
    pub step_delay: u32,
    /// Wall-clock time per idle tick
    pub tick_period: Duration,
    /// Nominal tick rate, used by [`TimeSource::Ticks`]
    pub tick_hz: u32,
    pub time_source: TimeSource,
    /// Stop after this many ticks
    pub max_ticks: Option<u32>,
    /// Print each input line back to the console
    pub echo: bool,
}

impl Default for DemoConfig {
    fn default() -> Self {
        DemoConfig {
            max_n: crate::MAX_N,
            seed: 1,
            poll_interval: 10,
            startup_delay: 200,
            step_delay: 1,
            tick_period: Duration::ZERO,
            tick_hz: 1_000,
            time_source: TimeSource::Host,
            max_ticks: None,
            echo: true,
        }
    }
}

/// The whole race: three sort workers, one coordinator, one console
pub struct Demo {
    config: DemoConfig,
    console: Console,
    input: Arc<InputPort>,
    workers: Vec<WorkerState>,
    queues: Vec<Arc<WorkQueue>>,
    generator: StdMutex<Option<Box<dyn Generator>>>,
}

impl Demo {
    /// Create the queues and done flags. Nothing runs until [`Demo::run`].
    pub fn new<S>(config: DemoConfig, console: Console, source: S) -> Demo
    where
        S: ByteSource + 'static,
    {
        let workers = Algorithm::ALL
            .into_iter()
            .map(|algorithm| WorkerState {
                algorithm,
                done: Arc::new(DoneFlag::new()),
            })
            .collect();
        let queues = Algorithm::ALL
            .iter()
            .map(|_| Arc::new(WorkQueue::new()))
            .collect();
        let generator: Box<dyn Generator> = Box::new(RandomGenerator::new(config.seed));
        Demo {
            config,
            console,
            input: Arc::new(InputPort::new(source)),
            workers,
            queues,
            generator: StdMutex::new(Some(generator)),
        }
    }

    /// Make up job data some other way than with the seeded generator
    pub fn with_generator<G>(self, generator: G) -> Demo
    where
        G: Generator + 'static,
    {
        let generator: Box<dyn Generator> = Box::new(generator);
        *self
            .generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(generator);
        self
    }

    /// Each worker's algorithm and done flag, in spawn order
    pub fn worker_states(&self) -> &[WorkerState] {
        &self.workers
    }

    /// The queue feeding the given algorithm's worker
    pub fn queue(&self, algorithm: Algorithm) -> &WorkQueue {
        let idx = Algorithm::ALL
            .iter()
            .position(|candidate| *candidate == algorithm)
            .unwrap_or_default();
        &self.queues[idx]
    }

    /// Run the race until the input closes, the tick limit is hit, or
    /// something halts the scheduler
    ///
    /// The job generator is used up by the first run; later runs start a
    /// fresh one from the configured seed.
    pub fn run(&self) -> Result<RunReport, Error> {
        let config = &self.config;
        let mut scheduler = Scheduler::new(KernelConfig {
            tick_period: config.tick_period,
            max_ticks: config.max_ticks,
        });
        let clock = match config.time_source {
            TimeSource::Host => AnyClock::Host(HostClock::new()),
            TimeSource::Ticks => AnyClock::Ticks(TickClock::new(config.tick_hz)),
        };

        for (worker, queue) in self.workers.iter().zip(self.queues.iter()) {
            let sort_worker = SortWorker::new(
                worker.algorithm,
                queue.clone(),
                worker.done.clone(),
                self.console.clone(),
                clock,
            )
            .with_receive_timeout(config.poll_interval)
            .with_step_delay(config.step_delay);
            scheduler.spawn(Task::new(
                worker.algorithm.name(),
                worker.algorithm.priority(),
                move || sort_worker.run(),
            ));
        }

        let taken = self
            .generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let generator: Box<dyn Generator> = match taken {
            Some(generator) => generator,
            None => Box::new(RandomGenerator::new(config.seed)),
        };
        let coordinator = Coordinator::new(
            self.console.clone(),
            self.input.clone(),
            CompletionGate::new(self.workers.clone()),
            self.queues.clone(),
            generator,
        )
        .with_max_n(config.max_n)
        .with_poll_interval(config.poll_interval)
        .with_echo(config.echo);
        let startup_delay = config.startup_delay;
        scheduler.spawn(Task::new("Coordinator", Priority::Normal, move || {
            coordinator.run(startup_delay)
        }));

        log::info!(
            "Racing with max N {} and seed {}",
            config.max_n.min(crate::MAX_N),
            config.seed
        );
        scheduler.run()
    }
}


// End of File
