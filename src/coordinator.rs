//! The coordinator task, which asks for work and hands it out

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::Error;
use crate::console::{Console, Record};
use crate::input::{InputPort, Line};
use crate::job::{CompletionGate, SortJob, WorkQueue};

/// Makes up the numbers for each job
pub trait Generator: Send {
    /// Produce `n` values
    fn generate(&mut self, n: usize) -> Vec<i32>;
}

/// Pseudo-random values in `0..1000`
pub struct RandomGenerator {
    rng: StdRng,
}

impl RandomGenerator {
    pub fn new(seed: u64) -> RandomGenerator {
        RandomGenerator {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Generator for RandomGenerator {
    fn generate(&mut self, n: usize) -> Vec<i32> {
        (0..n).map(|_| self.rng.gen_range(0..1000)).collect()
    }
}

/// Always the same values, repeated as often as needed
pub struct FixedGenerator {
    values: Vec<i32>,
}

impl FixedGenerator {
    pub fn new(values: impl Into<Vec<i32>>) -> FixedGenerator {
        FixedGenerator {
            values: values.into(),
        }
    }
}

impl Generator for FixedGenerator {
    fn generate(&mut self, n: usize) -> Vec<i32> {
        self.values.iter().copied().cycle().take(n).collect()
    }
}

/// Where the coordinator is in its round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for every worker to raise its done flag
    WaitAllIdle,
    /// Asking for the next array size
    Prompt,
    /// Waiting for a line of input
    AwaitInput,
    /// Checking the line we got
    Validate(Line),
    /// Handing out a job of this many elements
    Dispatch(usize),
    /// Input has closed; nothing more to do
    Finished,
}

/// Reads array sizes from the operator and fans each job out to every
/// worker, one round at a time
pub struct Coordinator {
    console: Console,
    input: Arc<InputPort>,
    gate: CompletionGate,
    queues: Vec<Arc<WorkQueue>>,
    generator: Box<dyn Generator>,
    /// Largest acceptable array size
    max_n: usize,
    /// Ticks between checks on the done flags and the input
    poll_interval: u32,
    /// Print each input line back, as a terminal would
    echo: bool,
    rounds: u32,
}

impl Coordinator {
    pub fn new(
        console: Console,
        input: Arc<InputPort>,
        gate: CompletionGate,
        queues: Vec<Arc<WorkQueue>>,
        generator: Box<dyn Generator>,
    ) -> Coordinator {
        Coordinator {
            console,
            input,
            gate,
            queues,
            generator,
            max_n: crate::MAX_N,
            poll_interval: 10,
            echo: false,
            rounds: 0,
        }
    }

    /// Set the largest acceptable array size, up to [`crate::MAX_N`]
    pub fn with_max_n(mut self, max_n: usize) -> Self {
        self.max_n = max_n.clamp(1, crate::MAX_N);
        self
    }

    /// Set the ticks between checks, at least one
    pub fn with_poll_interval(mut self, ticks: u32) -> Self {
        self.poll_interval = ticks.max(1);
        self
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// The task body. Waits `startup_delay` ticks, then runs rounds until
    /// the input closes, at which point it stops the scheduler.
    pub fn run(mut self, startup_delay: u32) -> Result<(), Error> {
        crate::delay(startup_delay)?;
        let mut phase = Phase::WaitAllIdle;
        while phase != Phase::Finished {
            phase = self.step(phase)?;
        }
        log::info!("Input closed after {} rounds, stopping", self.rounds);
        crate::halt();
        Ok(())
    }

    /// Do the work for one phase, and say which phase comes next
    pub fn step(&mut self, phase: Phase) -> Result<Phase, Error> {
        let next = match phase {
            Phase::WaitAllIdle => {
                if self.gate.all_idle() {
                    Phase::Prompt
                } else {
                    crate::delay(self.poll_interval)?;
                    Phase::WaitAllIdle
                }
            }
            Phase::Prompt => {
                self.console.log(&Record::Prompt)?;
                self.input.clear();
                Phase::AwaitInput
            }
            Phase::AwaitInput => {
                let open = self.input.service();
                match self.input.take_line() {
                    Some(line) => Phase::Validate(line),
                    None if !open => Phase::Finished,
                    None => {
                        crate::delay(self.poll_interval)?;
                        Phase::AwaitInput
                    }
                }
            }
            Phase::Validate(line) => self.validate(&line)?,
            Phase::Dispatch(n) => {
                self.dispatch(n)?;
                Phase::WaitAllIdle
            }
            Phase::Finished => Phase::Finished,
        };
        Ok(next)
    }

    /// Accept a size between 1 and `max_n`; anything else restarts the round
    fn validate(&mut self, line: &Line) -> Result<Phase, Error> {
        if self.echo {
            self.console.log(&Record::Echo { text: &line.text() })?;
        }
        let requested = line.parse_number();
        match usize::try_from(requested) {
            Ok(n) if (1..=self.max_n).contains(&n) => Ok(Phase::Dispatch(n)),
            _ => {
                log::debug!("Rejected array size {}", requested);
                self.console.log(&Record::InvalidSize { max_n: self.max_n })?;
                Ok(Phase::WaitAllIdle)
            }
        }
    }

    /// Make up a job of `n` elements and give every worker a copy
    fn dispatch(&mut self, n: usize) -> Result<(), Error> {
        let values = self.generator.generate(n);
        let Some(job) = SortJob::from_slice(&values) else {
            self.console.log(&Record::InvalidSize { max_n: self.max_n })?;
            return Ok(());
        };
        self.console.log(&Record::Dataset {
            data: job.as_slice(),
        })?;

        self.rounds += 1;
        log::debug!("Round {}: dispatching {} elements", self.rounds, n);
        self.gate.clear_all();
        for (queue, worker) in self.queues.iter().zip(self.gate.workers()) {
            // Cannot happen while we wait for every worker between rounds
            if queue.try_send(job.clone()).is_err() {
                log::warn!("{} queue full, job dropped", worker.algorithm);
            }
        }
        Ok(())
    }

    /// How many jobs have been handed out
    pub fn rounds(&self) -> u32 {
        self.rounds
    }
}


// End of File
