//! Race the three sorts, reading array sizes from stdin

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use std::error::Error;
use std::io::Read;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use log::LevelFilter;

use sortrace::console::Console;
use sortrace::input::{ChannelInput, ScriptedInput};
use sortrace::{Demo, DemoConfig, StopReason, TimeSource};

/// Bubble, insertion and quick sort race each other on a tiny
/// priority-preemptive kernel
#[derive(Parser, Debug)]
#[command(name = "sortrace")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Largest array size to accept
    #[arg(long = "max-n", default_value_t = sortrace::MAX_N)]
    max_n: usize,

    /// Seed for the random array contents
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Ticks between coordinator checks, and the worker queue timeout
    #[arg(
        long = "poll-interval",
        default_value_t = 10,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    poll_interval: u32,

    /// Ticks to wait before the first prompt
    #[arg(long = "startup-delay", default_value_t = 200)]
    startup_delay: u32,

    /// Ticks each forced yield lasts
    #[arg(
        long = "step-delay",
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    step_delay: u32,

    /// Milliseconds of wall-clock time per idle tick [default: 1, or 0 with --script]
    #[arg(long = "tick-ms")]
    tick_ms: Option<u64>,

    /// Nominal tick rate, for --ticks-clock
    #[arg(long = "tick-hz", default_value_t = 1_000)]
    tick_hz: u32,

    /// Time the sorts in scheduler ticks instead of wall-clock time
    #[arg(long = "ticks-clock")]
    ticks_clock: bool,

    /// Stop after this many ticks
    #[arg(long = "max-ticks")]
    max_ticks: Option<u32>,

    /// Play back this input instead of reading stdin (\r and \n are understood)
    #[arg(long)]
    script: Option<String>,

    /// Do not print input lines back
    #[arg(long = "no-echo")]
    no_echo: bool,

    /// More diagnostics on stderr (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config(&self) -> DemoConfig {
        let default_tick_ms = if self.script.is_some() { 0 } else { 1 };
        DemoConfig {
            max_n: self.max_n,
            seed: self.seed,
            poll_interval: self.poll_interval,
            startup_delay: self.startup_delay,
            step_delay: self.step_delay,
            tick_period: Duration::from_millis(self.tick_ms.unwrap_or(default_tick_ms)),
            tick_hz: self.tick_hz,
            time_source: if self.ticks_clock {
                TimeSource::Ticks
            } else {
                TimeSource::Host
            },
            max_ticks: self.max_ticks,
            echo: !self.no_echo,
        }
    }
}

/// Turn the `\r`, `\n` and `\\` escapes in a script into real bytes
fn unescape(script: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(script.len());
    let mut chars = script.bytes();
    while let Some(byte) = chars.next() {
        if byte != b'\\' {
            bytes.push(byte);
            continue;
        }
        match chars.next() {
            Some(b'r') => bytes.push(b'\r'),
            Some(b'n') => bytes.push(b'\n'),
            Some(b'\\') => bytes.push(b'\\'),
            Some(other) => bytes.extend_from_slice(&[b'\\', other]),
            None => bytes.push(b'\\'),
        }
    }
    bytes
}

/// Forward stdin to the kernel one byte at a time, until end of file
fn spawn_stdin_reader() -> std::io::Result<ChannelInput> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for byte in stdin.lock().bytes() {
                let Ok(byte) = byte else {
                    break;
                };
                if tx.send(byte).is_err() {
                    break;
                }
            }
        })?;
    Ok(ChannelInput::new(rx))
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::builder()
        .filter_level(level)
        .parse_default_env()
        .init();

    let config = cli.config();
    let console = Console::new(std::io::stdout());
    let demo = match &cli.script {
        Some(script) => Demo::new(config, console, ScriptedInput::new(unescape(script))),
        None => Demo::new(config, console, spawn_stdin_reader()?),
    };

    let report = demo.run()?;
    // The prompt has no line ending of its own
    println!();
    log::info!("Stopped at tick {}: {:?}", report.ticks, report.reason);
    for failure in report.failures.iter() {
        log::error!("Task '{}' failed: {}", failure.task, failure.error);
    }
    if !report.failures.is_empty() {
        return Err(format!("{} tasks failed", report.failures.len()).into());
    }
    if report.reason == StopReason::Deadlock {
        return Err("every task is stuck".into());
    }
    Ok(())
}


// End of File
