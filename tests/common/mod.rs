// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

//! Helpers shared by the race scenario tests

#![allow(dead_code)]

use sortrace::console::{Capture, Console};
use sortrace::input::ByteSource;
use sortrace::{Demo, DemoConfig, RunReport, TimeSource};

/// One console line, taken apart
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Progress {
        tick: u32,
        algorithm: String,
        data: Vec<i32>,
    },
    Sorted {
        tick: u32,
        algorithm: String,
        data: Vec<i32>,
        micros: u32,
    },
    /// A prompt, with whatever was echoed after it
    Prompt { echo: String },
    Invalid { max_n: usize },
    Dataset { data: Vec<i32> },
}

/// Settings that make runs repeatable and quick
pub fn test_config() -> DemoConfig {
    DemoConfig {
        time_source: TimeSource::Ticks,
        startup_delay: 20,
        max_ticks: Some(1_000_000),
        ..DemoConfig::default()
    }
}

/// Run a demo to completion and return the report plus every console line
pub fn run_demo<S>(config: DemoConfig, source: S) -> (Demo, RunReport, Vec<String>)
where
    S: ByteSource + 'static,
{
    let capture = Capture::new();
    let demo = Demo::new(config, Console::new(capture.clone()), source);
    let report = demo.run().expect("demo runs");
    (demo, report, capture.lines())
}

/// Space separated numbers, each followed by a space
fn values(text: &str) -> Option<Vec<i32>> {
    if !text.is_empty() && !text.ends_with(' ') {
        return None;
    }
    text.split_whitespace().map(|v| v.parse().ok()).collect()
}

/// Take a console line apart, or `None` if it is not one we emit
pub fn parse_line(line: &str) -> Option<Parsed> {
    if let Some(echo) = line.strip_prefix("Enter N: ") {
        return Some(Parsed::Prompt {
            echo: echo.to_string(),
        });
    }
    if let Some(rest) = line.strip_prefix("Invalid N! Max ") {
        let max_n = rest.strip_suffix('.')?.parse().ok()?;
        return Some(Parsed::Invalid { max_n });
    }
    if let Some(rest) = line.strip_prefix("Random numbers: ") {
        return Some(Parsed::Dataset {
            data: values(rest)?,
        });
    }
    let rest = line.strip_prefix("Tick ")?;
    let (tick, rest) = rest.split_once(" [")?;
    let tick = tick.parse().ok()?;
    let (algorithm, rest) = rest.split_once("]: ")?;
    let algorithm = algorithm.to_string();
    match rest.strip_prefix("Final Sorted: ") {
        Some(rest) => {
            let (data, time) = rest.split_once("| Time: ")?;
            let micros = time.strip_suffix(" us")?.parse().ok()?;
            Some(Parsed::Sorted {
                tick,
                algorithm,
                data: values(data)?,
                micros,
            })
        }
        None => Some(Parsed::Progress {
            tick,
            algorithm,
            data: values(rest)?,
        }),
    }
}

/// Parse every line, failing the test on any line we do not recognise
pub fn parse_all(lines: &[String]) -> Vec<Parsed> {
    lines
        .iter()
        .map(|line| parse_line(line).unwrap_or_else(|| panic!("mangled line {line:?}")))
        .collect()
}

/// Is `sorted` the sorted form of `input`?
pub fn is_sorted_permutation(input: &[i32], sorted: &[i32]) -> bool {
    let mut expected = input.to_vec();
    expected.sort_unstable();
    expected == sorted
}

// End of File
