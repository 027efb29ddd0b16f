// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

//! Whole-race scenarios, run on the deterministic tick clock

mod common;

use std::collections::HashMap;
use std::sync::mpsc;

use common::{Parsed, is_sorted_permutation, parse_all, run_demo, test_config};
use sortrace::console::{Capture, Console};
use sortrace::coordinator::FixedGenerator;
use sortrace::input::{ChannelInput, ScriptedInput};
use sortrace::sort::Algorithm;
use sortrace::{Demo, DemoConfig, StopReason};

/// What one dispatched job produced
#[derive(Debug, Default)]
struct Round {
    input: Vec<i32>,
    progress: HashMap<String, usize>,
    finals: HashMap<String, Vec<i32>>,
}

/// Split the parsed output into rounds, checking that no job is handed out
/// while the previous one is still being sorted
fn rounds(parsed: &[Parsed]) -> Vec<Round> {
    let mut rounds: Vec<Round> = Vec::new();
    for line in parsed {
        match line {
            Parsed::Dataset { data } => {
                if let Some(previous) = rounds.last() {
                    assert_eq!(previous.finals.len(), 3, "job handed out mid-round");
                }
                rounds.push(Round {
                    input: data.clone(),
                    ..Round::default()
                });
            }
            Parsed::Progress { algorithm, .. } => {
                let round = rounds.last_mut().expect("progress before any job");
                assert!(!round.finals.contains_key(algorithm));
                *round.progress.entry(algorithm.clone()).or_default() += 1;
            }
            Parsed::Sorted {
                algorithm, data, ..
            } => {
                let round = rounds.last_mut().expect("result before any job");
                let earlier = round.finals.insert(algorithm.clone(), data.clone());
                assert!(earlier.is_none(), "{algorithm} finished twice");
            }
            Parsed::Prompt { .. } => {
                if let Some(round) = rounds.last() {
                    assert_eq!(round.finals.len(), 3, "prompted mid-round");
                }
            }
            Parsed::Invalid { .. } => {}
        }
    }
    rounds
}

fn assert_idle(demo: &Demo) {
    for state in demo.worker_states() {
        assert!(state.done.is_done(), "{} still busy", state.algorithm);
        assert!(demo.queue(state.algorithm).is_empty());
    }
}

#[test]
fn worked_example() {
    let (demo, report, lines) = {
        let capture = Capture::new();
        let demo = Demo::new(
            test_config(),
            Console::new(capture.clone()),
            ScriptedInput::new("5\r"),
        )
        .with_generator(FixedGenerator::new([5, 3, 4, 1, 2]));
        let report = demo.run().unwrap();
        (demo, report, capture.lines())
    };
    assert_eq!(report.reason, StopReason::Halted);
    assert!(report.failures.is_empty());
    assert_idle(&demo);

    let parsed = parse_all(&lines);
    let rounds = rounds(&parsed);
    assert_eq!(rounds.len(), 1);
    let round = &rounds[0];
    assert_eq!(round.input, [5, 3, 4, 1, 2]);
    for algorithm in Algorithm::ALL {
        assert_eq!(round.finals[algorithm.name()], [1, 2, 3, 4, 5]);
    }
    assert_eq!(round.progress["Bubble"], 3);
    assert_eq!(round.progress["Insertion"], 4);
    assert_eq!(round.progress["Quick"], 3);

    assert_eq!(parsed.first(), Some(&Parsed::Prompt { echo: "5".into() }));
    assert_eq!(parsed.last(), Some(&Parsed::Prompt { echo: String::new() }));
}

#[test]
fn every_algorithm_finishes_with_a_sorted_permutation() {
    let config = DemoConfig {
        seed: 0x5eed,
        ..test_config()
    };
    let (demo, report, lines) = run_demo(config, ScriptedInput::new("7\r20\r1\r2\r45\r"));
    assert_eq!(report.reason, StopReason::Halted);
    assert!(report.failures.is_empty());
    assert_idle(&demo);

    let rounds = rounds(&parse_all(&lines));
    assert_eq!(
        rounds.iter().map(|round| round.input.len()).collect::<Vec<_>>(),
        [7, 20, 1, 2, 45]
    );
    for round in rounds.iter() {
        let n = round.input.len();
        assert!(round.input.iter().all(|value| (0..1000).contains(value)));
        for algorithm in Algorithm::ALL {
            let sorted = &round.finals[algorithm.name()];
            assert!(
                is_sorted_permutation(&round.input, sorted),
                "{algorithm} gave {sorted:?} for {:?}",
                round.input
            );
            let passes = round
                .progress
                .get(algorithm.name())
                .copied()
                .unwrap_or_default();
            assert!(passes <= algorithm.max_passes(n), "{algorithm} n={n}");
        }
    }
}

#[test]
fn tick_clock_times_are_whole_ticks() {
    let (_demo, _report, lines) = run_demo(test_config(), ScriptedInput::new("10\r"));
    for line in parse_all(&lines) {
        if let Parsed::Sorted { micros, .. } = line {
            assert_eq!(micros % 1_000, 0);
        }
    }
}

#[test]
fn invalid_sizes_are_rejected() {
    let (demo, report, lines) = run_demo(test_config(), ScriptedInput::new("0\r999\r"));
    assert_eq!(report.reason, StopReason::Halted);
    assert_idle(&demo);
    assert_eq!(
        parse_all(&lines),
        [
            Parsed::Prompt { echo: "0".into() },
            Parsed::Invalid { max_n: 100 },
            Parsed::Prompt { echo: "999".into() },
            Parsed::Invalid { max_n: 100 },
            Parsed::Prompt { echo: String::new() },
        ]
    );
}

#[test]
fn rejection_does_not_spoil_the_next_round() {
    let (demo, report, lines) = run_demo(test_config(), ScriptedInput::new("abc\r\n3\r\n"));
    assert_eq!(report.reason, StopReason::Halted);
    assert_idle(&demo);
    let parsed = parse_all(&lines);
    assert_eq!(parsed[0], Parsed::Prompt { echo: "abc".into() });
    assert_eq!(parsed[1], Parsed::Invalid { max_n: 100 });
    assert_eq!(parsed[2], Parsed::Prompt { echo: "3".into() });
    let rounds = rounds(&parsed);
    assert_eq!(rounds.len(), 1);
    assert_eq!(rounds[0].input.len(), 3);
}

#[test]
fn smaller_max_n_is_enforced() {
    let config = DemoConfig {
        max_n: 8,
        ..test_config()
    };
    let (_demo, _report, lines) = run_demo(config, ScriptedInput::new("9\r8\r"));
    let parsed = parse_all(&lines);
    assert_eq!(parsed[1], Parsed::Invalid { max_n: 8 });
    assert_eq!(rounds(&parsed).len(), 1);
}

/// Race a reversed array of eight, the worst case for every algorithm
fn reversed_race(config: DemoConfig) -> Vec<Parsed> {
    let capture = Capture::new();
    let demo = Demo::new(
        config,
        Console::new(capture.clone()),
        ScriptedInput::new("8\r"),
    )
    .with_generator(FixedGenerator::new([8, 7, 6, 5, 4, 3, 2, 1]));
    let report = demo.run().unwrap();
    assert_eq!(report.reason, StopReason::Halted);
    assert!(report.failures.is_empty());
    assert_idle(&demo);
    parse_all(&capture.lines())
}

#[test]
fn lower_priorities_run_while_bubble_sorts() {
    let parsed = reversed_race(test_config());
    let bubble_done = parsed
        .iter()
        .position(|line| {
            matches!(line, Parsed::Sorted { algorithm, .. } if algorithm == "Bubble")
        })
        .expect("bubble finishes");
    let first_final = parsed
        .iter()
        .position(|line| matches!(line, Parsed::Sorted { .. }))
        .expect("someone finishes");
    assert_eq!(first_final, bubble_done, "bubble has the fewest steps here");
    assert!(
        parsed[..bubble_done].iter().any(|line| matches!(
            line,
            Parsed::Progress { algorithm, .. } if algorithm != "Bubble"
        )),
        "only bubble made progress before it finished"
    );
    assert_eq!(rounds(&parsed).len(), 1);
}

#[test]
fn zero_step_delay_still_interleaves() {
    let stepped = reversed_race(DemoConfig {
        step_delay: 0,
        ..test_config()
    });
    assert_eq!(stepped, reversed_race(test_config()));
}

#[test]
fn zero_poll_interval_still_finishes() {
    let config = DemoConfig {
        poll_interval: 0,
        max_ticks: Some(50_000),
        ..test_config()
    };
    let (demo, report, lines) = run_demo(config, ScriptedInput::new("5\r"));
    assert_eq!(report.reason, StopReason::Halted);
    assert!(report.ticks < 50_000);
    assert_idle(&demo);
    let rounds = rounds(&parse_all(&lines));
    assert_eq!(rounds.len(), 1);
    assert_eq!(rounds[0].finals.len(), 3);
}

#[test]
fn padded_and_signed_sizes_are_accepted() {
    let (_demo, report, lines) = run_demo(test_config(), ScriptedInput::new(" 4\r+3\r"));
    assert_eq!(report.reason, StopReason::Halted);
    let rounds = rounds(&parse_all(&lines));
    assert_eq!(
        rounds.iter().map(|round| round.input.len()).collect::<Vec<_>>(),
        [4, 3]
    );
}

#[test]
fn open_input_runs_until_the_tick_limit() {
    let (tx, rx) = mpsc::channel::<u8>();
    let config = DemoConfig {
        max_ticks: Some(5_000),
        ..test_config()
    };
    let (_demo, report, lines) = run_demo(config, ChannelInput::new(rx));
    drop(tx);
    assert_eq!(report.reason, StopReason::TickLimit);
    assert_eq!(report.ticks, 5_000);
    assert!(report.failures.is_empty());
    assert_eq!(lines, ["Enter N: "]);
}

// End of File
