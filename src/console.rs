//! The shared text console, and the lines we print on it

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::fmt::{self, Write as _};
use std::io::Write;
use std::sync::{Arc, PoisonError};

use crate::sort::Algorithm;
use crate::{Error, Mutex};

/// The longest line we will ever emit, in bytes, including the terminator
///
/// Big enough for a full `MAX_N` array of three digit numbers.
pub const LINE_CAPACITY: usize = 512;

/// One formatted line of console output
pub type LogLine = heapless::String<LINE_CAPACITY>;

/// Everything that gets printed on the console
#[derive(Clone, Copy, Debug)]
pub enum Record<'a> {
    /// Array contents after one pass of a sort
    Progress {
        algorithm: Algorithm,
        tick: u32,
        data: &'a [i32],
    },
    /// The sorted array and how long the sort took
    Sorted {
        algorithm: Algorithm,
        tick: u32,
        data: &'a [i32],
        micros: u32,
    },
    /// Ask the operator for the array size
    Prompt,
    /// Repeat back what the operator typed
    Echo { text: &'a str },
    /// The operator asked for an empty or oversized array
    InvalidSize { max_n: usize },
    /// The freshly generated job data
    Dataset { data: &'a [i32] },
}

impl Record<'_> {
    /// What goes after the record body
    fn terminator(&self) -> &'static str {
        match self {
            Record::Prompt => "",
            _ => "\r\n",
        }
    }
}

/// Print `data` as space separated numbers, each followed by a space
fn write_values(fmt: &mut fmt::Formatter<'_>, data: &[i32]) -> fmt::Result {
    for value in data {
        write!(fmt, "{} ", value)?;
    }
    Ok(())
}

impl fmt::Display for Record<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Record::Progress {
                algorithm,
                tick,
                data,
            } => {
                write!(fmt, "Tick {} [{}]: ", tick, algorithm)?;
                write_values(fmt, data)
            }
            Record::Sorted {
                algorithm,
                tick,
                data,
                micros,
            } => {
                write!(fmt, "Tick {} [{}]: Final Sorted: ", tick, algorithm)?;
                write_values(fmt, data)?;
                write!(fmt, "| Time: {} us", micros)
            }
            Record::Prompt => fmt.write_str("\r\nEnter N: "),
            Record::Echo { text } => fmt.write_str(text),
            Record::InvalidSize { max_n } => write!(fmt, "Invalid N! Max {}.", max_n),
            Record::Dataset { data } => {
                fmt.write_str("\r\nRandom numbers: ")?;
                write_values(fmt, data)
            }
        }
    }
}

/// Fills a [`LogLine`], dropping whatever does not fit
struct LineWriter {
    line: LogLine,
    limit: usize,
    truncated: bool,
}

impl fmt::Write for LineWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for ch in s.chars() {
            if self.truncated || self.line.len() + ch.len_utf8() > self.limit {
                self.truncated = true;
                break;
            }
            // Cannot fail, we just checked the length
            let _ = self.line.push(ch);
        }
        Ok(())
    }
}

/// Render a record as one complete console line
///
/// Overlong bodies are cut short, but the terminator always fits.
pub fn render(record: &Record<'_>) -> LogLine {
    let terminator = record.terminator();
    let mut writer = LineWriter {
        line: LogLine::new(),
        limit: LINE_CAPACITY - terminator.len(),
        truncated: false,
    };
    let _ = write!(writer, "{}", record);
    if writer.truncated {
        log::debug!("Console line truncated to {} bytes", writer.line.len());
    }
    // The limit left room for this, so it cannot fail
    let _ = writer.line.push_str(terminator);
    writer.line
}

/// A byte sink shared by every task
///
/// Each record is formatted and written while holding the console lock, so
/// lines from different tasks never mix.
#[derive(Clone)]
pub struct Console {
    port: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Console {
    /// Wrap a writer up as a console
    pub fn new<W>(writer: W) -> Console
    where
        W: Write + Send + 'static,
    {
        Console {
            port: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Print one record, as one line
    pub fn log(&self, record: &Record<'_>) -> Result<(), Error> {
        let mut port = self.port.lock()?;
        let line = render(record);
        port.write_all(line.as_bytes())?;
        port.flush()?;
        Ok(())
    }
}

impl fmt::Debug for Console {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Console").finish_non_exhaustive()
    }
}

/// An in-memory byte sink, which can be inspected afterwards
#[derive(Clone, Default)]
pub struct Capture {
    bytes: Arc<std::sync::Mutex<Vec<u8>>>,
}

impl Capture {
    pub fn new() -> Capture {
        Capture::default()
    }

    /// Everything written so far
    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Everything written so far, split on line endings, without blank lines
    pub fn lines(&self) -> Vec<String> {
        self.contents()
            .split("\r\n")
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_line() {
        let line = render(&Record::Progress {
            algorithm: Algorithm::Bubble,
            tick: 42,
            data: &[3, 1, 2],
        });
        assert_eq!(line.as_str(), "Tick 42 [Bubble]: 3 1 2 \r\n");
    }

    #[test]
    fn sorted_line() {
        let line = render(&Record::Sorted {
            algorithm: Algorithm::Quick,
            tick: 7,
            data: &[1, 2, 3],
            micros: 1500,
        });
        assert_eq!(
            line.as_str(),
            "Tick 7 [Quick]: Final Sorted: 1 2 3 | Time: 1500 us\r\n"
        );
    }

    #[test]
    fn prompt_has_no_terminator() {
        assert_eq!(render(&Record::Prompt).as_str(), "\r\nEnter N: ");
    }

    #[test]
    fn rejection_line() {
        let line = render(&Record::InvalidSize { max_n: 100 });
        assert_eq!(line.as_str(), "Invalid N! Max 100.\r\n");
    }

    #[test]
    fn overlong_lines_keep_their_terminator() {
        let data = [-1_000_000_000; 100];
        let line = render(&Record::Dataset { data: &data });
        assert_eq!(line.len(), LINE_CAPACITY);
        assert!(line.ends_with("\r\n"));
    }

    #[test]
    fn largest_real_line_fits() {
        let data = [999; crate::MAX_N];
        let line = render(&Record::Sorted {
            algorithm: Algorithm::Insertion,
            tick: u32::MAX,
            data: &data,
            micros: u32::MAX,
        });
        assert!(line.ends_with("| Time: 4294967295 us\r\n"));
    }

    #[test]
    fn capture_splits_lines() {
        let mut capture = Capture::new();
        capture.write_all(b"one\r\n\r\ntwo\r\n").unwrap();
        assert_eq!(capture.lines(), ["one", "two"]);
    }
}

// End of File
