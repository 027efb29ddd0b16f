//! Line input from the operator
//!
//! Bytes arrive from a [`ByteSource`] (the receive side of the serial port)
//! and are collected in a [`LineBuffer`] until a line ending shows up. The
//! buffer lives in an [`InputPort`], guarded by a critical section, because
//! the receive side and the coordinator task both touch it.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, TryRecvError};

/// The most bytes a line can hold; the rest of a longer line is dropped
pub const LINE_BUFFER_LEN: usize = 100;

/// A received byte, or news that no more are coming
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RxEvent {
    Byte(u8),
    /// Nothing waiting right now
    Empty,
    /// Nothing will ever arrive again
    Closed,
}

/// Somewhere bytes come in from
pub trait ByteSource: Send {
    /// Fetch the next received byte, without waiting
    fn poll_byte(&mut self) -> RxEvent;
}

/// Plays back a fixed script, then reports [`RxEvent::Closed`]
#[derive(Clone, Debug, Default)]
pub struct ScriptedInput {
    bytes: VecDeque<u8>,
}

impl ScriptedInput {
    pub fn new(script: impl AsRef<[u8]>) -> ScriptedInput {
        ScriptedInput {
            bytes: script.as_ref().iter().copied().collect(),
        }
    }
}

impl ByteSource for ScriptedInput {
    fn poll_byte(&mut self) -> RxEvent {
        match self.bytes.pop_front() {
            Some(byte) => RxEvent::Byte(byte),
            None => RxEvent::Closed,
        }
    }
}

/// Bytes forwarded from another thread, such as a stdin reader
pub struct ChannelInput {
    rx: Receiver<u8>,
}

impl ChannelInput {
    pub fn new(rx: Receiver<u8>) -> ChannelInput {
        ChannelInput { rx }
    }
}

impl ByteSource for ChannelInput {
    fn poll_byte(&mut self) -> RxEvent {
        match self.rx.try_recv() {
            Ok(byte) => RxEvent::Byte(byte),
            Err(TryRecvError::Empty) => RxEvent::Empty,
            Err(TryRecvError::Disconnected) => RxEvent::Closed,
        }
    }
}

/// Collects one line of input
#[derive(Clone, Debug, Default)]
pub struct LineBuffer {
    buffer: heapless::Vec<u8, LINE_BUFFER_LEN>,
    ready: bool,
    /// The last byte seen was a CR, so an LF now is part of the same ending
    after_cr: bool,
}

impl LineBuffer {
    pub const fn new() -> LineBuffer {
        LineBuffer {
            buffer: heapless::Vec::new(),
            ready: false,
            after_cr: false,
        }
    }

    /// Take in one received byte
    ///
    /// A CR, LF or CR LF completes the line. Once a line is complete,
    /// further bytes are ignored until it has been taken.
    pub fn receive(&mut self, byte: u8) {
        if self.ready {
            return;
        }
        let after_cr = core::mem::replace(&mut self.after_cr, byte == b'\r');
        match byte {
            b'\n' if after_cr => {}
            b'\r' | b'\n' => self.ready = true,
            _ => {
                // Overflow is dropped on the floor
                let _ = self.buffer.push(byte);
            }
        }
    }

    /// Has a full line arrived?
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Throw away anything received so far
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.ready = false;
    }

    /// Hand over the completed line, if there is one, and start afresh
    pub fn take_line(&mut self) -> Option<Line> {
        if !self.ready {
            return None;
        }
        let line = Line {
            bytes: self.buffer.clone(),
        };
        self.clear();
        Some(line)
    }
}

/// One completed line of input, without its line ending
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    bytes: heapless::Vec<u8, LINE_BUFFER_LEN>,
}

impl Line {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The line as text, with anything that isn't UTF-8 replaced
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Read the leading decimal digits as a number
    ///
    /// Leading blanks and one `+` are skipped. Anything after the digits is
    /// ignored, no digits gives zero, and too many digits gives `u32::MAX`.
    pub fn parse_number(&self) -> u32 {
        let mut bytes = self.bytes.as_slice().trim_ascii_start();
        if let [b'+', rest @ ..] = bytes {
            bytes = rest;
        }
        bytes
            .iter()
            .take_while(|byte| byte.is_ascii_digit())
            .fold(0u32, |acc, digit| {
                acc.saturating_mul(10)
                    .saturating_add(u32::from(digit - b'0'))
            })
    }
}

/// A [`LineBuffer`] shared between the receive side and the coordinator
pub struct InputPort {
    line: critical_section::Mutex<RefCell<LineBuffer>>,
    source: critical_section::Mutex<RefCell<Box<dyn ByteSource>>>,
}

impl InputPort {
    pub fn new<S>(source: S) -> InputPort
    where
        S: ByteSource + 'static,
    {
        InputPort {
            line: critical_section::Mutex::new(RefCell::new(LineBuffer::new())),
            source: critical_section::Mutex::new(RefCell::new(Box::new(source))),
        }
    }

    /// Move waiting bytes from the source into the line buffer, stopping at
    /// the end of a line. Returns `false` once the source has closed.
    ///
    /// This is the job the receive interrupt does on real hardware.
    pub fn service(&self) -> bool {
        critical_section::with(|cs| {
            let mut source = self.source.borrow(cs).borrow_mut();
            let mut line = self.line.borrow(cs).borrow_mut();
            while !line.is_ready() {
                match source.poll_byte() {
                    RxEvent::Byte(byte) => line.receive(byte),
                    RxEvent::Empty => return true,
                    RxEvent::Closed => return false,
                }
            }
            true
        })
    }

    /// Discard any partial line
    pub fn clear(&self) {
        critical_section::with(|cs| self.line.borrow(cs).borrow_mut().clear());
    }

    /// Take the completed line, if there is one
    pub fn take_line(&self) -> Option<Line> {
        critical_section::with(|cs| self.line.borrow(cs).borrow_mut().take_line())
    }

    /// Has a full line arrived?
    pub fn is_ready(&self) -> bool {
        critical_section::with(|cs| self.line.borrow(cs).borrow().is_ready())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> Line {
        let mut buffer = LineBuffer::new();
        for byte in text.bytes() {
            buffer.receive(byte);
        }
        buffer.receive(b'\r');
        buffer.take_line().unwrap()
    }

    #[test]
    fn parses_leading_digits() {
        assert_eq!(line("42").parse_number(), 42);
        assert_eq!(line("7abc").parse_number(), 7);
        assert_eq!(line("abc").parse_number(), 0);
        assert_eq!(line("").parse_number(), 0);
        assert_eq!(line("99999999999999").parse_number(), u32::MAX);
    }

    #[test]
    fn skips_blanks_and_plus_sign() {
        assert_eq!(line(" 5").parse_number(), 5);
        assert_eq!(line("+5").parse_number(), 5);
        assert_eq!(line("\t +12x").parse_number(), 12);
        assert_eq!(line("5 0").parse_number(), 5);
        assert_eq!(line("++5").parse_number(), 0);
        assert_eq!(line("- 5").parse_number(), 0);
        assert_eq!(line("-5").parse_number(), 0);
    }

    #[test]
    fn line_needs_terminator() {
        let mut buffer = LineBuffer::new();
        buffer.receive(b'1');
        buffer.receive(b'2');
        assert!(!buffer.is_ready());
        assert!(buffer.take_line().is_none());
        buffer.receive(b'\n');
        assert_eq!(buffer.take_line().unwrap().as_bytes(), b"12");
        assert!(!buffer.is_ready());
    }

    #[test]
    fn crlf_is_one_line_ending() {
        let port = InputPort::new(ScriptedInput::new("5\r\n\n7\n"));
        assert!(port.service());
        assert_eq!(port.take_line().unwrap().as_bytes(), b"5");
        assert!(port.service());
        assert_eq!(port.take_line().unwrap().as_bytes(), b"");
        assert!(port.service());
        assert_eq!(port.take_line().unwrap().as_bytes(), b"7");
    }

    #[test]
    fn overlong_lines_are_cut() {
        let text = "1".repeat(LINE_BUFFER_LEN + 20);
        assert_eq!(line(&text).as_bytes().len(), LINE_BUFFER_LEN);
    }

    #[test]
    fn port_stops_at_each_line() {
        let port = InputPort::new(ScriptedInput::new("5\r0\r"));
        assert!(port.service());
        assert_eq!(port.take_line().unwrap().parse_number(), 5);
        assert!(port.service());
        assert_eq!(port.take_line().unwrap().parse_number(), 0);
        assert!(!port.service());
        assert!(port.take_line().is_none());
    }

    #[test]
    fn clear_drops_partial_line() {
        let port = InputPort::new(ScriptedInput::new("12"));
        assert!(!port.service());
        port.clear();
        assert!(!port.is_ready());
        assert!(port.take_line().is_none());
    }

    #[test]
    fn clear_keeps_lines_not_yet_received() {
        // Only the partial line goes; whole lines typed ahead wait their turn
        let port = InputPort::new(ScriptedInput::new("9\r8\r"));
        port.clear();
        assert!(port.service());
        port.clear();
        assert!(port.take_line().is_none());
        assert!(port.service());
        assert_eq!(port.take_line().unwrap().as_bytes(), b"8");
    }

    #[test]
    fn channel_source_reports_empty_then_closed() {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut source = ChannelInput::new(rx);
        assert_eq!(source.poll_byte(), RxEvent::Empty);
        tx.send(b'9').unwrap();
        assert_eq!(source.poll_byte(), RxEvent::Byte(b'9'));
        drop(tx);
        assert_eq!(source.poll_byte(), RxEvent::Closed);
    }
}

// End of File
