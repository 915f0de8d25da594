//! Reassembles raw socket bytes into input lines.
//!
//! Telnet clients interleave IAC negotiation sequences with the text the
//! player types; those are stripped here so the interpreter only ever sees
//! printable text. Lines end at `\n`, a preceding `\r` is dropped.

use std::mem;

const IAC: u8 = 255;
const SB: u8 = 250;
const SE: u8 = 240;
const WILL: u8 = 251;
const DONT: u8 = 254;
const BACKSPACE: u8 = 0x08;
const DELETE: u8 = 0x7f;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Telnet {
    Data,
    Iac,
    Negotiation,
    Subnegotiation,
    SubnegotiationIac,
}

/// Incremental line framer with a hard cap on line length.
///
/// Bytes past `max_len` on a single line are discarded, so a client that
/// never sends a newline cannot grow the buffer without bound.
#[derive(Debug)]
pub struct LineBuffer {
    pending: Vec<u8>,
    max_len: usize,
    telnet: Telnet,
}

impl LineBuffer {
    pub fn new(max_len: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_len,
            telnet: Telnet::Data,
        }
    }

    /// Feeds a chunk of bytes and returns every line it completed.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();

        for &byte in bytes {
            match self.telnet {
                Telnet::Data => match byte {
                    IAC => self.telnet = Telnet::Iac,
                    b'\n' => lines.push(self.take_line()),
                    BACKSPACE | DELETE => {
                        self.pending.pop();
                    }
                    b'\t' => self.store(b' '),
                    b if b < 0x20 => {}
                    b => self.store(b),
                },
                Telnet::Iac => {
                    self.telnet = match byte {
                        WILL..=DONT => Telnet::Negotiation,
                        SB => Telnet::Subnegotiation,
                        // Two-byte commands, and IAC IAC which is never valid text
                        _ => Telnet::Data,
                    }
                }
                Telnet::Negotiation => self.telnet = Telnet::Data,
                Telnet::Subnegotiation => {
                    if byte == IAC {
                        self.telnet = Telnet::SubnegotiationIac;
                    }
                }
                Telnet::SubnegotiationIac => {
                    self.telnet = if byte == SE {
                        Telnet::Data
                    } else {
                        Telnet::Subnegotiation
                    };
                }
            }
        }

        lines
    }

    /// Number of bytes buffered for the current, unfinished line.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn store(&mut self, byte: u8) {
        if self.pending.len() < self.max_len {
            self.pending.push(byte);
        }
    }

    fn take_line(&mut self) -> String {
        let bytes = mem::take(&mut self.pending);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_split_across_pushes() {
        let mut buffer = LineBuffer::new(64);

        assert!(buffer.push(b"lo").is_empty());
        assert_eq!(buffer.pending_len(), 2);
        assert_eq!(buffer.push(b"ok\nsay h"), vec!["look".to_string()]);
        assert_eq!(buffer.push(b"i\r\n"), vec!["say hi".to_string()]);
        assert_eq!(buffer.pending_len(), 0);
    }

    #[test]
    fn test_multiple_lines_in_one_push() {
        let mut buffer = LineBuffer::new(64);
        let lines = buffer.push(b"n\r\ns\r\n\r\nlook\n");
        assert_eq!(lines, vec!["n", "s", "", "look"]);
    }

    #[test]
    fn test_strips_telnet_negotiation() {
        let mut buffer = LineBuffer::new(64);
        // IAC WILL NAWS, IAC SB NAWS 0 80 0 24 IAC SE, IAC NOP
        let mut bytes = vec![IAC, WILL, 31, b'l', b'o'];
        bytes.extend_from_slice(&[IAC, SB, 31, 0, 80, 0, 24, IAC, SE]);
        bytes.extend_from_slice(&[b'o', IAC, 241, b'k', b'\n']);

        assert_eq!(buffer.push(&bytes), vec!["look".to_string()]);
    }

    #[test]
    fn test_negotiation_split_across_pushes() {
        let mut buffer = LineBuffer::new(64);
        assert!(buffer.push(&[b'h', IAC]).is_empty());
        assert!(buffer.push(&[DONT]).is_empty());
        assert_eq!(buffer.push(&[1, b'i', b'\n']), vec!["hi".to_string()]);
    }

    #[test]
    fn test_backspace_and_control_characters() {
        let mut buffer = LineBuffer::new(64);
        let lines = buffer.push(b"lookk\x08\x07\tnow\n");
        assert_eq!(lines, vec!["look now".to_string()]);
    }

    #[test]
    fn test_overlong_line_is_truncated() {
        let mut buffer = LineBuffer::new(8);
        assert!(buffer.push(&[b'a'; 100]).is_empty());
        assert_eq!(buffer.pending_len(), 8);
        assert_eq!(buffer.push(b"\nok\n"), vec!["aaaaaaaa", "ok"]);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut buffer = LineBuffer::new(64);
        let lines = buffer.push(&[b's', b'a', b'y', b' ', 0xC3, b'\n']);
        assert_eq!(lines, vec!["say \u{FFFD}".to_string()]);
    }
}
