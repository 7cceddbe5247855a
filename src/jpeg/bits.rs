//! Bit-level reader for the entropy-coded scan.
//!
//! Sits on top of the byte reader and handles the scan-layer framing:
//! `FF 00` marker stuffing collapses to a literal `FF`, any other `FF`
//! pair latches a marker and is never consumed as data, and end of
//! source latches a synthetic EOI so a truncated stream terminates
//! instead of stalling. Once a marker is latched the reader feeds
//! 1-bits, matching the entropy coder's padding.

use crate::reader::ByteReader;
use crate::source::ByteSource;
use crate::types::{Error, Result};

/// End Of Image, also the synthetic end-of-source sentinel.
pub const EOI: u8 = 0xD9;
/// First restart marker; RSTn = RST0 + n for n in 0..8.
pub const RST0: u8 = 0xD0;

pub struct BitReader {
    wreg: u32,
    wbit: usize,
    marker: Option<u8>,
}

impl BitReader {
    pub fn new() -> Self {
        Self { wreg: 0, wbit: 0, marker: None }
    }

    /// Marker latched during refill, if any. Not consumed.
    pub fn marker(&self) -> Option<u8> {
        self.marker
    }

    /// Clear all bit-level state; used on restart resynchronization.
    pub fn reset(&mut self) {
        self.wreg = 0;
        self.wbit = 0;
        self.marker = None;
    }

    fn refill<S: ByteSource>(&mut self, input: &mut ByteReader<S>) {
        // Drop stale high bits before shifting new data in.
        if self.wbit > 0 && self.wbit < 32 {
            self.wreg &= (1 << self.wbit) - 1;
        }

        let byte = if self.marker.is_some() {
            0xFF
        } else {
            match input.next() {
                None => {
                    self.marker = Some(EOI);
                    0xFF
                }
                Some(0xFF) => match input.next() {
                    None => {
                        self.marker = Some(EOI);
                        0xFF
                    }
                    Some(0x00) => 0xFF, // stuffed literal
                    Some(m) => {
                        self.marker = Some(m);
                        0xFF
                    }
                },
                Some(b) => b,
            }
        };

        self.wreg = (self.wreg << 8) | byte as u32;
        self.wbit += 8;
    }

    fn ensure<S: ByteSource>(&mut self, input: &mut ByteReader<S>, count: usize) {
        while self.wbit < count {
            self.refill(input);
        }
    }

    pub fn read_bit<S: ByteSource>(&mut self, input: &mut ByteReader<S>) -> u8 {
        self.ensure(input, 1);
        self.wbit -= 1;
        ((self.wreg >> self.wbit) & 1) as u8
    }

    /// Peek the next `count` bits (1-16) without consuming them.
    pub fn peek<S: ByteSource>(&mut self, input: &mut ByteReader<S>, count: usize) -> u16 {
        self.ensure(input, count);
        let shift = self.wbit - count;
        ((self.wreg >> shift) & ((1 << count) - 1)) as u16
    }

    pub fn skip(&mut self, count: usize) {
        debug_assert!(count <= self.wbit);
        self.wbit -= count;
    }

    /// Read `count` bits (1-16), MSB first.
    pub fn read_bits<S: ByteSource>(&mut self, input: &mut ByteReader<S>, count: usize) -> u16 {
        let v = self.peek(input, count);
        self.skip(count);
        v
    }

    /// Resynchronize on a restart marker.
    ///
    /// Discards bits to the byte boundary, consumes the marker (latched
    /// here during refill, or read directly from the source), and
    /// validates it against the expected cycling RSTn value. Bit state
    /// is reset on success; the caller resets the DC predictors.
    pub fn sync_restart<S: ByteSource>(
        &mut self,
        input: &mut ByteReader<S>,
        expected: u8,
    ) -> Result<()> {
        let marker = match self.marker.take() {
            Some(m) => m,
            None => {
                // Bit-aligned padding before the marker is 1-bits; any
                // buffered whole bytes must be FF fill.
                let mut b = input.read_u8()?;
                if b != 0xFF {
                    return Err(Error::BadRestart);
                }
                while b == 0xFF {
                    b = input.read_u8()?;
                }
                b
            }
        };

        if marker != RST0 + (expected & 7) {
            return Err(Error::BadRestart);
        }
        self.reset();
        Ok(())
    }
}

impl Default for BitReader {
    fn default() -> Self {
        Self::new()
    }
}
