//! Buffered byte-level reader over a [`ByteSource`].
//!
//! Both decoders parse their container structure through this reader;
//! refills request at most [`BUFFER_SIZE`] bytes at a time.

use alloc::vec;
use alloc::vec::Vec;

use crate::source::ByteSource;
use crate::types::{Error, Result};
use crate::BUFFER_SIZE;

pub struct ByteReader<S> {
    source: S,
    buf: [u8; BUFFER_SIZE],
    pos: usize,
    len: usize,
}

impl<S: ByteSource> ByteReader<S> {
    pub fn new(source: S) -> Self {
        Self { source, buf: [0; BUFFER_SIZE], pos: 0, len: 0 }
    }

    /// Next byte, or `None` at end of data.
    pub fn next(&mut self) -> Option<u8> {
        if self.pos == self.len {
            self.len = self.source.fill(&mut self.buf);
            self.pos = 0;
            if self.len == 0 {
                return None;
            }
        }
        let b = self.buf[self.pos];
        self.pos += 1;
        Some(b)
    }

    /// Next byte; end of data is an error.
    pub fn read_u8(&mut self) -> Result<u8> {
        self.next().ok_or(Error::Input)
    }

    pub fn read_u16_be(&mut self) -> Result<u16> {
        let hi = self.read_u8()?;
        let lo = self.read_u8()?;
        Ok(u16::from_be_bytes([hi, lo]))
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        let lo = self.read_u8()?;
        let hi = self.read_u8()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    pub fn read_exact(&mut self, out: &mut [u8]) -> Result<()> {
        for b in out {
            *b = self.read_u8()?;
        }
        Ok(())
    }

    /// Read a whole marker-segment body into a scratch buffer.
    pub fn read_segment(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut seg = vec![0u8; len];
        self.read_exact(&mut seg)?;
        Ok(seg)
    }

    pub fn skip(&mut self, mut n: usize) -> Result<()> {
        while n > 0 {
            self.read_u8()?;
            n -= 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SliceSource;

    #[test]
    fn reads_across_refills() {
        let data: Vec<u8> = (0..=255u8).cycle().take(BUFFER_SIZE + 7).collect();
        let mut r = ByteReader::new(SliceSource::new(&data));
        for &want in &data {
            assert_eq!(r.read_u8().unwrap(), want);
        }
        assert_eq!(r.read_u8(), Err(Error::Input));
    }

    #[test]
    fn u16_endianness() {
        let mut r = ByteReader::new(SliceSource::new(&[0x12, 0x34, 0x56, 0x78]));
        assert_eq!(r.read_u16_be().unwrap(), 0x1234);
        assert_eq!(r.read_u16_le().unwrap(), 0x7856);
    }
}
