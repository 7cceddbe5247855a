//! Variable-width LZW decompression for GIF image data.
//!
//! Codes are packed LSB-first and widen from `min_code_size + 1` bits
//! up to 12 as the dictionary fills. The dictionary lives in flat
//! prefix/suffix arrays; expansions go through an explicit stack so a
//! line at a time can be pulled without recursion.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use super::DataBlocks;
use crate::source::ByteSource;
use crate::types::{Error, Result};

/// Largest allocatable code; 12-bit codes cap the dictionary.
const MAX_CODE: u16 = 4095;
const MAX_WIDTH: u8 = 12;
const NO_CODE: u16 = 0xFFFF;

#[derive(Debug)]
pub struct LzwDecoder {
    min_code_size: u8,
    clear_code: u16,
    end_code: u16,
    /// Codes consumed since the last clear, offset so that the slot of
    /// the pending dictionary entry is `running_code - 2`.
    running_code: u16,
    running_bits: u8,
    max_code: u16,
    last_code: u16,
    /// First character of the most recent expansion.
    first_char: u8,

    shift_reg: u32,
    shift_bits: u8,

    prefix: Box<[u16]>,
    suffix: Box<[u8]>,
    /// Pending expansion, drained most-recent-first.
    stack: Vec<u8>,
}

impl LzwDecoder {
    pub fn new(min_code_size: u8) -> Result<Self> {
        if !(2..=8).contains(&min_code_size) {
            return Err(Error::Format);
        }
        let clear_code = 1u16 << min_code_size;
        Ok(Self {
            min_code_size,
            clear_code,
            end_code: clear_code + 1,
            running_code: clear_code + 2,
            running_bits: min_code_size + 1,
            max_code: 1 << (min_code_size + 1),
            last_code: NO_CODE,
            first_char: 0,
            shift_reg: 0,
            shift_bits: 0,
            prefix: vec![NO_CODE; (MAX_CODE as usize) + 1].into_boxed_slice(),
            suffix: vec![0u8; (MAX_CODE as usize) + 1].into_boxed_slice(),
            stack: Vec::with_capacity((MAX_CODE as usize) + 1),
        })
    }

    fn reset_dictionary(&mut self) {
        self.running_code = self.clear_code + 2;
        self.running_bits = self.min_code_size + 1;
        self.max_code = 1 << self.running_bits;
        self.last_code = NO_CODE;
        self.prefix.fill(NO_CODE);
    }

    /// Pull the next code off the LSB-first bit stream.
    ///
    /// The code counter advances here so the width grows in step with
    /// the encoder, one code ahead of the dictionary slot it fills.
    fn read_code<S: ByteSource>(&mut self, blocks: &mut DataBlocks<'_, S>) -> Result<u16> {
        while self.shift_bits < self.running_bits {
            let b = blocks.next_byte()?;
            self.shift_reg |= (b as u32) << self.shift_bits;
            self.shift_bits += 8;
        }
        let code = (self.shift_reg & ((1u32 << self.running_bits) - 1)) as u16;
        self.shift_reg >>= self.running_bits;
        self.shift_bits -= self.running_bits;

        if self.running_code < MAX_CODE + 2 {
            self.running_code += 1;
            if self.running_code > self.max_code && self.running_bits < MAX_WIDTH {
                self.max_code <<= 1;
                self.running_bits += 1;
            }
        }
        Ok(code)
    }

    /// Expand one data code onto the stack and grow the dictionary.
    fn process(&mut self, code: u16) -> Result<()> {
        let slot = self.running_code - 2;
        let mut cur = code;
        if code >= self.clear_code {
            if code > MAX_CODE {
                return Err(Error::Decode);
            }
            if self.prefix[code as usize] == NO_CODE {
                // Only the entry this very expansion defines may be
                // referenced before it exists (KwKwK).
                if code == slot && self.last_code != NO_CODE {
                    self.stack.push(self.first_char);
                    cur = self.last_code;
                } else {
                    return Err(Error::Decode);
                }
            }
        }

        let mut depth = 0;
        while cur >= self.clear_code {
            if cur > MAX_CODE || depth > MAX_CODE {
                return Err(Error::Decode);
            }
            self.stack.push(self.suffix[cur as usize]);
            cur = self.prefix[cur as usize];
            depth += 1;
        }
        self.stack.push(cur as u8);
        self.first_char = cur as u8;

        // Once every slot up to the 12-bit cap is defined, later codes
        // reuse the table as is.
        if self.last_code != NO_CODE && slot <= MAX_CODE && self.prefix[slot as usize] == NO_CODE {
            self.prefix[slot as usize] = self.last_code;
            self.suffix[slot as usize] = self.first_char;
        }
        self.last_code = code;
        Ok(())
    }

    /// Fill `line` with decoded pixel indices.
    ///
    /// Hitting the end code before the line is full means the stream
    /// carries fewer pixels than the image descriptor promised.
    pub fn decode_line<S: ByteSource>(
        &mut self,
        blocks: &mut DataBlocks<'_, S>,
        line: &mut [u8],
    ) -> Result<()> {
        let mut i = 0;
        while i < line.len() {
            if let Some(b) = self.stack.pop() {
                line[i] = b;
                i += 1;
                continue;
            }

            let code = self.read_code(blocks)?;
            if code == self.end_code {
                return Err(Error::Format);
            }
            if code == self.clear_code {
                self.reset_dictionary();
                continue;
            }
            self.process(code)?;
        }
        Ok(())
    }

    /// Consume the end code after the last line.
    ///
    /// Leftover expansion data or any further data code means the
    /// stream encoded more pixels than the image holds.
    pub fn finish<S: ByteSource>(&mut self, blocks: &mut DataBlocks<'_, S>) -> Result<()> {
        if !self.stack.is_empty() {
            return Err(Error::Format);
        }
        loop {
            let code = self.read_code(blocks)?;
            if code == self.end_code {
                return Ok(());
            }
            if code == self.clear_code {
                self.reset_dictionary();
                continue;
            }
            return Err(Error::Format);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gif::DataBlocks;
    use crate::reader::ByteReader;
    use crate::source::SliceSource;

    fn decode(min_code_size: u8, data: &[u8], pixels: usize) -> Result<Vec<u8>> {
        let mut input = ByteReader::new(SliceSource::new(data));
        let mut blocks = DataBlocks::new(&mut input);
        let mut lzw = LzwDecoder::new(min_code_size)?;
        let mut out = vec![0u8; pixels];
        lzw.decode_line(&mut blocks, &mut out)?;
        lzw.finish(&mut blocks)?;
        blocks.finish()?;
        Ok(out)
    }

    /// Pack codes LSB-first, tracking the width the way the decoder
    /// grows it so both sides stay in step.
    fn pack(min_code_size: u8, codes: &[u16]) -> Vec<u8> {
        let clear = 1u16 << min_code_size;
        let mut width = min_code_size + 1;
        let mut max = 1u16 << width;
        let mut counter = clear + 2;
        let mut acc = 0u32;
        let mut nbits = 0u8;
        let mut out = Vec::new();
        for &code in codes {
            acc |= (code as u32) << nbits;
            nbits += width;
            while nbits >= 8 {
                out.push(acc as u8);
                acc >>= 8;
                nbits -= 8;
            }
            if counter < MAX_CODE + 2 {
                counter += 1;
                if counter > max && width < MAX_WIDTH {
                    max <<= 1;
                    width += 1;
                }
            }
            if code == clear {
                counter = clear + 2;
                width = min_code_size + 1;
                max = 1 << width;
            }
        }
        if nbits > 0 {
            out.push(acc as u8);
        }
        out
    }

    fn sub_blocks(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        for chunk in data.chunks(255) {
            out.push(chunk.len() as u8);
            out.extend_from_slice(chunk);
        }
        out.push(0x00);
        out
    }

    #[test]
    fn decodes_run_with_kwkwk_case() {
        // min code size 2: clear=4, end=5. Codes 4,1,6,6 then the end
        // code read at 4 bits, encoding five 1-pixels. The first 6 is
        // the not-yet-defined code (KwKwK).
        let data = [0x02, 0x8C, 0x5D, 0x00];
        assert_eq!(decode(2, &data, 5).unwrap(), vec![1; 5]);
    }

    #[test]
    fn last_entry_expands_after_dictionary_fills() {
        // 8-bit codes: clear=256, end=257. 3839 literals define entries
        // 258..=4095; entry 4095 holds the pair (253, 254) and must
        // decode as exactly that once the table is full, not as a
        // spurious not-yet-defined code.
        let mut codes = vec![256u16];
        codes.extend((0..3839).map(|i| (i % 256) as u16));
        codes.push(4095);
        codes.push(257);
        let data = sub_blocks(&pack(8, &codes));
        let out = decode(8, &data, 3841).unwrap();
        assert_eq!(&out[..4], &[0, 1, 2, 3]);
        assert_eq!(&out[3839..], &[253, 254]);
    }

    #[test]
    fn rejects_code_beyond_dictionary() {
        // Codes 4 (clear) then 7, which no entry defines yet.
        // Bits LSB-first: 001 111 -> 0b00_111_100 = 0x3C.
        let data = [0x01, 0x3C, 0x00];
        assert_eq!(decode(2, &data, 4).unwrap_err(), Error::Decode);
    }

    #[test]
    fn rejects_invalid_min_code_size() {
        assert_eq!(LzwDecoder::new(1).unwrap_err(), Error::Format);
        assert_eq!(LzwDecoder::new(9).unwrap_err(), Error::Format);
    }

    #[test]
    fn early_end_code_is_a_format_error() {
        // Codes 4 (clear), 5 (end) while four pixels are still owed.
        // Bits: 001 101 -> 0b00_101_100 = 0x2C.
        let data = [0x01, 0x2C, 0x00];
        assert_eq!(decode(2, &data, 4).unwrap_err(), Error::Format);
    }
}
