//! Canonical Huffman tables for the entropy decoder.

use crate::jpeg::bits::BitReader;
use crate::reader::ByteReader;
use crate::source::ByteSource;
use crate::types::{Error, Result};

/// Most codes a single DC or AC table may carry.
pub const MAX_CODES: usize = 256;

/// One DC or AC Huffman table, built from the DHT bit-length counts by
/// canonical construction: codes are assigned in increasing numeric
/// order within each bit length and doubled when advancing to the next
/// length.
#[derive(Debug)]
pub struct HuffmanTable {
    /// Number of codes of each bit length (1-16).
    bits: [u8; 16],
    /// Smallest code of each bit length.
    min_code: [u16; 16],
    /// Largest code of each bit length, -1 where the length is unused.
    max_code: [i32; 16],
    /// Index of the first value for each bit length.
    val_ptr: [u16; 16],
    /// Decoded symbols in code order.
    values: heapless::Vec<u8, MAX_CODES>,
}

impl HuffmanTable {
    /// Build a table from the DHT segment's count and value arrays.
    pub fn create(counts: &[u8], values: &[u8]) -> Result<Self> {
        if counts.len() != 16 {
            return Err(Error::Format);
        }

        let total: usize = counts.iter().map(|&c| c as usize).sum();
        if total == 0 || total > MAX_CODES || values.len() != total {
            return Err(Error::Format);
        }

        let mut table = Self {
            bits: [0; 16],
            min_code: [0; 16],
            max_code: [-1; 16],
            val_ptr: [0; 16],
            values: heapless::Vec::new(),
        };
        table.bits.copy_from_slice(counts);
        table
            .values
            .extend_from_slice(values)
            .map_err(|_| Error::Memory)?;

        let mut code = 0u32;
        let mut index = 0u16;
        for (len, &count) in counts.iter().enumerate() {
            if count > 0 {
                table.min_code[len] = code as u16;
                table.val_ptr[len] = index;
                code += count as u32;
                index += count as u16;
                table.max_code[len] = code as i32 - 1;
                if code > (1 << (len + 1)) {
                    // More codes than this bit length can hold.
                    return Err(Error::Format);
                }
            }
            code <<= 1;
        }

        Ok(table)
    }

    /// Decode one symbol from the bit stream.
    pub fn decode<S: ByteSource>(
        &self,
        bits: &mut BitReader,
        input: &mut ByteReader<S>,
    ) -> Result<u8> {
        let mut code = 0u32;
        for len in 0..16 {
            code = (code << 1) | bits.read_bit(input) as u32;
            let max = self.max_code[len];
            if max >= 0 && code as i32 <= max {
                let idx = self.val_ptr[len] as usize + (code as u16 - self.min_code[len]) as usize;
                return Ok(self.values[idx]);
            }
        }
        Err(Error::Decode)
    }

    #[cfg(test)]
    fn code_of(&self, value: u8) -> Option<(u16, usize)> {
        let idx = self.values.iter().position(|&v| v == value)? as u16;
        let mut first = 0u16;
        for len in 0..16 {
            let count = self.bits[len] as u16;
            if count > 0 && idx >= first && idx < first + count {
                return Some((self.min_code[len] + (idx - first), len + 1));
            }
            first += count;
        }
        None
    }
}
