//! Baseline JPEG decoder.
//!
//! Pull-driven: [`JpegDecoder::decode`] parses the headers up to and
//! including the scan header, then each [`JpegDecoder::next_mcu`] call
//! entropy-decodes one MCU, runs the inverse transform and color
//! reconstruction, and pushes the clipped pixel block into the sink.
//! Working memory is one MCU of coefficients plus one MCU of RGB
//! planes, sized from the frame's actual sampling layout.

mod bits;
mod color;
mod huffman;
mod idct;
mod tables;

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use log::debug;

use crate::reader::ByteReader;
use crate::sink::{rgb888_to_rgb565, PixelSink};
use crate::source::ByteSource;
use crate::types::{Error, Result};
use crate::MAX_DIMENSION;

use bits::{BitReader, EOI, RST0};
use huffman::HuffmanTable;
use idct::block_idct;
use tables::{ARAI_SCALE_FACTOR, ZIGZAG};

/// How many leading garbage bytes to tolerate before SOI.
const SOI_SCAN_WINDOW: usize = 4096;

/// JPEG marker codes.
mod markers {
    pub const SOI: u8 = 0xD8; // Start of Image
    pub const SOF0: u8 = 0xC0; // Start of Frame (baseline)
    pub const DHT: u8 = 0xC4; // Define Huffman Table
    pub const DAC: u8 = 0xCC; // Define Arithmetic Conditioning
    pub const DQT: u8 = 0xDB; // Define Quantization Table
    pub const DRI: u8 = 0xDD; // Define Restart Interval
    pub const SOS: u8 = 0xDA; // Start of Scan
    pub const TEM: u8 = 0x01;
}

/// Chroma layout of the scan, fixed by the frame's sampling factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanType {
    /// Single component, 8x8 MCU.
    Gray,
    /// 4:4:4, 8x8 MCU.
    Ycbcr444,
    /// 4:2:2 horizontal (2x1), 16x8 MCU.
    Ycbcr422H,
    /// 4:2:2 vertical (1x2), 8x16 MCU.
    Ycbcr422V,
    /// 4:2:0 (2x2), 16x16 MCU.
    Ycbcr420,
}

impl ScanType {
    fn from_factors(h: u8, v: u8) -> Option<Self> {
        match (h, v) {
            (1, 1) => Some(Self::Ycbcr444),
            (2, 1) => Some(Self::Ycbcr422H),
            (1, 2) => Some(Self::Ycbcr422V),
            (2, 2) => Some(Self::Ycbcr420),
            _ => None,
        }
    }

    /// MCU width in pixels.
    pub fn mcu_width(self) -> u16 {
        match self {
            Self::Gray | Self::Ycbcr444 | Self::Ycbcr422V => 8,
            Self::Ycbcr422H | Self::Ycbcr420 => 16,
        }
    }

    /// MCU height in pixels.
    pub fn mcu_height(self) -> u16 {
        match self {
            Self::Gray | Self::Ycbcr444 | Self::Ycbcr422H => 8,
            Self::Ycbcr422V | Self::Ycbcr420 => 16,
        }
    }

    /// Number of luma blocks per MCU.
    pub fn luma_blocks(self) -> usize {
        (self.mcu_width() as usize / 8) * (self.mcu_height() as usize / 8)
    }

    /// Total blocks per MCU (luma + chroma).
    pub fn blocks_per_mcu(self) -> usize {
        match self {
            Self::Gray => 1,
            _ => self.luma_blocks() + 2,
        }
    }

    /// Right-shifts mapping a luma pixel position to its chroma sample.
    pub fn chroma_shift(self) -> (u8, u8) {
        match self {
            Self::Gray | Self::Ycbcr444 => (0, 0),
            Self::Ycbcr422H => (1, 0),
            Self::Ycbcr422V => (0, 1),
            Self::Ycbcr420 => (1, 1),
        }
    }
}

/// Frame parameters established by [`JpegDecoder::decode`].
#[derive(Debug, Clone, Copy)]
pub struct FrameInfo {
    pub width: u16,
    pub height: u16,
    pub components: u8,
    pub scan_type: ScanType,
    pub restart_interval: u16,
}

enum State {
    Idle,
    Decoding,
    Done,
    Failed(Error),
}

/// Baseline JPEG decoder over a [`ByteSource`].
pub struct JpegDecoder<S> {
    input: ByteReader<S>,
    bits: BitReader,
    state: State,
    reduce: bool,

    // Frame parameters.
    width: u16,
    height: u16,
    num_components: u8,
    scan: ScanType,
    restart_interval: u16,

    // Tables.
    huff_dc: [Option<HuffmanTable>; 2],
    huff_ac: [Option<HuffmanTable>; 2],
    qtables: [Option<Box<[i32; 64]>>; 4],
    qtable_ids: [u8; 3],
    // Per-component (DC, AC) table bindings from the scan header.
    scan_tables: [(u8, u8); 3],

    // Entropy decode state.
    dc_values: [i16; 3],
    restart_count: u16,
    next_restart: u8,

    // MCU geometry.
    mcus_wide: u16,
    mcu_index: u32,
    mcu_total: u32,

    // Arena buffers, sized at scan init, released by abort().
    mcu_buf: Vec<i16>,
    r_plane: Vec<u8>,
    g_plane: Vec<u8>,
    b_plane: Vec<u8>,
}

impl<S: ByteSource> JpegDecoder<S> {
    pub fn new(source: S) -> Self {
        Self {
            input: ByteReader::new(source),
            bits: BitReader::new(),
            state: State::Idle,
            reduce: false,
            width: 0,
            height: 0,
            num_components: 0,
            scan: ScanType::Ycbcr444,
            restart_interval: 0,
            huff_dc: [None, None],
            huff_ac: [None, None],
            qtables: [None, None, None, None],
            qtable_ids: [0; 3],
            scan_tables: [(0, 0); 3],
            dc_values: [0; 3],
            restart_count: 0,
            next_restart: 0,
            mcus_wide: 0,
            mcu_index: 0,
            mcu_total: 0,
            mcu_buf: Vec::new(),
            r_plane: Vec::new(),
            g_plane: Vec::new(),
            b_plane: Vec::new(),
        }
    }

    /// Enable DC-only reconstruction (fast low-fidelity preview).
    ///
    /// AC coefficients are still entropy-decoded to keep the bit
    /// position correct, but are discarded; each 8x8 block comes out
    /// flat. Must be set before [`decode`](Self::decode).
    pub fn set_reduce(&mut self, reduce: bool) {
        self.reduce = reduce;
    }

    /// Parse headers through the scan header and fix decode parameters.
    pub fn decode(&mut self) -> Result<FrameInfo> {
        if !matches!(self.state, State::Idle) {
            return Err(Error::Parameter);
        }
        match self.parse_headers() {
            Ok(info) => {
                self.state = State::Decoding;
                Ok(info)
            }
            Err(e) => {
                self.state = State::Failed(e);
                Err(e)
            }
        }
    }

    /// Decode one MCU and push its pixels into `sink`.
    ///
    /// Returns `Ok(false)` once all MCUs have been emitted (or after
    /// [`abort`](Self::abort)); any error is terminal and is returned
    /// again on subsequent calls.
    pub fn next_mcu<P: PixelSink>(&mut self, sink: &mut P) -> Result<bool> {
        match self.state {
            State::Decoding => {}
            State::Done => return Ok(false),
            State::Failed(e) => return Err(e),
            State::Idle => return Err(Error::Parameter),
        }

        match self.decode_one(sink) {
            Ok(()) => {
                if self.mcu_index >= self.mcu_total || self.bits.marker() == Some(EOI) {
                    self.state = State::Done;
                }
                Ok(true)
            }
            Err(e) => {
                self.state = State::Failed(e);
                Err(e)
            }
        }
    }

    /// Stop decoding and release the MCU pixel buffers.
    ///
    /// Safe to call from any state, including after an error; later
    /// [`next_mcu`](Self::next_mcu) calls return `Ok(false)`.
    pub fn abort(&mut self) {
        self.state = State::Done;
        self.mcu_buf = Vec::new();
        self.r_plane = Vec::new();
        self.g_plane = Vec::new();
        self.b_plane = Vec::new();
    }

    // ----- header parsing -----

    fn parse_headers(&mut self) -> Result<FrameInfo> {
        self.locate_soi()?;

        let mut sof_seen = false;
        loop {
            let marker = self.next_marker()?;
            match marker {
                markers::SOI | markers::TEM => {} // standalone, no length
                m if (RST0..=EOI).contains(&m) => {
                    // RSTn/EOI have no business before the scan.
                    return Err(Error::Format);
                }
                _ => {
                    let length = self.input.read_u16_be()? as usize;
                    if length < 2 {
                        return Err(Error::Format);
                    }
                    let seg = self.input.read_segment(length - 2)?;
                    match marker {
                        markers::DQT => self.parse_dqt(&seg)?,
                        markers::DHT => self.parse_dht(&seg)?,
                        markers::DRI => self.parse_dri(&seg)?,
                        markers::SOF0 => {
                            self.parse_sof(&seg)?;
                            sof_seen = true;
                        }
                        markers::DAC => return Err(Error::Unsupported),
                        m if (0xC0..=0xCF).contains(&m) && m != markers::DHT => {
                            // Progressive, extended sequential, lossless...
                            return Err(Error::Unsupported);
                        }
                        markers::SOS => {
                            if !sof_seen {
                                return Err(Error::Format);
                            }
                            self.parse_sos(&seg)?;
                            self.init_scan()?;
                            return Ok(FrameInfo {
                                width: self.width,
                                height: self.height,
                                components: self.num_components,
                                scan_type: self.scan,
                                restart_interval: self.restart_interval,
                            });
                        }
                        m => {
                            // APPn, COM and friends: length-prefixed, skipped.
                            debug!("skipping marker 0xFF{:02X} ({} bytes)", m, seg.len());
                        }
                    }
                }
            }
        }
    }

    /// Scan forward for SOI, tolerating a bounded amount of leading
    /// garbage.
    fn locate_soi(&mut self) -> Result<()> {
        let mut prev = 0u8;
        for i in 0..SOI_SCAN_WINDOW {
            match self.input.next() {
                Some(b) => {
                    if prev == 0xFF && b == markers::SOI && i > 0 {
                        return Ok(());
                    }
                    prev = b;
                }
                None => break,
            }
        }
        Err(Error::NotThisFormat)
    }

    /// Read the next marker code, tolerating FF fill bytes.
    fn next_marker(&mut self) -> Result<u8> {
        let mut b = self.input.read_u8()?;
        if b != 0xFF {
            return Err(Error::Format);
        }
        while b == 0xFF {
            b = self.input.read_u8()?;
        }
        if b == 0x00 {
            return Err(Error::Format);
        }
        Ok(b)
    }

    fn parse_dqt(&mut self, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            let table_info = data[0];
            let precision = table_info >> 4;
            let id = (table_info & 0x0F) as usize;
            if id > 3 {
                return Err(Error::Format);
            }

            let mut table = Box::new([0i32; 64]);
            match precision {
                0 => {
                    if data.len() < 65 {
                        return Err(Error::Format);
                    }
                    for i in 0..64 {
                        let zi = ZIGZAG[i] as usize;
                        table[zi] = data[1 + i] as i32 * ARAI_SCALE_FACTOR[zi] as i32;
                    }
                    data = &data[65..];
                }
                1 => {
                    if data.len() < 129 {
                        return Err(Error::Format);
                    }
                    for i in 0..64 {
                        let zi = ZIGZAG[i] as usize;
                        let q = u16::from_be_bytes([data[1 + i * 2], data[2 + i * 2]]);
                        table[zi] = q as i32 * ARAI_SCALE_FACTOR[zi] as i32;
                    }
                    data = &data[129..];
                }
                _ => return Err(Error::Format),
            }

            debug!("DQT: table {} loaded", id);
            self.qtables[id] = Some(table);
        }
        Ok(())
    }

    fn parse_dht(&mut self, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            if data.len() < 17 {
                return Err(Error::Format);
            }
            let table_info = data[0];
            let class = (table_info >> 4) & 0x0F;
            let id = (table_info & 0x0F) as usize;
            if class > 1 || id > 1 {
                return Err(Error::Format);
            }

            let counts = &data[1..17];
            let total: usize = counts.iter().map(|&c| c as usize).sum();
            if data.len() < 17 + total {
                return Err(Error::Format);
            }
            let table = HuffmanTable::create(counts, &data[17..17 + total])?;

            debug!("DHT: {} table {} ({} codes)", if class == 0 { "DC" } else { "AC" }, id, total);
            if class == 0 {
                self.huff_dc[id] = Some(table);
            } else {
                self.huff_ac[id] = Some(table);
            }
            data = &data[17 + total..];
        }
        Ok(())
    }

    fn parse_dri(&mut self, data: &[u8]) -> Result<()> {
        if data.len() < 2 {
            return Err(Error::Format);
        }
        self.restart_interval = u16::from_be_bytes([data[0], data[1]]);
        debug!("DRI: restart interval {}", self.restart_interval);
        Ok(())
    }

    fn parse_sof(&mut self, data: &[u8]) -> Result<()> {
        if data.len() < 6 {
            return Err(Error::Format);
        }
        if data[0] != 8 {
            // Only 8-bit precision in baseline.
            return Err(Error::Unsupported);
        }
        self.height = u16::from_be_bytes([data[1], data[2]]);
        self.width = u16::from_be_bytes([data[3], data[4]]);
        if self.width == 0 || self.height == 0 {
            return Err(Error::Format);
        }
        if self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
            return Err(Error::Memory);
        }

        self.num_components = data[5];
        if self.num_components != 1 && self.num_components != 3 {
            return Err(Error::Unsupported);
        }
        if data.len() < 6 + self.num_components as usize * 3 {
            return Err(Error::Format);
        }

        for i in 0..self.num_components as usize {
            let comp = &data[6 + i * 3..9 + i * 3];
            let sampling = comp[1];
            let qtable_id = comp[2];
            if i == 0 {
                // The luma factors fix the MCU geometry.
                if self.num_components == 1 {
                    self.scan = ScanType::Gray;
                } else {
                    self.scan = ScanType::from_factors(sampling >> 4, sampling & 0x0F)
                        .ok_or(Error::Unsupported)?;
                }
            } else if sampling != 0x11 {
                // Chroma must be 1x1.
                return Err(Error::Unsupported);
            }
            if qtable_id > 3 {
                return Err(Error::Format);
            }
            self.qtable_ids[i] = qtable_id;
        }

        debug!(
            "SOF0: {}x{}, {} component(s), {:?}",
            self.width, self.height, self.num_components, self.scan
        );
        Ok(())
    }

    fn parse_sos(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() || data[0] != self.num_components {
            return Err(Error::Format);
        }
        let n = self.num_components as usize;
        if data.len() < 1 + n * 2 + 3 {
            return Err(Error::Format);
        }

        for i in 0..n {
            let entry = &data[1 + i * 2..3 + i * 2];
            let dc_id = entry[1] >> 4;
            let ac_id = entry[1] & 0x0F;
            if dc_id > 1 || ac_id > 1 {
                return Err(Error::Format);
            }
            // Every referenced table must have been defined before the
            // scan starts; checked here, before any entropy bit is read.
            if self.huff_dc[dc_id as usize].is_none() || self.huff_ac[ac_id as usize].is_none() {
                return Err(Error::UndefinedTable);
            }
            if self.qtables[self.qtable_ids[i] as usize].is_none() {
                return Err(Error::UndefinedTable);
            }
            self.scan_tables[i] = (dc_id, ac_id);
        }
        Ok(())
    }

    fn init_scan(&mut self) -> Result<()> {
        let mcu_w = self.scan.mcu_width() as u32;
        let mcu_h = self.scan.mcu_height() as u32;
        self.mcus_wide = ((self.width as u32 + mcu_w - 1) / mcu_w) as u16;
        let mcus_high = ((self.height as u32 + mcu_h - 1) / mcu_h) as u16;
        self.mcu_total = self.mcus_wide as u32 * mcus_high as u32;
        self.mcu_index = 0;

        self.dc_values = [0; 3];
        self.restart_count = 0;
        self.next_restart = 0;
        self.bits.reset();

        // Arena buffers sized from the actual MCU geometry.
        let pixels = (mcu_w * mcu_h) as usize;
        self.mcu_buf = vec![0i16; self.scan.blocks_per_mcu() * 64];
        self.r_plane = vec![0u8; pixels];
        self.g_plane = vec![0u8; pixels];
        self.b_plane = vec![0u8; pixels];
        Ok(())
    }

    // ----- entropy decode -----

    fn decode_one<P: PixelSink>(&mut self, sink: &mut P) -> Result<()> {
        if self.restart_interval > 0
            && self.restart_count == self.restart_interval
            && self.mcu_index > 0
        {
            self.bits.sync_restart(&mut self.input, self.next_restart)?;
            self.dc_values = [0; 3];
            self.next_restart = (self.next_restart + 1) & 7;
            self.restart_count = 0;
        }

        self.decode_mcu()?;

        match self.bits.marker() {
            None | Some(EOI) => {}
            Some(m) if (RST0..RST0 + 8).contains(&m) => {
                if self.restart_interval == 0 {
                    return Err(Error::Format);
                }
                // Consumed by sync_restart at the interval boundary.
            }
            Some(_) => return Err(Error::Format),
        }

        self.output_mcu(sink)?;
        self.mcu_index += 1;
        self.restart_count += 1;
        Ok(())
    }

    fn decode_mcu(&mut self) -> Result<()> {
        let mut tmp = [0i32; 64];
        let luma_blocks = self.scan.luma_blocks();

        for blk in 0..luma_blocks {
            self.decode_block(0, &mut tmp)?;
            let out = &mut self.mcu_buf[blk * 64..(blk + 1) * 64];
            block_idct(&mut tmp, out.try_into().map_err(|_| Error::Parameter)?);
        }

        if self.num_components == 3 {
            for comp in 1..3 {
                self.decode_block(comp, &mut tmp)?;
                let off = (luma_blocks + comp - 1) * 64;
                let out = &mut self.mcu_buf[off..off + 64];
                block_idct(&mut tmp, out.try_into().map_err(|_| Error::Parameter)?);
            }
        }
        Ok(())
    }

    /// Huffman-decode and dequantize one 8x8 block into `tmp`.
    fn decode_block(&mut self, comp: usize, tmp: &mut [i32; 64]) -> Result<()> {
        let (dc_id, ac_id) = self.scan_tables[comp];
        let qtable = self.qtables[self.qtable_ids[comp] as usize]
            .as_ref()
            .ok_or(Error::UndefinedTable)?;

        // DC: size category, extra bits, prediction.
        let dc_table = self.huff_dc[dc_id as usize]
            .as_ref()
            .ok_or(Error::UndefinedTable)?;
        let size = dc_table.decode(&mut self.bits, &mut self.input)? as usize;
        if size > 11 {
            return Err(Error::Decode);
        }
        let diff = if size > 0 {
            let raw = self.bits.read_bits(&mut self.input, size);
            extend(raw, size)
        } else {
            0
        };
        self.dc_values[comp] = self.dc_values[comp].wrapping_add(diff);
        tmp[0] = (self.dc_values[comp] as i32 * qtable[0]) >> 8;
        tmp[1..].fill(0);

        // AC: (run, size) pairs in zig-zag order.
        let ac_table = self.huff_ac[ac_id as usize]
            .as_ref()
            .ok_or(Error::UndefinedTable)?;
        let mut z = 1usize;
        while z < 64 {
            let symbol = ac_table.decode(&mut self.bits, &mut self.input)?;
            if symbol == 0 {
                break; // EOB
            }

            let run = (symbol >> 4) as usize;
            let size = (symbol & 0x0F) as usize;
            if size == 0 {
                if run != 15 {
                    return Err(Error::Decode);
                }
                z += 16; // ZRL
                if z >= 64 {
                    return Err(Error::Decode);
                }
                continue;
            }
            if size > 10 {
                return Err(Error::Decode);
            }

            z += run;
            if z >= 64 {
                return Err(Error::Decode);
            }
            let raw = self.bits.read_bits(&mut self.input, size);
            if !self.reduce {
                let i = ZIGZAG[z] as usize;
                tmp[i] = (extend(raw, size) as i32 * qtable[i]) >> 8;
            }
            z += 1;
        }

        Ok(())
    }

    // ----- output -----

    fn output_mcu<P: PixelSink>(&mut self, sink: &mut P) -> Result<()> {
        let mcu_w = self.scan.mcu_width();
        let mcu_h = self.scan.mcu_height();
        let x = (self.mcu_index % self.mcus_wide as u32) as u16 * mcu_w;
        let y = (self.mcu_index / self.mcus_wide as u32) as u16 * mcu_h;

        color::reconstruct_mcu(
            self.scan,
            &self.mcu_buf,
            &mut self.r_plane,
            &mut self.g_plane,
            &mut self.b_plane,
        );

        // Clip at the right/bottom image edges.
        let out_w = mcu_w.min(self.width - x);
        let out_h = mcu_h.min(self.height - y);

        sink.open_window(x, y, out_w, out_h)?;
        for py in 0..out_h as usize {
            let row = py * mcu_w as usize;
            for px in 0..out_w as usize {
                let i = row + px;
                sink.push_pixel(rgb888_to_rgb565(
                    self.r_plane[i],
                    self.g_plane[i],
                    self.b_plane[i],
                ))?;
            }
        }
        sink.close_window()
    }
}

/// Sign-extend a `size`-bit magnitude per the symmetric extend rule.
fn extend(v: u16, size: usize) -> i16 {
    let vt = 1i16 << (size - 1);
    if (v as i16) < vt {
        v as i16 + ((-1i16) << size) + 1
    } else {
        v as i16
    }
}
