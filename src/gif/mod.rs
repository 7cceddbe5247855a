//! GIF 87a/89a decoder.
//!
//! [`GifDecoder::decode`] reads the header, logical screen descriptor
//! and global color table; each [`GifDecoder::next_image`] call then
//! walks extension blocks up to the next image, LZW-decodes it a row
//! at a time and pushes the pixels into the sink. Transparent pixels
//! are skipped by splitting each row into opaque runs, so the sink
//! never sees a pixel for a transparent index.

mod lzw;

use alloc::vec;

use heapless::Vec as HVec;
use log::debug;

use crate::reader::ByteReader;
use crate::sink::{rgb888_to_rgb565, PixelSink};
use crate::source::ByteSource;
use crate::types::{Error, Result};

use lzw::LzwDecoder;

const BLOCK_EXTENSION: u8 = 0x21;
const BLOCK_IMAGE: u8 = 0x2C;
const BLOCK_TRAILER: u8 = 0x3B;

const EXT_PLAIN_TEXT: u8 = 0x01;
const EXT_GRAPHIC_CONTROL: u8 = 0xF9;
const EXT_COMMENT: u8 = 0xFE;
const EXT_APPLICATION: u8 = 0xFF;

/// Color table, stored pre-converted to RGB565.
type ColorTable = HVec<u16, 256>;

/// Logical screen parameters from [`GifDecoder::decode`].
#[derive(Debug, Clone, Copy)]
pub struct ScreenInfo {
    pub width: u16,
    pub height: u16,
    /// Global color table entry count, 0 when absent.
    pub global_colors: u16,
    pub background: u8,
}

/// State carried from a Graphic Control Extension to the image that
/// follows it.
#[derive(Debug, Clone, Copy)]
pub struct GraphicControl {
    pub disposal: u8,
    /// Frame delay in centiseconds.
    pub delay_cs: u16,
    pub transparent: Option<u8>,
}

enum State {
    Idle,
    Decoding,
    Done,
    Failed(Error),
}

/// Streaming GIF decoder over a [`ByteSource`].
pub struct GifDecoder<S> {
    input: ByteReader<S>,
    state: State,
    screen: ScreenInfo,
    global_table: ColorTable,
    graphic_control: Option<GraphicControl>,
}

impl<S: ByteSource> GifDecoder<S> {
    pub fn new(source: S) -> Self {
        Self {
            input: ByteReader::new(source),
            state: State::Idle,
            screen: ScreenInfo {
                width: 0,
                height: 0,
                global_colors: 0,
                background: 0,
            },
            global_table: ColorTable::new(),
            graphic_control: None,
        }
    }

    /// Graphic control state of the most recent extension, if any.
    pub fn graphic_control(&self) -> Option<&GraphicControl> {
        self.graphic_control.as_ref()
    }

    /// Parse the header, logical screen descriptor and global color
    /// table.
    pub fn decode(&mut self) -> Result<ScreenInfo> {
        if !matches!(self.state, State::Idle) {
            return Err(Error::Parameter);
        }
        match self.parse_screen() {
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

    /// Decode the next image, placing it at `(x, y)` plus its own
    /// descriptor offsets.
    ///
    /// Returns `Ok(false)` at the trailer (or after
    /// [`abort`](Self::abort)); any error is terminal and is returned
    /// again on subsequent calls.
    pub fn next_image<P: PixelSink>(&mut self, x: u16, y: u16, sink: &mut P) -> Result<bool> {
        match self.state {
            State::Decoding => {}
            State::Done => return Ok(false),
            State::Failed(e) => return Err(e),
            State::Idle => return Err(Error::Parameter),
        }

        match self.advance(x, y, sink) {
            Ok(more) => {
                if !more {
                    self.state = State::Done;
                }
                Ok(more)
            }
            Err(e) => {
                self.state = State::Failed(e);
                Err(e)
            }
        }
    }

    /// Stop decoding; later [`next_image`](Self::next_image) calls
    /// return `Ok(false)`.
    pub fn abort(&mut self) {
        self.state = State::Done;
        self.graphic_control = None;
    }

    fn parse_screen(&mut self) -> Result<ScreenInfo> {
        let mut header = [0u8; 6];
        self.input
            .read_exact(&mut header)
            .map_err(|_| Error::NotThisFormat)?;
        if &header[..3] != b"GIF" {
            return Err(Error::NotThisFormat);
        }
        if &header[3..] != b"87a" && &header[3..] != b"89a" {
            return Err(Error::Format);
        }

        let width = self.input.read_u16_le()?;
        let height = self.input.read_u16_le()?;
        if width == 0 || height == 0 {
            return Err(Error::Format);
        }
        let packed = self.input.read_u8()?;
        let background = self.input.read_u8()?;
        let _aspect = self.input.read_u8()?;

        let mut global_colors = 0u16;
        if packed & 0x80 != 0 {
            global_colors = 2 << (packed & 0x07);
            self.global_table = self.read_color_table(global_colors)?;
        }

        self.screen = ScreenInfo {
            width,
            height,
            global_colors,
            background,
        };
        debug!("screen {}x{}, {} global colors", width, height, global_colors);
        Ok(self.screen)
    }

    fn read_color_table(&mut self, entries: u16) -> Result<ColorTable> {
        let mut table = ColorTable::new();
        for _ in 0..entries {
            let mut rgb = [0u8; 3];
            self.input.read_exact(&mut rgb)?;
            table
                .push(rgb888_to_rgb565(rgb[0], rgb[1], rgb[2]))
                .map_err(|_| Error::Format)?;
        }
        Ok(table)
    }

    fn advance<P: PixelSink>(&mut self, x: u16, y: u16, sink: &mut P) -> Result<bool> {
        // Graphic control binds to one image only; drop the previous
        // frame's before scanning for the next.
        self.graphic_control = None;
        loop {
            match self.input.read_u8()? {
                BLOCK_TRAILER => return Ok(false),
                BLOCK_EXTENSION => self.parse_extension()?,
                BLOCK_IMAGE => {
                    self.decode_image(x, y, sink)?;
                    return Ok(true);
                }
                b => {
                    debug!("unknown block introducer 0x{:02X}", b);
                    return Err(Error::Format);
                }
            }
        }
    }

    fn parse_extension(&mut self) -> Result<()> {
        let label = self.input.read_u8()?;
        match label {
            EXT_GRAPHIC_CONTROL => {
                let len = self.input.read_u8()?;
                if len != 4 {
                    return Err(Error::Format);
                }
                let mut body = [0u8; 4];
                self.input.read_exact(&mut body)?;
                let packed = body[0];
                let transparent = if packed & 0x01 != 0 {
                    Some(body[3])
                } else {
                    None
                };
                self.graphic_control = Some(GraphicControl {
                    disposal: (packed >> 2) & 0x07,
                    delay_cs: u16::from_le_bytes([body[1], body[2]]),
                    transparent,
                });
            }
            EXT_PLAIN_TEXT | EXT_COMMENT | EXT_APPLICATION => {
                debug!("skipping extension 0x{:02X}", label);
            }
            other => {
                debug!("skipping unknown extension 0x{:02X}", other);
            }
        }
        self.skip_sub_blocks()
    }

    /// Skip sub-blocks up to and including the terminator.
    fn skip_sub_blocks(&mut self) -> Result<()> {
        loop {
            let len = self.input.read_u8()?;
            if len == 0 {
                return Ok(());
            }
            self.input.skip(len as usize)?;
        }
    }

    fn decode_image<P: PixelSink>(&mut self, x: u16, y: u16, sink: &mut P) -> Result<()> {
        let left = self.input.read_u16_le()?;
        let top = self.input.read_u16_le()?;
        let width = self.input.read_u16_le()?;
        let height = self.input.read_u16_le()?;
        if width == 0 || height == 0 {
            return Err(Error::Format);
        }
        let packed = self.input.read_u8()?;
        if packed & 0x40 != 0 {
            // Interlaced images would need out-of-order row addressing.
            return Err(Error::Unsupported);
        }

        // Caller offset plus descriptor placement must stay in range.
        let origin_x = x.checked_add(left).ok_or(Error::Parameter)?;
        let origin_y = y.checked_add(top).ok_or(Error::Parameter)?;
        if origin_x.checked_add(width - 1).is_none() || origin_y.checked_add(height - 1).is_none() {
            return Err(Error::Parameter);
        }

        let local_table;
        let table = if packed & 0x80 != 0 {
            local_table = self.read_color_table(2 << (packed & 0x07))?;
            &local_table
        } else if !self.global_table.is_empty() {
            &self.global_table
        } else {
            return Err(Error::Format);
        };

        let transparent = self.graphic_control.and_then(|gc| gc.transparent);
        let min_code_size = self.input.read_u8()?;
        let mut lzw = LzwDecoder::new(min_code_size)?;
        let mut blocks = DataBlocks::new(&mut self.input);

        debug!(
            "image {}x{} at ({}, {}), {} colors",
            width,
            height,
            left,
            top,
            table.len()
        );

        let mut row = vec![0u8; width as usize];
        for r in 0..height {
            lzw.decode_line(&mut blocks, &mut row)?;
            emit_row(sink, &row, table, transparent, origin_x, origin_y + r)?;
        }
        lzw.finish(&mut blocks)?;
        blocks.finish()
    }
}

/// Push one decoded row, split into opaque runs so transparent pixels
/// are never emitted.
fn emit_row<P: PixelSink>(
    sink: &mut P,
    row: &[u8],
    table: &ColorTable,
    transparent: Option<u8>,
    x: u16,
    y: u16,
) -> Result<()> {
    let mut start = 0usize;
    while start < row.len() {
        if transparent == Some(row[start]) {
            start += 1;
            continue;
        }
        let mut end = start + 1;
        while end < row.len() && transparent != Some(row[end]) {
            end += 1;
        }

        sink.open_window(x + start as u16, y, (end - start) as u16, 1)?;
        for &index in &row[start..end] {
            let color = *table.get(index as usize).ok_or(Error::Decode)?;
            sink.push_pixel(color)?;
        }
        sink.close_window()?;
        start = end;
    }
    Ok(())
}

/// Byte stream over the chunked image-data sub-blocks.
///
/// A zero-length sub-block reached while codes are still being pulled
/// means the data ran out early.
pub(crate) struct DataBlocks<'a, S> {
    input: &'a mut ByteReader<S>,
    remaining: u8,
}

impl<'a, S: ByteSource> DataBlocks<'a, S> {
    pub(crate) fn new(input: &'a mut ByteReader<S>) -> Self {
        Self {
            input,
            remaining: 0,
        }
    }

    pub(crate) fn next_byte(&mut self) -> Result<u8> {
        if self.remaining == 0 {
            let len = self.input.read_u8()?;
            if len == 0 {
                return Err(Error::Format);
            }
            self.remaining = len;
        }
        self.remaining -= 1;
        self.input.read_u8()
    }

    /// Discard what is left of the current sub-block and require the
    /// terminator to follow immediately.
    pub(crate) fn finish(self) -> Result<()> {
        self.input.skip(self.remaining as usize)?;
        if self.input.read_u8()? != 0 {
            return Err(Error::Format);
        }
        Ok(())
    }
}
