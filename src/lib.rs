//! tinydec - streaming image decoders for small displays
//!
//! Baseline JPEG and GIF87a/89a decoders that hold no frame buffer:
//! decoded pixels are pushed into a [`PixelSink`] (the display
//! abstraction) as they are produced, one MCU or one image row at a
//! time. Working memory is a small fixed set of tables plus one MCU /
//! one scanline worth of pixels, which makes the crate usable on
//! targets that cannot hold a decoded image in RAM.
//!
//! Input bytes come from a [`ByteSource`] (file- or array-backed); the
//! decoders issue small bounded read requests and never seek.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod reader;
mod sink;
mod source;
mod types;

pub mod gif;
pub mod jpeg;

pub use gif::{GifDecoder, GraphicControl, ScreenInfo};
pub use jpeg::{FrameInfo, JpegDecoder, ScanType};
pub use sink::{rgb565, rgb888_to_rgb565, Canvas, PixelSink};
pub use source::{ByteSource, SliceSource};
#[cfg(feature = "std")]
pub use source::ReadSource;
pub use types::{Error, Rectangle, Result};

/// Size of the stream input buffer.
pub const BUFFER_SIZE: usize = 512;

/// Largest image dimension either decoder accepts.
pub const MAX_DIMENSION: u16 = 65500;
