//! Pixel output abstraction and RGB565 helpers.

use alloc::vec;
use alloc::vec::Vec;

use crate::types::{Error, Rectangle, Result};

/// Display-shaped pixel consumer.
///
/// The decoders address a rectangular window, push exactly
/// `w * h` packed RGB565 pixels into it in row-major order, then close
/// it. They never write outside an opened window's declared extent.
///
/// Returning [`Error::Interrupted`] from any method stops the decode.
pub trait PixelSink {
    fn open_window(&mut self, x: u16, y: u16, w: u16, h: u16) -> Result<()>;
    fn push_pixel(&mut self, color: u16) -> Result<()>;
    fn close_window(&mut self) -> Result<()>;
}

impl<T: PixelSink + ?Sized> PixelSink for &mut T {
    fn open_window(&mut self, x: u16, y: u16, w: u16, h: u16) -> Result<()> {
        (**self).open_window(x, y, w, h)
    }

    fn push_pixel(&mut self, color: u16) -> Result<()> {
        (**self).push_pixel(color)
    }

    fn close_window(&mut self) -> Result<()> {
        (**self).close_window()
    }
}

macro_rules! generate_lut {
    ($name:ident, $factor:expr, $shift:expr) => {
        const $name: [u16; 256] = {
            let mut lut = [0u16; 256];
            let mut i = 0;
            while i < 256 {
                lut[i] = ((i as u16 * $factor) / 255) << $shift;
                i += 1;
            }
            lut
        };
    };
}

generate_lut!(RGB565_R_LUT, 31, 11);
generate_lut!(RGB565_G_LUT, 63, 5);
generate_lut!(RGB565_B_LUT, 31, 0);

/// Pack 8-bit RGB into a 16-bit RGB565 value.
#[inline(always)]
pub fn rgb888_to_rgb565(r: u8, g: u8, b: u8) -> u16 {
    RGB565_R_LUT[r as usize] | RGB565_G_LUT[g as usize] | RGB565_B_LUT[b as usize]
}

/// Shorthand used by tests and examples.
#[inline(always)]
pub fn rgb565(r: u8, g: u8, b: u8) -> u16 {
    rgb888_to_rgb565(r, g, b)
}

/// In-memory [`PixelSink`]: a plain RGB565 frame buffer.
///
/// Useful on hosts and in tests; embedded targets implement
/// [`PixelSink`] directly over their display driver instead.
pub struct Canvas {
    width: u16,
    height: u16,
    pixels: Vec<u16>,
    window: Option<Window>,
}

struct Window {
    rect: Rectangle,
    cursor: u32,
}

impl Canvas {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
            window: None,
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    pub fn pixel(&self, x: u16, y: u16) -> u16 {
        self.pixels[y as usize * self.width as usize + x as usize]
    }
}

impl PixelSink for Canvas {
    fn open_window(&mut self, x: u16, y: u16, w: u16, h: u16) -> Result<()> {
        if w == 0 || h == 0 {
            return Err(Error::Parameter);
        }
        if x + w > self.width || y + h > self.height {
            return Err(Error::Parameter);
        }
        self.window = Some(Window {
            rect: Rectangle::new(x, x + w - 1, y, y + h - 1),
            cursor: 0,
        });
        Ok(())
    }

    fn push_pixel(&mut self, color: u16) -> Result<()> {
        let win = self.window.as_mut().ok_or(Error::Parameter)?;
        let w = win.rect.width() as u32;
        if win.cursor >= w * win.rect.height() as u32 {
            return Err(Error::Parameter);
        }
        let row = win.rect.top as usize + (win.cursor / w) as usize;
        let col = win.rect.left as usize + (win.cursor % w) as usize;
        self.pixels[row * self.width as usize + col] = color;
        win.cursor += 1;
        Ok(())
    }

    fn close_window(&mut self) -> Result<()> {
        self.window = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb565_packing() {
        assert_eq!(rgb888_to_rgb565(0, 0, 0), 0x0000);
        assert_eq!(rgb888_to_rgb565(255, 255, 255), 0xFFFF);
        assert_eq!(rgb888_to_rgb565(255, 0, 0), 0xF800);
        assert_eq!(rgb888_to_rgb565(0, 255, 0), 0x07E0);
        assert_eq!(rgb888_to_rgb565(0, 0, 255), 0x001F);
    }

    #[test]
    fn canvas_window_addressing() {
        let mut c = Canvas::new(4, 2);
        c.open_window(1, 0, 2, 2).unwrap();
        for p in [1u16, 2, 3, 4] {
            c.push_pixel(p).unwrap();
        }
        c.close_window().unwrap();
        assert_eq!(c.pixels(), &[0, 1, 2, 0, 0, 3, 4, 0]);
    }

    #[test]
    fn canvas_rejects_out_of_bounds_window() {
        let mut c = Canvas::new(4, 4);
        assert_eq!(c.open_window(3, 0, 2, 1), Err(Error::Parameter));
        assert_eq!(c.push_pixel(0), Err(Error::Parameter));
    }
}
