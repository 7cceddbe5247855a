//! YCbCr to RGB reconstruction with chroma upsampling.
//!
//! Fixed-point constants use the 1024-based convention; every chroma
//! sample is replicated across the luma footprint its scan type gives
//! it (1x1, 2x1, 1x2 or 2x2).

use crate::jpeg::ScanType;

const CVACC: i32 = 1024;
const FP_1_402: i32 = (1.402 * CVACC as f64) as i32;
const FP_0_344: i32 = (0.344 * CVACC as f64) as i32;
const FP_0_714: i32 = (0.714 * CVACC as f64) as i32;
const FP_1_772: i32 = (1.772 * CVACC as f64) as i32;

#[inline(always)]
fn byte_clip(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// Reconstruct one MCU's RGB planes from its decoded sample blocks.
///
/// `mcu_buf` holds the luma blocks in raster order followed by the Cb
/// and Cr blocks (absent for grayscale). The planes are sized to the
/// MCU's pixel footprint and reused across MCUs.
pub fn reconstruct_mcu(
    scan: ScanType,
    mcu_buf: &[i16],
    r_plane: &mut [u8],
    g_plane: &mut [u8],
    b_plane: &mut [u8],
) {
    let mcu_w = scan.mcu_width() as usize;
    let mcu_h = scan.mcu_height() as usize;
    let luma_cols = mcu_w / 8;
    let luma_blocks = scan.luma_blocks();
    let (csx, csy) = scan.chroma_shift();

    for py in 0..mcu_h {
        for px in 0..mcu_w {
            let block = (py / 8) * luma_cols + px / 8;
            let luma = mcu_buf[block * 64 + (py % 8) * 8 + px % 8] as i32;
            let i = py * mcu_w + px;

            if scan == ScanType::Gray {
                let v = byte_clip(luma);
                r_plane[i] = v;
                g_plane[i] = v;
                b_plane[i] = v;
                continue;
            }

            let cx = px >> csx;
            let cy = py >> csy;
            let cb = mcu_buf[luma_blocks * 64 + cy * 8 + cx] as i32 - 128;
            let cr = mcu_buf[(luma_blocks + 1) * 64 + cy * 8 + cx] as i32 - 128;

            r_plane[i] = byte_clip(luma + FP_1_402 * cr / CVACC);
            g_plane[i] = byte_clip(luma - (FP_0_344 * cb + FP_0_714 * cr) / CVACC);
            b_plane[i] = byte_clip(luma + FP_1_772 * cb / CVACC);
        }
    }
}
