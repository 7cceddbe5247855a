//! Constant tables for the JPEG decoder.

/// Zig-zag scan order: maps a linear coefficient index to its raster
/// position within the 8x8 block.
pub const ZIGZAG: [u8; 64] = [
    0, 1, 8, 16, 9, 2, 3, 10,
    17, 24, 32, 25, 18, 11, 4, 5,
    12, 19, 26, 33, 40, 48, 41, 34,
    27, 20, 13, 6, 7, 14, 21, 28,
    35, 42, 49, 56, 57, 50, 43, 36,
    29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46,
    53, 60, 61, 54, 47, 55, 62, 63,
];

/// Inverse scale factors for the AAN IDCT, 8192-based fixed point.
///
/// Quantization tables are pre-multiplied by these at DQT load time so
/// that dequantization is a single multiply plus an 8-bit descale.
pub const ARAI_SCALE_FACTOR: [u16; 64] = [
    8192, 11362, 10703, 9632, 8192, 6436, 4433, 2260,
    11362, 15760, 14845, 13361, 11362, 8927, 6149, 3134,
    10703, 14845, 13984, 12585, 10703, 8409, 5792, 2953,
    9632, 13361, 12585, 11327, 9632, 7568, 5213, 2657,
    8192, 11362, 10703, 9632, 8192, 6436, 4433, 2260,
    6436, 8927, 8409, 7568, 6436, 5057, 3483, 1775,
    4433, 6149, 5792, 5213, 4433, 3483, 2399, 1223,
    2260, 3134, 2953, 2657, 2260, 1775, 1223, 623,
];
