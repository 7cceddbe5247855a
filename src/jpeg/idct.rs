//! Inverse DCT in the Arai (Winograd-style) algorithm.
//!
//! The input block is dequantized and pre-scaled for this algorithm
//! (see `tables::ARAI_SCALE_FACTOR`); internal values keep 8 fractional
//! bits. The +128 level shift is folded into the row pass, so output
//! samples are nominally in [0, 255] but are only clamped during color
//! conversion.

const M13: i32 = (1.41421 * 4096.0) as i32;
const M2: i32 = (1.08239 * 4096.0) as i32;
const M4: i32 = (2.61313 * 4096.0) as i32;
const M5: i32 = (1.84776 * 4096.0) as i32;

/// Transform one 8x8 block in place and write the spatial samples.
pub fn block_idct(src: &mut [i32; 64], dst: &mut [i16; 64]) {
    // Columns.
    for c in 0..8 {
        if src[c + 8] == 0
            && src[c + 16] == 0
            && src[c + 24] == 0
            && src[c + 32] == 0
            && src[c + 40] == 0
            && src[c + 48] == 0
            && src[c + 56] == 0
        {
            // All AC terms zero: the column transforms to its DC value.
            let dc = src[c];
            for k in 1..8 {
                src[c + 8 * k] = dc;
            }
            continue;
        }

        let v0 = src[c];
        let v1 = src[c + 8 * 2];
        let v2 = src[c + 8 * 4];
        let v3 = src[c + 8 * 6];

        let t10 = v0 + v2;
        let t12 = v0 - v2;
        let mut t11 = (v1 - v3) * M13 >> 12;
        let v3 = v3 + v1;
        t11 -= v3;
        let v0 = t10 + v3;
        let v3 = t10 - v3;
        let v1 = t11 + t12;
        let v2 = t12 - t11;

        let v4 = src[c + 8 * 7];
        let v5 = src[c + 8];
        let v6 = src[c + 8 * 5];
        let v7 = src[c + 8 * 3];

        let t10 = v5 - v4;
        let t13 = v5 + v4;
        let t11 = v6 - v7;
        let mut v7 = v7 + v6;
        let mut v5 = (t13 - v7) * M13 >> 12;
        v7 += t13;
        let t13 = (t10 + t11) * M5 >> 12;
        let mut v4 = t13 - (t10 * M2 >> 12);
        let v6 = t13 - (t11 * M4 >> 12) - v7;
        v5 -= v6;
        v4 -= v5;

        src[c] = v0 + v7;
        src[c + 8 * 7] = v0 - v7;
        src[c + 8] = v1 + v6;
        src[c + 8 * 6] = v1 - v6;
        src[c + 8 * 2] = v2 + v5;
        src[c + 8 * 5] = v2 - v5;
        src[c + 8 * 3] = v3 + v4;
        src[c + 8 * 4] = v3 - v4;
    }

    // Rows. The DC offset removed by the encoder is re-applied here.
    for r in 0..8 {
        let b = r * 8;
        let row = &src[b..b + 8];

        if row[1..].iter().all(|&v| v == 0) {
            let flat = ((row[0] + (128 << 8)) >> 8) as i16;
            dst[b..b + 8].fill(flat);
            continue;
        }

        let v0 = row[0] + (128 << 8);
        let v1 = row[2];
        let v2 = row[4];
        let v3 = row[6];

        let t10 = v0 + v2;
        let t12 = v0 - v2;
        let mut t11 = (v1 - v3) * M13 >> 12;
        let v3 = v3 + v1;
        t11 -= v3;
        let v0 = t10 + v3;
        let v3 = t10 - v3;
        let v1 = t11 + t12;
        let v2 = t12 - t11;

        let v4 = row[7];
        let v5 = row[1];
        let v6 = row[5];
        let v7 = row[3];

        let t10 = v5 - v4;
        let t13 = v5 + v4;
        let t11 = v6 - v7;
        let mut v7 = v7 + v6;
        let mut v5 = (t13 - v7) * M13 >> 12;
        v7 += t13;
        let t13 = (t10 + t11) * M5 >> 12;
        let mut v4 = t13 - (t10 * M2 >> 12);
        let v6 = t13 - (t11 * M4 >> 12) - v7;
        v5 -= v6;
        v4 -= v5;

        dst[b] = ((v0 + v7) >> 8) as i16;
        dst[b + 7] = ((v0 - v7) >> 8) as i16;
        dst[b + 1] = ((v1 + v6) >> 8) as i16;
        dst[b + 6] = ((v1 - v6) >> 8) as i16;
        dst[b + 2] = ((v2 + v5) >> 8) as i16;
        dst[b + 5] = ((v2 - v5) >> 8) as i16;
        dst[b + 3] = ((v3 + v4) >> 8) as i16;
        dst[b + 4] = ((v3 - v4) >> 8) as i16;
    }
}
