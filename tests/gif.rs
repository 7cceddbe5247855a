//! End-to-end GIF decodes over handcrafted streams.
//!
//! The LZW payloads are small enough to be hand-packed; comments give
//! the code sequence each one carries.

use tinydec::{rgb565, Canvas, Error, GifDecoder, SliceSource};

const RED: (u8, u8, u8) = (255, 0, 0);
const GREEN: (u8, u8, u8) = (0, 255, 0);
const BLUE: (u8, u8, u8) = (0, 0, 255);

fn header() -> Vec<u8> {
    b"GIF89a".to_vec()
}

/// Logical screen descriptor, optionally followed by a global color
/// table (entry count must be a power of two between 2 and 256).
fn screen(width: u16, height: u16, colors: &[(u8, u8, u8)]) -> Vec<u8> {
    let mut out = header();
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&height.to_le_bytes());
    if colors.is_empty() {
        out.extend_from_slice(&[0x00, 0x00, 0x00]);
    } else {
        let size_field = colors.len().trailing_zeros() as u8 - 1;
        out.extend_from_slice(&[0x80 | size_field, 0x00, 0x00]);
        for &(r, g, b) in colors {
            out.extend_from_slice(&[r, g, b]);
        }
    }
    out
}

fn image_descriptor(left: u16, top: u16, width: u16, height: u16, packed: u8) -> Vec<u8> {
    let mut out = vec![0x2C];
    out.extend_from_slice(&left.to_le_bytes());
    out.extend_from_slice(&top.to_le_bytes());
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&height.to_le_bytes());
    out.push(packed);
    out
}

/// Image data: min code size, one sub-block, terminator.
fn image_data(min_code_size: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![min_code_size, payload.len() as u8];
    out.extend_from_slice(payload);
    out.push(0x00);
    out
}

/// Codes 4 (clear), 1, 6, 6, 5 (end): five pixels of index 1.
const RUN_OF_FIVE_ONES: [u8; 2] = [0x8C, 0x5D];

/// A 5x1 screen with one full-width image of color index 1.
fn five_red_pixels() -> Vec<u8> {
    let mut gif = screen(5, 1, &[(0, 0, 0), RED, GREEN, BLUE]);
    gif.extend(image_descriptor(0, 0, 5, 1, 0x00));
    gif.extend(image_data(2, &RUN_OF_FIVE_ONES));
    gif.push(0x3B);
    gif
}

#[test]
fn decodes_single_image_with_global_table() {
    let data = five_red_pixels();
    let mut dec = GifDecoder::new(SliceSource::new(&data));
    let info = dec.decode().unwrap();
    assert_eq!(info.width, 5);
    assert_eq!(info.height, 1);
    assert_eq!(info.global_colors, 4);

    let mut canvas = Canvas::new(5, 1);
    assert!(dec.next_image(0, 0, &mut canvas).unwrap());
    let red = rgb565(RED.0, RED.1, RED.2);
    assert!(canvas.pixels().iter().all(|&p| p == red));

    // Trailer reached; the decoder stays done.
    assert!(!dec.next_image(0, 0, &mut canvas).unwrap());
    assert!(!dec.next_image(0, 0, &mut canvas).unwrap());
}

#[test]
fn transparent_pixels_are_never_emitted() {
    // Codes 4 (clear), 1, 2, 1, 5 (end): pixels [1, 2, 1], with index 2
    // declared transparent by a preceding graphic control extension
    // that also carries a 10 cs delay.
    let mut gif = screen(3, 1, &[(0, 0, 0), RED, GREEN, BLUE]);
    gif.extend_from_slice(&[0x21, 0xF9, 0x04, 0x01, 0x0A, 0x00, 0x02, 0x00]);
    gif.extend(image_descriptor(0, 0, 3, 1, 0x00));
    gif.extend(image_data(2, &[0x8C, 0x52]));
    gif.push(0x3B);

    let mut dec = GifDecoder::new(SliceSource::new(&gif));
    dec.decode().unwrap();
    let mut canvas = Canvas::new(3, 1);
    assert!(dec.next_image(0, 0, &mut canvas).unwrap());

    // The extension stays readable for the image it covers.
    let gc = dec.graphic_control().unwrap();
    assert_eq!(gc.delay_cs, 10);
    assert_eq!(gc.transparent, Some(2));

    // The middle pixel stays at the canvas default instead of turning
    // green.
    let red = rgb565(RED.0, RED.1, RED.2);
    assert_eq!(canvas.pixels(), &[red, 0x0000, red]);

    // It binds to one image only.
    assert!(!dec.next_image(0, 0, &mut canvas).unwrap());
    assert!(dec.graphic_control().is_none());
}

#[test]
fn two_color_table_matches_manual_lzw_trace() {
    // Global table [black, white]; codes 4 (clear), 1, 0, 1, 5 (end)
    // give pixels [white, black, white].
    let mut gif = screen(3, 1, &[(0, 0, 0), (255, 255, 255)]);
    gif.extend(image_descriptor(0, 0, 3, 1, 0x00));
    gif.extend(image_data(2, &[0x0C, 0x52]));
    gif.push(0x3B);

    let mut dec = GifDecoder::new(SliceSource::new(&gif));
    dec.decode().unwrap();
    let mut canvas = Canvas::new(3, 1);
    assert!(dec.next_image(0, 0, &mut canvas).unwrap());
    assert_eq!(canvas.pixels(), &[0xFFFF, 0x0000, 0xFFFF]);
}

#[test]
fn local_color_table_supersedes_global() {
    let mut gif = screen(5, 1, &[(0, 0, 0), RED, GREEN, BLUE]);
    // Same pixels, but a local table mapping index 1 to blue.
    gif.extend(image_descriptor(0, 0, 5, 1, 0x81));
    for &(r, g, b) in &[(0, 0, 0), BLUE, RED, GREEN] {
        gif.extend_from_slice(&[r, g, b]);
    }
    gif.extend(image_data(2, &RUN_OF_FIVE_ONES));
    gif.push(0x3B);

    let mut dec = GifDecoder::new(SliceSource::new(&gif));
    dec.decode().unwrap();
    let mut canvas = Canvas::new(5, 1);
    assert!(dec.next_image(0, 0, &mut canvas).unwrap());

    let blue = rgb565(BLUE.0, BLUE.1, BLUE.2);
    assert!(canvas.pixels().iter().all(|&p| p == blue));
}

#[test]
fn placement_adds_caller_and_descriptor_offsets() {
    let mut gif = screen(8, 2, &[(0, 0, 0), RED, GREEN, BLUE]);
    gif.extend(image_descriptor(1, 1, 5, 1, 0x00));
    gif.extend(image_data(2, &RUN_OF_FIVE_ONES));
    gif.push(0x3B);

    let mut dec = GifDecoder::new(SliceSource::new(&gif));
    dec.decode().unwrap();
    let mut canvas = Canvas::new(10, 2);
    assert!(dec.next_image(2, 0, &mut canvas).unwrap());

    let red = rgb565(RED.0, RED.1, RED.2);
    // Caller x 2 + descriptor left 1, row = caller y 0 + top 1.
    for x in 0..10u16 {
        let expected = if (3..8).contains(&x) { red } else { 0 };
        assert_eq!(canvas.pixel(x, 1), expected);
    }
    assert!((0..10).all(|x| canvas.pixel(x, 0) == 0));
}

#[test]
fn placement_past_the_coordinate_range_is_rejected() {
    // Descriptor left 65535 plus caller x 1 exceeds u16.
    let mut gif = screen(5, 1, &[(0, 0, 0), RED, GREEN, BLUE]);
    gif.extend(image_descriptor(65535, 0, 1, 1, 0x00));
    gif.extend(image_data(2, &[0x4C, 0x01])); // clear, 1, end
    gif.push(0x3B);

    let mut dec = GifDecoder::new(SliceSource::new(&gif));
    dec.decode().unwrap();
    let mut canvas = Canvas::new(5, 1);
    assert_eq!(
        dec.next_image(1, 0, &mut canvas).unwrap_err(),
        Error::Parameter
    );
}

#[test]
fn skips_unknown_extensions() {
    let mut gif = screen(5, 1, &[(0, 0, 0), RED, GREEN, BLUE]);
    // Application extension (NETSCAPE looping) before the image.
    gif.extend_from_slice(&[0x21, 0xFF, 0x0B]);
    gif.extend_from_slice(b"NETSCAPE2.0");
    gif.extend_from_slice(&[0x03, 0x01, 0x00, 0x00, 0x00]);
    gif.extend(image_descriptor(0, 0, 5, 1, 0x00));
    gif.extend(image_data(2, &RUN_OF_FIVE_ONES));
    gif.push(0x3B);

    let mut dec = GifDecoder::new(SliceSource::new(&gif));
    dec.decode().unwrap();
    let mut canvas = Canvas::new(5, 1);
    assert!(dec.next_image(0, 0, &mut canvas).unwrap());
}

#[test]
fn rejects_interlaced_images() {
    let mut gif = screen(5, 1, &[(0, 0, 0), RED, GREEN, BLUE]);
    gif.extend(image_descriptor(0, 0, 1, 1, 0x40));

    let mut dec = GifDecoder::new(SliceSource::new(&gif));
    dec.decode().unwrap();
    let mut canvas = Canvas::new(5, 1);
    assert_eq!(
        dec.next_image(0, 0, &mut canvas).unwrap_err(),
        Error::Unsupported
    );
    // The error is terminal and sticky.
    assert_eq!(
        dec.next_image(0, 0, &mut canvas).unwrap_err(),
        Error::Unsupported
    );
}

#[test]
fn image_without_any_color_table_is_malformed() {
    let mut gif = screen(5, 1, &[]);
    gif.extend(image_descriptor(0, 0, 5, 1, 0x00));

    let mut dec = GifDecoder::new(SliceSource::new(&gif));
    dec.decode().unwrap();
    let mut canvas = Canvas::new(5, 1);
    assert_eq!(dec.next_image(0, 0, &mut canvas).unwrap_err(), Error::Format);
}

#[test]
fn color_index_past_the_palette_is_corrupt() {
    // Two-entry global table, but the single pixel uses index 2.
    // Codes 4 (clear), 2, 5 (end).
    let mut gif = screen(1, 1, &[(0, 0, 0), RED]);
    gif.extend(image_descriptor(0, 0, 1, 1, 0x00));
    gif.extend(image_data(2, &[0x54, 0x01]));
    gif.push(0x3B);

    let mut dec = GifDecoder::new(SliceSource::new(&gif));
    dec.decode().unwrap();
    let mut canvas = Canvas::new(1, 1);
    assert_eq!(dec.next_image(0, 0, &mut canvas).unwrap_err(), Error::Decode);
}

#[test]
fn missing_signature_is_not_this_format() {
    let data = b"NOTGIF";
    let mut dec = GifDecoder::new(SliceSource::new(data));
    assert_eq!(dec.decode().unwrap_err(), Error::NotThisFormat);
}

#[test]
fn unknown_version_is_malformed() {
    let data = b"GIF90a";
    let mut dec = GifDecoder::new(SliceSource::new(data));
    assert_eq!(dec.decode().unwrap_err(), Error::Format);
}

#[test]
fn abort_stops_the_stream() {
    let data = five_red_pixels();
    let mut dec = GifDecoder::new(SliceSource::new(&data));
    dec.decode().unwrap();
    dec.abort();

    let mut canvas = Canvas::new(5, 1);
    assert!(!dec.next_image(0, 0, &mut canvas).unwrap());
}
