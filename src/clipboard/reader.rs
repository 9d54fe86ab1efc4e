use image::{ImageFormat, RgbaImage};

use super::backend::{ClipboardBackend, ClipboardError, ClipboardFormat, ImagePayload};
use crate::models::ClipboardImage;

const FILE_HEADER_LEN: usize = 14;
const MIN_INFO_HEADER_LEN: usize = 40;
const BI_BITFIELDS: u32 = 3;
const BI_ALPHABITFIELDS: u32 = 6;

/// Read the current clipboard image, if any
///
/// Opens the clipboard once and checks formats in priority order (DIB, then
/// bitmap), returning the first one that decodes. The session is dropped on
/// every return path, which releases the clipboard. Open failures and decode
/// failures are logged and reported as "no image".
pub fn try_read_image(backend: &mut dyn ClipboardBackend) -> Option<ClipboardImage> {
    let mut session = match backend.open() {
        Ok(session) => session,
        Err(e) => {
            log::debug!("Skipping clipboard read: {}", e);
            return None;
        }
    };

    for format in ClipboardFormat::PRIORITY {
        if !session.has_format(format) {
            continue;
        }

        let decoded = session
            .read_image(format)
            .and_then(|payload| decode_payload(&payload));

        match decoded {
            Ok(pixels) => {
                log::trace!(
                    "Read {}x{} image from {}",
                    pixels.width(),
                    pixels.height(),
                    format
                );
                return Some(ClipboardImage::new(pixels, format));
            }
            Err(e) => log::debug!("Ignoring {} clipboard data: {}", format, e),
        }
    }

    None
}

/// Decode a backend payload into RGBA8 pixels
pub fn decode_payload(payload: &ImagePayload) -> Result<RgbaImage, ClipboardError> {
    match payload {
        ImagePayload::Dib(dib) => {
            let bmp = dib_to_bmp(dib)?;
            decode_bmp(&bmp)
        }
        ImagePayload::Bmp(bmp) => decode_bmp(bmp),
        ImagePayload::Rgba {
            width,
            height,
            pixels,
        } => RgbaImage::from_raw(*width, *height, pixels.clone()).ok_or_else(|| {
            ClipboardError::Decode(format!(
                "{} bytes do not fill a {}x{} RGBA image",
                pixels.len(),
                width,
                height
            ))
        }),
    }
}

fn decode_bmp(bmp: &[u8]) -> Result<RgbaImage, ClipboardError> {
    image::load_from_memory_with_format(bmp, ImageFormat::Bmp)
        .map(|image| image.to_rgba8())
        .map_err(|e| ClipboardError::Decode(e.to_string()))
}

/// Prefix a packed DIB with a `BITMAPFILEHEADER` so it can be decoded as BMP
///
/// The pixel offset accounts for the info header, the colour masks that
/// follow a plain `BITMAPINFOHEADER` when bit fields are used, and the
/// palette.
pub fn dib_to_bmp(dib: &[u8]) -> Result<Vec<u8>, ClipboardError> {
    let truncated = || ClipboardError::Decode(format!("DIB truncated at {} bytes", dib.len()));

    let header_len = read_u32(dib, 0).ok_or_else(truncated)? as usize;
    if header_len < MIN_INFO_HEADER_LEN || dib.len() < header_len {
        return Err(ClipboardError::Decode(format!(
            "invalid DIB header size {} ({} bytes available)",
            header_len,
            dib.len()
        )));
    }

    let bit_count = read_u16(dib, 14).ok_or_else(truncated)?;
    let compression = read_u32(dib, 16).ok_or_else(truncated)?;
    let colors_used = read_u32(dib, 32).ok_or_else(truncated)? as usize;

    let masks_len = if header_len == MIN_INFO_HEADER_LEN {
        match compression {
            BI_BITFIELDS => 12,
            BI_ALPHABITFIELDS => 16,
            _ => 0,
        }
    } else {
        0
    };

    let palette_len = if colors_used > 0 {
        colors_used * 4
    } else if bit_count <= 8 {
        (1usize << bit_count) * 4
    } else {
        0
    };

    let pixel_offset = FILE_HEADER_LEN + header_len + masks_len + palette_len;
    let file_len = FILE_HEADER_LEN + dib.len();
    let to_u32 = |value: usize| {
        u32::try_from(value)
            .map_err(|_| ClipboardError::Decode(format!("DIB too large ({} bytes)", value)))
    };

    let mut bmp = Vec::with_capacity(file_len);
    bmp.extend_from_slice(b"BM");
    bmp.extend_from_slice(&to_u32(file_len)?.to_le_bytes());
    bmp.extend_from_slice(&[0u8; 4]);
    bmp.extend_from_slice(&to_u32(pixel_offset)?.to_le_bytes());
    bmp.extend_from_slice(dib);
    Ok(bmp)
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let raw: [u8; 4] = bytes.get(offset..offset + 4)?.try_into().ok()?;
    Some(u32::from_le_bytes(raw))
}

fn read_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    let raw: [u8; 2] = bytes.get(offset..offset + 2)?.try_into().ok()?;
    Some(u16::from_le_bytes(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeClipboard, dib_24bit, rgba_payload};

    #[test]
    fn test_empty_clipboard_reads_nothing() {
        let mut clipboard = FakeClipboard::new();
        assert!(try_read_image(&mut clipboard).is_none());
        assert_eq!(clipboard.opens(), 1);
        assert_eq!(clipboard.closes(), 1);
    }

    #[test]
    fn test_dib_decodes_bottom_up_rows() {
        // Top row blue/white, bottom row red/green
        let dib = dib_24bit(2, 2, |x, y| match (x, y) {
            (0, 0) => [0, 0, 255],
            (1, 0) => [255, 255, 255],
            (0, 1) => [255, 0, 0],
            _ => [0, 255, 0],
        });

        let pixels = decode_payload(&ImagePayload::Dib(dib)).unwrap();
        assert_eq!(pixels.dimensions(), (2, 2));
        assert_eq!(pixels.get_pixel(0, 0).0, [0, 0, 255, 255]);
        assert_eq!(pixels.get_pixel(1, 0).0, [255, 255, 255, 255]);
        assert_eq!(pixels.get_pixel(0, 1).0, [255, 0, 0, 255]);
        assert_eq!(pixels.get_pixel(1, 1).0, [0, 255, 0, 255]);
    }

    #[test]
    fn test_bitmap_decodes_like_matching_dib() {
        let color = |x: u32, y: u32| [(x * 60) as u8, (y * 90) as u8, 200];

        let rgb = image::RgbImage::from_fn(3, 2, |x, y| image::Rgb(color(x, y)));
        let mut bmp = Vec::new();
        image::DynamicImage::ImageRgb8(rgb)
            .write_to(&mut std::io::Cursor::new(&mut bmp), ImageFormat::Bmp)
            .unwrap();

        let from_bitmap = decode_payload(&ImagePayload::Bmp(bmp)).unwrap();
        let from_dib = decode_payload(&ImagePayload::Dib(dib_24bit(3, 2, color))).unwrap();

        assert_eq!(from_bitmap.dimensions(), (3, 2));
        assert_eq!(from_bitmap.get_pixel(2, 1).0, [120, 90, 200, 255]);
        assert_eq!(from_bitmap, from_dib);

        let bitmap_image = ClipboardImage::new(from_bitmap, ClipboardFormat::Bitmap);
        let dib_image = ClipboardImage::new(from_dib, ClipboardFormat::Dib);
        assert_eq!(
            crate::image::fingerprint(&bitmap_image).unwrap(),
            crate::image::fingerprint(&dib_image).unwrap()
        );
    }

    #[test]
    fn test_corrupt_bitmap_is_decode_error() {
        assert!(matches!(
            decode_payload(&ImagePayload::Bmp(b"BM not really".to_vec())),
            Err(ClipboardError::Decode(_))
        ));
    }

    #[test]
    fn test_dib_preferred_over_bitmap() {
        let mut clipboard = FakeClipboard::new();
        clipboard.put_image(
            ClipboardFormat::Dib,
            ImagePayload::Dib(dib_24bit(1, 1, |_, _| [10, 20, 30])),
        );
        clipboard.put_image(ClipboardFormat::Bitmap, rgba_payload(1, 1, [1, 2, 3, 255]));

        let image = try_read_image(&mut clipboard).unwrap();
        assert_eq!(image.source(), ClipboardFormat::Dib);
        assert_eq!(image.pixels().get_pixel(0, 0).0, [10, 20, 30, 255]);
    }

    #[test]
    fn test_falls_back_to_bitmap_when_dib_is_corrupt() {
        let mut clipboard = FakeClipboard::new();
        clipboard.put_image(ClipboardFormat::Dib, ImagePayload::Dib(vec![1, 2, 3]));
        clipboard.put_image(ClipboardFormat::Bitmap, rgba_payload(2, 1, [9, 9, 9, 255]));

        let image = try_read_image(&mut clipboard).unwrap();
        assert_eq!(image.source(), ClipboardFormat::Bitmap);
        assert_eq!(image.width(), 2);
        assert_eq!(clipboard.closes(), 1);
    }

    #[test]
    fn test_session_released_on_decode_failure() {
        let mut clipboard = FakeClipboard::new();
        clipboard.put_image(ClipboardFormat::Dib, ImagePayload::Dib(vec![0; 8]));

        assert!(try_read_image(&mut clipboard).is_none());
        assert_eq!(clipboard.opens(), 1);
        assert_eq!(clipboard.closes(), 1);
    }

    #[test]
    fn test_open_failure_reports_no_image() {
        let mut clipboard = FakeClipboard::new();
        clipboard.put_image(ClipboardFormat::Bitmap, rgba_payload(1, 1, [0, 0, 0, 255]));
        clipboard.fail_open(true);

        assert!(try_read_image(&mut clipboard).is_none());
        assert_eq!(clipboard.opens(), 0);
    }

    #[test]
    fn test_rgba_payload_size_mismatch_rejected() {
        let payload = ImagePayload::Rgba {
            width: 4,
            height: 4,
            pixels: vec![0; 10],
        };
        assert!(matches!(
            decode_payload(&payload),
            Err(ClipboardError::Decode(_))
        ));
    }

    #[test]
    fn test_dib_header_offset_accounts_for_palette_and_masks() {
        let mut dib = vec![0u8; 40];
        dib[0..4].copy_from_slice(&40u32.to_le_bytes());
        dib[14..16].copy_from_slice(&32u16.to_le_bytes());
        dib[16..20].copy_from_slice(&BI_BITFIELDS.to_le_bytes());

        let bmp = dib_to_bmp(&dib).unwrap();
        assert_eq!(&bmp[0..2], b"BM");
        assert_eq!(read_u32(&bmp, 10), Some(14 + 40 + 12));

        dib[14..16].copy_from_slice(&8u16.to_le_bytes());
        dib[16..20].copy_from_slice(&0u32.to_le_bytes());
        let bmp = dib_to_bmp(&dib).unwrap();
        assert_eq!(read_u32(&bmp, 10), Some(14 + 40 + 256 * 4));
    }
}
