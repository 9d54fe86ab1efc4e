use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, ImageResult};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::models::ClipboardImage;

/// SHA-256 of the canonical PNG encoding of an image's RGBA pixels
///
/// Only used to tell whether the clipboard image changed; never persisted.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex form
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..12])
    }
}

/// Fingerprint an image
///
/// The pixels are re-encoded as PNG with fixed encoder settings, so two images
/// with identical pixels hash the same whichever clipboard format they were
/// decoded from.
pub fn fingerprint(image: &ClipboardImage) -> ImageResult<Fingerprint> {
    let pixels = image.pixels();
    let mut png = Vec::with_capacity(pixels.as_raw().len() / 2);

    PngEncoder::new_with_quality(&mut png, CompressionType::Fast, FilterType::Adaptive).write_image(
        pixels.as_raw(),
        pixels.width(),
        pixels.height(),
        ExtendedColorType::Rgba8,
    )?;

    let digest = Sha256::digest(&png);
    Ok(Fingerprint(digest.into()))
}
