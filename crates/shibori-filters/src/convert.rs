//! Conversions between [`image`] crate rasters and the framework's
//! [`ImageBuffer`].
//!
//! Decoding and encoding stay in the caller's hands (load with
//! [`image::open`], save through [`image::DynamicImage::save`]); these
//! functions only translate the in-memory representation. Sources with
//! 16-bit channels keep their depth; everything else goes through
//! 8-bit RGBA.

use image::{ColorType, DynamicImage, RgbaImage};
use shibori_core::ImageBuffer;

/// Convert a decoded raster into a filter input buffer.
///
/// Returns `None` only if the raster's dimensions are inconsistent with
/// its pixel data, which a successfully decoded image never is.
#[must_use]
pub fn from_dynamic(image: &DynamicImage) -> Option<ImageBuffer> {
    let color = image.color();
    let sixteen = matches!(
        color,
        ColorType::L16 | ColorType::La16 | ColorType::Rgb16 | ColorType::Rgba16
    );
    let alpha = color.has_alpha();

    if sixteen {
        let rgba = image.to_rgba16();
        let (width, height) = rgba.dimensions();
        let bytes: Vec<u8> = rgba
            .into_raw()
            .iter()
            .flat_map(|value| value.to_ne_bytes())
            .collect();
        ImageBuffer::from_raw(width, height, true, alpha, bytes)
    } else {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        ImageBuffer::from_raw(width, height, false, alpha, rgba.into_raw())
    }
}

/// Convert a filter output buffer back into an encodable raster.
///
/// Returns `None` for an empty buffer.
#[must_use]
pub fn to_dynamic(buffer: &ImageBuffer) -> Option<DynamicImage> {
    if buffer.is_empty() {
        return None;
    }
    if buffer.sixteen_bit() {
        let raw: Vec<u16> = buffer
            .data()
            .chunks_exact(2)
            .map(|pair| u16::from_ne_bytes([pair[0], pair[1]]))
            .collect();
        let rgba = image::ImageBuffer::from_raw(buffer.width(), buffer.height(), raw)?;
        Some(DynamicImage::ImageRgba16(rgba))
    } else {
        let rgba = RgbaImage::from_raw(buffer.width(), buffer.height(), buffer.data().to_vec())?;
        Some(DynamicImage::ImageRgba8(rgba))
    }
}
