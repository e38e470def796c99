//! Brightness / contrast / gamma adjustment.
//!
//! The three corrections are folded into one per-channel lookup table
//! built once per run, so the pixel loop is a single indexed read per
//! channel. The table covers the buffer's full channel scale (256 or
//! 65536 entries) and its allocation is fallible like every other
//! image-sized allocation in a run.

use serde::{Deserialize, Serialize};
use shibori_core::{FilterBody, FilterContext, FilterError};

use crate::pixel;

/// Adjustment parameters. The defaults are the identity mapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BcgParams {
    /// Additive brightness shift in normalized units, `-1.0..=1.0`.
    pub brightness: f64,
    /// Contrast multiplier around mid-gray; `1.0` is neutral.
    pub contrast: f64,
    /// Gamma exponent; `1.0` is neutral. Values at or below zero are
    /// clamped to a small positive epsilon.
    pub gamma: f64,
}

impl Default for BcgParams {
    fn default() -> Self {
        Self {
            brightness: 0.0,
            contrast: 1.0,
            gamma: 1.0,
        }
    }
}

impl BcgParams {
    /// Whether applying these parameters would leave every channel
    /// value unchanged.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

/// Apply brightness, contrast, and gamma through a lookup table.
#[derive(Debug, Clone, Copy)]
pub struct Bcg {
    params: BcgParams,
}

impl Bcg {
    #[must_use]
    pub const fn new(params: BcgParams) -> Self {
        Self { params }
    }
}

impl FilterBody for Bcg {
    fn run(&mut self, ctx: &mut FilterContext<'_>) -> Result<(), FilterError> {
        let sixteen = ctx.original().sixteen_bit();
        let lut = build_lut(&self.params, pixel::max_value(sixteen))?;

        let height = ctx.original().height();
        for y in 0..height {
            ctx.ensure_active()?;
            {
                let (original, dest) = ctx.split();
                let width = original.width() as usize;
                let (Some(src), Some(dst)) = (original.row(y), dest.row_mut(y)) else {
                    break;
                };
                for p in 0..width {
                    let base = p * pixel::CHANNELS;
                    for c in 0..3 {
                        let value = pixel::get(src, sixteen, base + c) as usize;
                        pixel::set(dst, sixteen, base + c, lut[value]);
                    }
                    let alpha = pixel::get(src, sixteen, base + 3);
                    pixel::set(dst, sixteen, base + 3, alpha);
                }
            }
            ctx.post_progress(pixel::band_progress(y, height));
        }
        Ok(())
    }
}

/// One table entry per channel value: contrast around mid-gray, then the
/// brightness shift, then gamma correction, clamped to `0..=max`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn build_lut(params: &BcgParams, max: u32) -> Result<Vec<u32>, FilterError> {
    let gamma = params.gamma.max(0.01);
    let scale = f64::from(max);

    let mut lut = Vec::new();
    lut.try_reserve_exact(max as usize + 1)?;
    for value in 0..=max {
        let normalized = f64::from(value) / scale;
        let adjusted = (normalized - 0.5).mul_add(params.contrast, 0.5) + params.brightness;
        let corrected = adjusted.clamp(0.0, 1.0).powf(1.0 / gamma);
        lut.push((corrected * scale).round() as u32);
    }
    Ok(lut)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testutil::apply;
    use shibori_core::ImageBuffer;

    #[test]
    fn default_params_are_identity() {
        assert!(BcgParams::default().is_identity());

        let mut original = ImageBuffer::try_new(2, 1, false, true).unwrap();
        original.data_mut().copy_from_slice(&[0, 64, 128, 255, 200, 13, 255, 0]);
        let expected = original.data().to_vec();

        let dest = apply(Bcg::new(BcgParams::default()), original);
        assert_eq!(dest.data(), expected.as_slice());
    }

    #[test]
    fn positive_brightness_lifts_midtones() {
        let mut original = ImageBuffer::try_new(1, 1, false, false).unwrap();
        original.data_mut().copy_from_slice(&[100, 100, 100, 255]);

        let params = BcgParams {
            brightness: 0.2,
            ..BcgParams::default()
        };
        let dest = apply(Bcg::new(params), original);
        // 100/255 + 0.2 ≈ 0.592 → 151.
        assert_eq!(dest.data()[0], 151);
        assert_eq!(dest.data()[3], 255, "alpha is untouched");
    }

    #[test]
    fn contrast_pivots_around_mid_gray() {
        let mut original = ImageBuffer::try_new(2, 1, false, false).unwrap();
        original.data_mut().copy_from_slice(&[50, 50, 50, 0, 200, 200, 200, 0]);

        let params = BcgParams {
            contrast: 2.0,
            ..BcgParams::default()
        };
        let dest = apply(Bcg::new(params), original);
        let dark = dest.data()[0];
        let bright = dest.data()[4];
        assert!(dark < 50, "dark values move darker, got {dark}");
        assert!(bright > 200, "bright values move brighter, got {bright}");
    }

    #[test]
    fn gamma_above_one_brightens() {
        let mut original = ImageBuffer::try_new(1, 1, false, false).unwrap();
        original.data_mut().copy_from_slice(&[64, 64, 64, 0]);

        let params = BcgParams {
            gamma: 2.2,
            ..BcgParams::default()
        };
        let dest = apply(Bcg::new(params), original);
        assert!(dest.data()[0] > 64, "got {}", dest.data()[0]);
    }

    #[test]
    fn extreme_values_clamp_to_scale() {
        let mut original = ImageBuffer::try_new(2, 1, false, false).unwrap();
        original.data_mut().copy_from_slice(&[10, 10, 10, 0, 250, 250, 250, 0]);

        let params = BcgParams {
            brightness: 1.0,
            ..BcgParams::default()
        };
        let dest = apply(Bcg::new(params), original);
        assert_eq!(dest.data()[0], 255);
        assert_eq!(dest.data()[4], 255);
    }

    #[test]
    fn params_serde_round_trip() {
        let params = BcgParams {
            brightness: -0.25,
            contrast: 1.5,
            gamma: 0.8,
        };
        let json = serde_json::to_string(&params).unwrap();
        let back: BcgParams = serde_json::from_str(&json).unwrap();
        assert_eq!(params, back);
    }

    #[test]
    fn missing_fields_deserialize_to_identity() {
        let params: BcgParams = serde_json::from_str("{}").unwrap();
        assert!(params.is_identity());
    }

    #[test]
    fn sixteen_bit_table_covers_full_scale() {
        let mut original = ImageBuffer::try_new(1, 1, true, false).unwrap();
        let mut bytes = Vec::new();
        for value in [32768u16, 32768, 32768, 65535] {
            bytes.extend_from_slice(&value.to_ne_bytes());
        }
        original.data_mut().copy_from_slice(&bytes);

        let params = BcgParams {
            brightness: 0.5,
            ..BcgParams::default()
        };
        let dest = apply(Bcg::new(params), original);
        let red = u16::from_ne_bytes([dest.data()[0], dest.data()[1]]);
        assert_eq!(red, 65535, "half scale plus 0.5 brightness saturates");
    }
}
