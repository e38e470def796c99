//! Weighted-luminance desaturation.
//!
//! Replaces each pixel's R/G/B channels with the Rec. 601 luma
//! `0.299 R + 0.587 G + 0.114 B`, computed in integer arithmetic
//! (weights 77/150/29 over 256), preserving alpha. Works at both
//! depths since the weights are applied to raw channel values.

use shibori_core::{FilterBody, FilterContext, FilterError};

use crate::pixel;

/// Desaturate to weighted luminance.
#[derive(Debug, Default, Clone, Copy)]
pub struct Grayscale;

impl FilterBody for Grayscale {
    fn run(&mut self, ctx: &mut FilterContext<'_>) -> Result<(), FilterError> {
        let height = ctx.original().height();
        for y in 0..height {
            ctx.ensure_active()?;
            {
                let (original, dest) = ctx.split();
                let sixteen = original.sixteen_bit();
                let width = original.width() as usize;
                let (Some(src), Some(dst)) = (original.row(y), dest.row_mut(y)) else {
                    break;
                };
                for p in 0..width {
                    let base = p * pixel::CHANNELS;
                    let r = pixel::get(src, sixteen, base);
                    let g = pixel::get(src, sixteen, base + 1);
                    let b = pixel::get(src, sixteen, base + 2);
                    let a = pixel::get(src, sixteen, base + 3);
                    let luma = (r * 77 + g * 150 + b * 29) >> 8;
                    pixel::set(dst, sixteen, base, luma);
                    pixel::set(dst, sixteen, base + 1, luma);
                    pixel::set(dst, sixteen, base + 2, luma);
                    pixel::set(dst, sixteen, base + 3, a);
                }
            }
            ctx.post_progress(pixel::band_progress(y, height));
        }
        Ok(())
    }
}
