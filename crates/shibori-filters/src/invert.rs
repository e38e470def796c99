//! Channel inversion (photographic negative).

use shibori_core::{FilterBody, FilterContext, FilterError};

use crate::pixel;

/// Invert R/G/B against the depth's full scale, preserving alpha.
#[derive(Debug, Default, Clone, Copy)]
pub struct Invert;

impl FilterBody for Invert {
    fn run(&mut self, ctx: &mut FilterContext<'_>) -> Result<(), FilterError> {
        let height = ctx.original().height();
        for y in 0..height {
            ctx.ensure_active()?;
            {
                let (original, dest) = ctx.split();
                let sixteen = original.sixteen_bit();
                let max = pixel::max_value(sixteen);
                let width = original.width() as usize;
                let (Some(src), Some(dst)) = (original.row(y), dest.row_mut(y)) else {
                    break;
                };
                for p in 0..width {
                    let base = p * pixel::CHANNELS;
                    for c in 0..3 {
                        let value = pixel::get(src, sixteen, base + c);
                        pixel::set(dst, sixteen, base + c, max - value);
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
