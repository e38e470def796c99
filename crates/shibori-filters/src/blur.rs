//! Separable box blur.
//!
//! Two passes: rows first (original into destination), then columns in
//! place over the destination — a vertical blur of one column depends on
//! that column alone. The window is truncated at the edges and each
//! output value is the average over the actual window, so borders do not
//! darken. Progress maps the horizontal pass to 0–50 and the vertical
//! pass to 50–100, with cancellation polled once per row or column.

use shibori_core::{FilterBody, FilterContext, FilterError};

use crate::pixel;

/// Blur with a square window of side `2 * radius + 1`.
///
/// Radius 0 copies the input through unchanged. Alpha is blurred along
/// with the color channels so soft edges stay soft.
#[derive(Debug, Clone, Copy)]
pub struct BoxBlur {
    radius: usize,
}

impl BoxBlur {
    #[must_use]
    pub const fn new(radius: u32) -> Self {
        Self {
            radius: radius as usize,
        }
    }
}

impl FilterBody for BoxBlur {
    fn run(&mut self, ctx: &mut FilterContext<'_>) -> Result<(), FilterError> {
        if self.radius == 0 {
            let (original, dest) = ctx.split();
            dest.data_mut().copy_from_slice(original.data());
            ctx.post_progress(100);
            return Ok(());
        }

        let width = ctx.original().width();
        let height = ctx.original().height();
        let sixteen = ctx.original().sixteen_bit();
        let mut line = Vec::with_capacity(width.max(height) as usize);
        let mut blurred = Vec::with_capacity(width.max(height) as usize);

        // Horizontal pass: original rows into destination rows.
        for y in 0..height {
            ctx.ensure_active()?;
            {
                let (original, dest) = ctx.split();
                let (Some(src), Some(dst)) = (original.row(y), dest.row_mut(y)) else {
                    break;
                };
                for c in 0..pixel::CHANNELS {
                    line.clear();
                    for p in 0..width as usize {
                        line.push(pixel::get(src, sixteen, p * pixel::CHANNELS + c));
                    }
                    box_blur_line(&line, self.radius, &mut blurred);
                    for (p, &value) in blurred.iter().enumerate() {
                        pixel::set(dst, sixteen, p * pixel::CHANNELS + c, value);
                    }
                }
            }
            ctx.post_progress(pixel::band_progress(y, height * 2));
        }

        // Vertical pass: each destination column in place.
        for x in 0..width {
            ctx.ensure_active()?;
            {
                let dest = ctx.dest_mut();
                let data = dest.data_mut();
                let stride = width as usize * pixel::CHANNELS;
                for c in 0..pixel::CHANNELS {
                    line.clear();
                    for row in 0..height as usize {
                        let idx = row * stride + x as usize * pixel::CHANNELS + c;
                        line.push(pixel::get(data, sixteen, idx));
                    }
                    box_blur_line(&line, self.radius, &mut blurred);
                    for (row, &value) in blurred.iter().enumerate() {
                        let idx = row * stride + x as usize * pixel::CHANNELS + c;
                        pixel::set(data, sixteen, idx, value);
                    }
                }
            }
            ctx.post_progress(50 + pixel::band_progress(x, width * 2));
        }
        ctx.post_progress(100);
        Ok(())
    }
}

/// Sliding-window average with the window truncated at both ends.
#[allow(clippy::cast_possible_truncation)]
fn box_blur_line(values: &[u32], radius: usize, out: &mut Vec<u32>) {
    out.clear();
    let len = values.len();
    if len == 0 {
        return;
    }

    let tail = radius.min(len - 1);
    let mut sum: u64 = values[..=tail].iter().copied().map(u64::from).sum();
    let mut count = (tail + 1) as u64;

    for x in 0..len {
        out.push((sum / count) as u32);
        if let Some(&incoming) = values.get(x + radius + 1) {
            sum += u64::from(incoming);
            count += 1;
        }
        if x >= radius {
            sum -= u64::from(values[x - radius]);
            count -= 1;
        }
    }
}
