//! Pencil-sketch effect, built as a composition of sub-filters.
//!
//! The classic dodge-blend sketch: desaturate, invert, blur the
//! inverted copy, then color-dodge the blurred copy over the grayscale
//! base. The first three steps run as inline sub-filter stages with
//! disjoint progress slices (0–30, 30–40, 40–80); the final blend runs
//! in this body over 80–100. Cancelling the owning task reaches
//! whichever stage is active through the stage's attached cancel token.

use shibori_core::{FilterBody, FilterContext, FilterError, ProgressRange};

use crate::blur::BoxBlur;
use crate::grayscale::Grayscale;
use crate::invert::Invert;
use crate::pixel;

/// Dodge-blend pencil sketch.
#[derive(Debug, Clone, Copy)]
pub struct Sketch {
    blur_radius: u32,
}

impl Sketch {
    #[must_use]
    pub const fn new(blur_radius: u32) -> Self {
        Self { blur_radius }
    }
}

impl FilterBody for Sketch {
    fn run(&mut self, ctx: &mut FilterContext<'_>) -> Result<(), FilterError> {
        let input = ctx.original().try_clone()?;

        let gray = ctx.run_stage("grayscale", &input, ProgressRange::new(0, 30), &mut Grayscale)?;
        let inverted = ctx.run_stage("invert", &gray, ProgressRange::new(30, 40), &mut Invert)?;
        let blurred = ctx.run_stage(
            "blur",
            &inverted,
            ProgressRange::new(40, 80),
            &mut BoxBlur::new(self.blur_radius),
        )?;

        // Color dodge: base / (1 - overlay), in channel scale.
        let sixteen = gray.sixteen_bit();
        let max = pixel::max_value(sixteen);
        let height = gray.height();
        let width = gray.width() as usize;
        for y in 0..height {
            ctx.ensure_active()?;
            {
                let dest = ctx.dest_mut();
                let (Some(base), Some(overlay), Some(dst)) =
                    (gray.row(y), blurred.row(y), dest.row_mut(y))
                else {
                    break;
                };
                for p in 0..width {
                    let idx = p * pixel::CHANNELS;
                    for c in 0..3 {
                        let b = pixel::get(base, sixteen, idx + c);
                        let o = pixel::get(overlay, sixteen, idx + c);
                        let dodged = if o >= max {
                            max
                        } else {
                            let scaled = u64::from(b) * u64::from(max) / u64::from(max - o);
                            u32::try_from(scaled.min(u64::from(max))).unwrap_or(max)
                        };
                        pixel::set(dst, sixteen, idx + c, dodged);
                    }
                    let alpha = pixel::get(base, sixteen, idx + 3);
                    pixel::set(dst, sixteen, idx + 3, alpha);
                }
            }
            ctx.post_progress(80 + pixel::band_progress(y, height * 5));
        }
        ctx.post_progress(100);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::cast_possible_truncation)]
mod tests {
    use super::*;
    use crate::testutil::apply;
    use shibori_core::{FilterEvent, FilterState, FilterTask, ImageBuffer, Outcome};

    #[test]
    fn uniform_mid_gray_dodges_to_white() {
        // Gray 128 inverts to 127; blur keeps it 127; dodge:
        // 128 * 255 / (255 - 127) = 255.
        let mut original = ImageBuffer::try_new(4, 4, false, false).unwrap();
        for pixel in original.data_mut().chunks_exact_mut(4) {
            pixel.copy_from_slice(&[128, 128, 128, 255]);
        }

        let dest = apply(Sketch::new(1), original);
        for pixel in dest.data().chunks_exact(4) {
            assert_eq!(pixel, &[255, 255, 255, 255]);
        }
    }

    #[test]
    fn saturated_overlay_dodges_to_white() {
        // Black inverts to a full-scale overlay, which always dodges to
        // white regardless of the base value.
        let original = ImageBuffer::try_new(4, 4, false, false).unwrap();
        let dest = apply(Sketch::new(1), original);
        for pixel in dest.data().chunks_exact(4) {
            assert_eq!(&pixel[..3], &[255, 255, 255], "overlay saturation dodges to white");
            assert_eq!(pixel[3], 0);
        }
    }

    #[test]
    fn progress_stays_within_each_stage_slice() {
        let mut original = ImageBuffer::try_new(16, 16, false, false).unwrap();
        for (i, byte) in original.data_mut().iter_mut().enumerate() {
            *byte = (i % 251) as u8;
        }
        let (mut task, rx) = FilterTask::with_channel("sketch", original, Sketch::new(2));

        task.start_direct();
        assert_eq!(task.state(), FilterState::Completed);

        let events: Vec<FilterEvent> = rx.try_iter().collect();
        assert_eq!(events.first(), Some(&FilterEvent::Started));
        assert_eq!(events.last(), Some(&FilterEvent::Finished(Outcome::Completed)));

        let progress: Vec<u8> = events
            .iter()
            .filter_map(|event| match event {
                FilterEvent::Progress(value) => Some(*value),
                _ => None,
            })
            .collect();
        assert!(progress.windows(2).all(|w| w[0] < w[1]), "strictly increasing: {progress:?}");
        assert_eq!(progress.last(), Some(&100));
        // The grayscale stage's local progress lands inside its 0–30 slice.
        assert!(progress.first().is_some_and(|&first| first <= 30), "{progress:?}");
    }

    #[test]
    fn sixteen_bit_input_is_supported() {
        let mut original = ImageBuffer::try_new(4, 4, true, false).unwrap();
        let mut bytes = Vec::new();
        for _ in 0..16 {
            for value in [30000u16, 30000, 30000, 65535] {
                bytes.extend_from_slice(&value.to_ne_bytes());
            }
        }
        original.data_mut().copy_from_slice(&bytes);

        let dest = apply(Sketch::new(1), original);
        assert!(dest.sixteen_bit());
        let red = u16::from_ne_bytes([dest.data()[0], dest.data()[1]]);
        assert!(red > 30000, "dodge brightens, got {red}");
    }
}
