//! shibori-filters: Concrete filters for the shibori-core framework.
//!
//! Each module is one transformation implemented as a
//! [`shibori_core::FilterBody`]: it reads the run's original, writes
//! the destination, posts progress in row bands, and polls the
//! cancellation flag once per band. All filters handle both 8- and
//! 16-bit RGBA buffers.
//!
//! [`sketch::Sketch`] is the composite one -- it chains grayscale,
//! invert, and blur as inline sub-filter stages with disjoint progress
//! slices, then blends in its own body.
//!
//! [`convert`] bridges to the [`image`] crate for decode/encode at the
//! application boundary.

pub mod bcg;
pub mod blur;
pub mod convert;
pub mod grayscale;
pub mod invert;
mod pixel;
pub mod sketch;

pub use bcg::{Bcg, BcgParams};
pub use blur::BoxBlur;
pub use grayscale::Grayscale;
pub use invert::Invert;
pub use sketch::Sketch;
