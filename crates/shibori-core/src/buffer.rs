//! Owned RGBA image value consumed and produced by filter tasks.
//!
//! [`ImageBuffer`] is deliberately minimal: a geometry (width, height),
//! a depth flag (8 or 16 bits per channel), an alpha flag, and an owned
//! pixel byte vector. Decoding, encoding, and display live outside this
//! crate — the framework only needs the buffer's shape.
//!
//! Pixels are stored row-major as RGBA quadruples: 4 bytes per pixel at
//! 8-bit depth, 8 bytes per pixel (native-endian `u16` channels) at
//! 16-bit depth. The alpha channel is always present in storage; the
//! alpha flag records whether it is meaningful.

use crate::error::FilterError;

/// An owned RGBA image with 8- or 16-bit channels.
///
/// A buffer with zero width or zero height is *empty* and is never a
/// valid input to a filter run. Allocation is fallible: running out of
/// memory (or overflowing the byte count) surfaces as
/// [`FilterError::OutOfMemory`] instead of aborting the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    width: u32,
    height: u32,
    sixteen_bit: bool,
    alpha: bool,
    data: Vec<u8>,
}

impl ImageBuffer {
    /// Allocate a zeroed buffer with the given geometry and depth.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::OutOfMemory`] if the pixel byte count
    /// overflows `usize` or the allocation fails.
    pub fn try_new(
        width: u32,
        height: u32,
        sixteen_bit: bool,
        alpha: bool,
    ) -> Result<Self, FilterError> {
        let bpp = if sixteen_bit { 8 } else { 4 };
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|px| px.checked_mul(bpp))
            .ok_or(FilterError::OutOfMemory)?;

        let mut data = Vec::new();
        data.try_reserve_exact(len)?;
        data.resize(len, 0);

        Ok(Self {
            width,
            height,
            sixteen_bit,
            alpha,
            data,
        })
    }

    /// Allocate a zeroed buffer with exactly this buffer's geometry,
    /// depth, and alpha flag.
    ///
    /// This is how a task sizes its destination from its original at the
    /// start of every run.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::OutOfMemory`] if the allocation fails.
    pub fn try_like(&self) -> Result<Self, FilterError> {
        Self::try_new(self.width, self.height, self.sixteen_bit, self.alpha)
    }

    /// Clone the buffer through a fallible allocation.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::OutOfMemory`] if the allocation fails.
    pub fn try_clone(&self) -> Result<Self, FilterError> {
        let mut data = Vec::new();
        data.try_reserve_exact(self.data.len())?;
        data.extend_from_slice(&self.data);
        Ok(Self {
            width: self.width,
            height: self.height,
            sixteen_bit: self.sixteen_bit,
            alpha: self.alpha,
            data,
        })
    }

    /// Build a buffer from existing pixel bytes.
    ///
    /// Returns `None` if `data` does not have exactly
    /// `width * height * bytes_per_pixel` bytes.
    #[must_use]
    pub fn from_raw(
        width: u32,
        height: u32,
        sixteen_bit: bool,
        alpha: bool,
        data: Vec<u8>,
    ) -> Option<Self> {
        let bpp: usize = if sixteen_bit { 8 } else { 4 };
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(bpp)?;
        if data.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            sixteen_bit,
            alpha,
            data,
        })
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// `true` when channels are 16-bit (`u16`), `false` when 8-bit.
    #[must_use]
    pub const fn sixteen_bit(&self) -> bool {
        self.sixteen_bit
    }

    /// Whether the alpha channel carries meaningful data.
    #[must_use]
    pub const fn has_alpha(&self) -> bool {
        self.alpha
    }

    /// `true` when the buffer has zero width or zero height.
    ///
    /// Empty buffers are never valid filter input.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Storage bytes per pixel: 4 at 8-bit depth, 8 at 16-bit.
    #[must_use]
    pub const fn bytes_per_pixel(&self) -> usize {
        if self.sixteen_bit { 8 } else { 4 }
    }

    /// Storage bytes per row.
    #[must_use]
    pub const fn row_bytes(&self) -> usize {
        self.width as usize * self.bytes_per_pixel()
    }

    /// `true` when the two buffers share width, height, depth, and alpha.
    #[must_use]
    pub const fn same_geometry(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.sixteen_bit == other.sixteen_bit
            && self.alpha == other.alpha
    }

    /// The raw pixel bytes, row-major RGBA.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable access to the raw pixel bytes.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consume the buffer and return the raw pixel bytes.
    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// One row of pixel bytes, or `None` when `y` is out of range.
    #[must_use]
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let stride = self.row_bytes();
        let start = y as usize * stride;
        self.data.get(start..start + stride)
    }

    /// Mutable access to one row of pixel bytes.
    pub fn row_mut(&mut self, y: u32) -> Option<&mut [u8]> {
        if y >= self.height {
            return None;
        }
        let stride = self.row_bytes();
        let start = y as usize * stride;
        self.data.get_mut(start..start + stride)
    }
}
