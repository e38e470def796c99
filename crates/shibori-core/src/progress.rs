//! Progress sub-range remapping for composed filters.
//!
//! A multi-stage filter assigns each stage a disjoint slice of its own
//! 0–100 range. The stage's body reports local 0–100 progress without
//! knowing its place in the pipeline; [`ProgressRange::remap`] folds the
//! local value into the assigned slice before it is forwarded to the
//! parent, level by level up to the root task.

/// The `[begin, begin + span]` slice of a parent's progress range that a
/// sub-filter's local 0–100 progress is mapped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressRange {
    begin: u32,
    span: u32,
}

impl ProgressRange {
    /// Build a range from its endpoints.
    ///
    /// `end` values below `begin` produce an empty span, so a reversed
    /// range never maps progress backwards.
    #[must_use]
    pub const fn new(begin: u32, end: u32) -> Self {
        Self {
            begin,
            span: end.saturating_sub(begin),
        }
    }

    /// The full 0–100 range of a root task.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            begin: 0,
            span: 100,
        }
    }

    /// Lower bound of the range.
    #[must_use]
    pub const fn begin(self) -> u32 {
        self.begin
    }

    /// Width of the range.
    #[must_use]
    pub const fn span(self) -> u32 {
        self.span
    }

    /// Map a local 0–100 value into this range.
    ///
    /// Computes `begin + local * span / 100` with integer truncation
    /// toward zero. Local values above 100 are clamped first so a sloppy
    /// body cannot push the parent past the range's end.
    #[must_use]
    pub const fn remap(self, local: u8) -> u8 {
        let local = if local > 100 { 100 } else { local as u32 };
        let mapped = self.begin + local * self.span / 100;
        if mapped > 100 { 100 } else { mapped as u8 }
    }
}

impl Default for ProgressRange {
    fn default() -> Self {
        Self::full()
    }
}
