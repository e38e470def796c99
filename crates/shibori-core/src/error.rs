//! Error taxonomy and run outcomes for filter tasks.

use serde::{Deserialize, Serialize};

/// Errors a filter run can produce.
///
/// The taxonomy is deliberately small: invalid input (an empty image),
/// resource exhaustion (contained at the task boundary, never a crash),
/// cooperative cancellation, and failures reported by an external
/// command engine. Logic errors in a transformation body are not modeled
/// here — they are caught at the run boundary and reported as a
/// [`Outcome::Failed`] finish.
#[derive(Debug, thiserror::Error, Serialize, Deserialize)]
pub enum FilterError {
    /// The input image has zero width or zero height.
    #[error("input image has no pixels")]
    EmptyInput,

    /// An image allocation failed during the run.
    #[error("image allocation failed")]
    OutOfMemory,

    /// The run observed its cancellation flag and stopped early.
    #[error("filter run was cancelled")]
    Cancelled,

    /// An external command engine reported a failure.
    #[error("external engine failed: {0}")]
    Engine(String),
}

impl From<std::collections::TryReserveError> for FilterError {
    fn from(_: std::collections::TryReserveError) -> Self {
        Self::OutOfMemory
    }
}

/// How a start cycle ended.
///
/// The finished notification carries this three-way outcome so listeners
/// can distinguish a user cancellation from a genuine failure. Callers
/// that only care about the old boolean signal can use
/// [`succeeded`](Self::succeeded).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// The body ran to completion and cancellation was never requested.
    Completed,
    /// Cancellation was requested during the run.
    Cancelled,
    /// The run failed: invalid input, allocation failure, an engine
    /// error, or a contained fault in the body.
    Failed,
}

impl Outcome {
    /// `true` only for [`Outcome::Completed`].
    #[must_use]
    pub const fn succeeded(self) -> bool {
        matches!(self, Self::Completed)
    }
}
