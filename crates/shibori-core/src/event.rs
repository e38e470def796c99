//! Notifications emitted by a running filter task.
//!
//! Events flow over a standard [`std::sync::mpsc`] channel supplied at
//! task construction. Within one start cycle the ordering is fixed:
//! [`FilterEvent::Started`] precedes every [`FilterEvent::Progress`],
//! and exactly one [`FilterEvent::Finished`] closes the cycle. A task
//! rejected for invalid input emits only `Finished(Failed)`,
//! synchronously, before `start` returns.
//!
//! Only root tasks emit events. A sub-filter's progress is routed to its
//! parent (see [`crate::context::FilterContext::run_stage`]) and its
//! failures are returned to the parent body as plain `Result` values.

use serde::{Deserialize, Serialize};

use crate::error::Outcome;

/// One externally observable event from a filter task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterEvent {
    /// The transformation body is about to run.
    Started,
    /// Overall progress in percent, 0–100. Values are strictly
    /// increasing within one run; duplicates and regressions are
    /// suppressed at the source.
    Progress(u8),
    /// The start cycle ended. Carries the three-way outcome.
    Finished(Outcome),
}

impl FilterEvent {
    /// `true` for the terminal event of a start cycle.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished(_))
    }
}

/// Sending half of a task's event channel.
pub type EventSender = std::sync::mpsc::Sender<FilterEvent>;

/// Receiving half of a task's event channel.
pub type EventReceiver = std::sync::mpsc::Receiver<FilterEvent>;
