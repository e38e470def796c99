//! shibori-core: Threaded filter execution framework (sans-decode).
//!
//! A [`FilterTask`] runs one image transformation through a fixed
//! lifecycle -- `Idle -> Initializing -> Running -> terminal` -- on a
//! dedicated worker thread (or inline, for synchronous callers),
//! emitting `Started` / `Progress` / `Finished` events over a channel.
//! Runs are cooperatively cancellable, restartable from any terminal
//! state, and contain their own faults: allocation failure and body
//! panics surface as a `Finished(Failed)` event, never as a crash.
//!
//! Filters compose: a body can execute sub-filters inline through
//! [`FilterContext::run_stage`], with each stage's local 0-100 progress
//! remapped into an assigned slice of the parent's range and a weak
//! cancel link so a request on the root reaches the deepest stage.
//!
//! This crate has **no image I/O** -- it operates on in-memory
//! [`ImageBuffer`] values. Decoding, encoding, and concrete filters
//! live in `shibori-filters`; command-line plumbing in `shibori-cli`.

pub mod buffer;
pub mod cancel;
pub mod context;
pub mod engine;
pub mod error;
pub mod event;
pub mod progress;
pub mod task;
pub mod worker;

pub use buffer::ImageBuffer;
pub use cancel::CancelToken;
pub use context::FilterContext;
pub use engine::{CommandEngine, CommandFilter, EngineControl, EngineError};
pub use error::{FilterError, Outcome};
pub use event::{EventReceiver, EventSender, FilterEvent};
pub use progress::ProgressRange;
pub use task::{FilterBody, FilterState, FilterTask};
