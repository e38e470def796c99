//! The execution context handed to a transformation body.
//!
//! [`FilterContext`] is a body's entire view of its run: the original
//! image, the destination it writes, the progress reporting entry point,
//! and the cancellation flag it is expected to poll. It is also where
//! filter composition lives — [`run_stage`](FilterContext::run_stage)
//! executes a sub-filter synchronously inside the current execution
//! context, with its local 0–100 progress remapped into an assigned
//! slice of the parent's range.
//!
//! Progress forwarding is recursive: each nesting level applies its own
//! integer remap before handing the value to its parent, and only the
//! root level emits an external event. The root suppresses any value
//! that does not exceed the last one emitted in this run, so listeners
//! observe a strictly increasing, duplicate-free sequence.

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use crate::buffer::ImageBuffer;
use crate::cancel::CancelToken;
use crate::error::FilterError;
use crate::event::{EventSender, FilterEvent};
use crate::progress::ProgressRange;
use crate::task::FilterBody;

/// A body's view of one filter run.
pub struct FilterContext<'a> {
    original: &'a ImageBuffer,
    dest: &'a mut ImageBuffer,
    cancel: &'a Arc<CancelToken>,
    progress: ProgressPath<'a>,
}

/// Where posted progress goes: out the root task's event channel, or up
/// one level through a sub-range remap.
enum ProgressPath<'a> {
    Root {
        events: &'a EventSender,
        /// Last value emitted in this run, `-1` before the first one.
        last: &'a AtomicI32,
    },
    Stage {
        parent: &'a ProgressPath<'a>,
        range: ProgressRange,
    },
}

impl ProgressPath<'_> {
    fn post(&self, value: u8) {
        match self {
            Self::Root { events, last } => {
                let value = value.min(100);
                if i32::from(value) > last.load(Ordering::Relaxed) {
                    last.store(i32::from(value), Ordering::Relaxed);
                    let _ = events.send(FilterEvent::Progress(value));
                }
            }
            Self::Stage { parent, range } => parent.post(range.remap(value)),
        }
    }
}

/// Detaches a stage's cancel token from its parent on every exit path,
/// so the parent never keeps a link to a finished stage.
struct DetachGuard<'a> {
    parent: &'a CancelToken,
}

impl Drop for DetachGuard<'_> {
    fn drop(&mut self) {
        self.parent.detach_sub();
    }
}

impl<'a> FilterContext<'a> {
    pub(crate) fn root(
        original: &'a ImageBuffer,
        dest: &'a mut ImageBuffer,
        cancel: &'a Arc<CancelToken>,
        events: &'a EventSender,
        last: &'a AtomicI32,
    ) -> Self {
        Self {
            original,
            dest,
            cancel,
            progress: ProgressPath::Root { events, last },
        }
    }

    /// The input image. Owned by the task; never mutated during a run.
    #[must_use]
    pub fn original(&self) -> &ImageBuffer {
        self.original
    }

    /// The destination image, sized to the original's geometry before
    /// the body runs.
    #[must_use]
    pub fn dest(&self) -> &ImageBuffer {
        self.dest
    }

    /// Mutable access to the destination image.
    pub fn dest_mut(&mut self) -> &mut ImageBuffer {
        self.dest
    }

    /// Borrow the original and the destination at the same time.
    ///
    /// Filter loops read source rows and write destination rows in the
    /// same pass; this hands out both without aliasing the context.
    pub fn split(&mut self) -> (&ImageBuffer, &mut ImageBuffer) {
        (self.original, self.dest)
    }

    /// Report local progress in percent (0–100).
    ///
    /// In a sub-filter this is remapped into the stage's assigned range
    /// and forwarded to the parent; at the root it becomes an external
    /// [`FilterEvent::Progress`] unless the value does not exceed the
    /// last one emitted.
    pub fn post_progress(&self, percent: u8) {
        self.progress.post(percent);
    }

    /// Whether cancellation has been requested for this run.
    ///
    /// Bodies must poll this periodically and return early when it turns
    /// `true`; the framework never interrupts work in progress.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Bail out with [`FilterError::Cancelled`] if cancellation has been
    /// requested.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::Cancelled`] when the flag is set.
    pub fn ensure_active(&self) -> Result<(), FilterError> {
        if self.is_cancelled() {
            Err(FilterError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Run a sub-filter synchronously inside this execution context.
    ///
    /// No new thread is spawned: the stage executes right here, as part
    /// of the current body. The stage gets its own destination (sized to
    /// `input`'s geometry) and its own cancel token, which is attached
    /// to this run's token for the duration of the stage — a
    /// cancellation request on the root reaches the stage before the
    /// root's wait-for-exit returns. The token is detached again on
    /// every exit path.
    ///
    /// Progress posted by the stage's body is remapped into `range` and
    /// forwarded upward; the stage itself emits no external events.
    ///
    /// Stage failures are returned to the calling body, which decides
    /// how they affect its own outcome — the framework does not fold
    /// them into the root's finished signal automatically.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::EmptyInput`] if `input` has no pixels,
    /// [`FilterError::OutOfMemory`] if the stage destination cannot be
    /// allocated, [`FilterError::Cancelled`] if the stage was cancelled,
    /// or whatever error the stage body produced.
    pub fn run_stage(
        &mut self,
        name: &str,
        input: &ImageBuffer,
        range: ProgressRange,
        body: &mut dyn FilterBody,
    ) -> Result<ImageBuffer, FilterError> {
        if input.is_empty() {
            log::debug!("{name}: stage input has no pixels");
            return Err(FilterError::EmptyInput);
        }

        let mut dest = input.try_like()?;
        let sub = Arc::new(CancelToken::new());
        self.cancel.attach_sub(&sub);
        let _detach = DetachGuard {
            parent: self.cancel,
        };

        log::trace!("{name}: running stage over {}..{}", range.begin(), range.begin() + range.span());
        let result = {
            let mut ctx = FilterContext {
                original: input,
                dest: &mut dest,
                cancel: &sub,
                progress: ProgressPath::Stage {
                    parent: &self.progress,
                    range,
                },
            };
            body.run(&mut ctx)
        };
        result?;

        if sub.is_cancelled() {
            return Err(FilterError::Cancelled);
        }
        Ok(dest)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    struct Harness {
        original: ImageBuffer,
        dest: ImageBuffer,
        cancel: Arc<CancelToken>,
        events: EventSender,
        last: AtomicI32,
    }

    impl Harness {
        fn new() -> (Self, mpsc::Receiver<FilterEvent>) {
            let (events, rx) = mpsc::channel();
            let harness = Self {
                original: ImageBuffer::try_new(4, 4, false, false).unwrap(),
                dest: ImageBuffer::try_new(4, 4, false, false).unwrap(),
                cancel: Arc::new(CancelToken::new()),
                events,
                last: AtomicI32::new(-1),
            };
            (harness, rx)
        }

        fn ctx(&mut self) -> FilterContext<'_> {
            FilterContext::root(
                &self.original,
                &mut self.dest,
                &self.cancel,
                &self.events,
                &self.last,
            )
        }
    }

    fn drain(rx: &mpsc::Receiver<FilterEvent>) -> Vec<FilterEvent> {
        rx.try_iter().collect()
    }

    #[test]
    fn root_progress_suppresses_duplicates_and_regressions() {
        let (mut harness, rx) = Harness::new();
        let ctx = harness.ctx();
        for value in [0, 25, 25, 10, 50, 100] {
            ctx.post_progress(value);
        }
        drop(ctx);

        let observed = drain(&rx);
        assert_eq!(
            observed,
            vec![
                FilterEvent::Progress(0),
                FilterEvent::Progress(25),
                FilterEvent::Progress(50),
                FilterEvent::Progress(100),
            ],
        );
    }

    #[test]
    fn stage_progress_is_remapped_into_upper_slice() {
        let (mut harness, rx) = Harness::new();
        let mut ctx = harness.ctx();
        let input = ctx.original().clone();

        let mut body = |stage: &mut FilterContext<'_>| -> Result<(), FilterError> {
            stage.post_progress(50);
            Ok(())
        };
        ctx.run_stage("upper", &input, ProgressRange::new(40, 100), &mut body)
            .unwrap();
        drop(ctx);

        assert_eq!(drain(&rx), vec![FilterEvent::Progress(70)]);
    }

    #[test]
    fn stage_emits_no_started_or_finished_events() {
        let (mut harness, rx) = Harness::new();
        let mut ctx = harness.ctx();
        let input = ctx.original().clone();

        let mut body = |stage: &mut FilterContext<'_>| -> Result<(), FilterError> {
            stage.post_progress(100);
            Ok(())
        };
        ctx.run_stage("half", &input, ProgressRange::new(0, 50), &mut body)
            .unwrap();
        drop(ctx);

        // Only the remapped progress value; the stage fires no
        // Started/Finished of its own.
        assert_eq!(drain(&rx), vec![FilterEvent::Progress(50)]);
    }

    #[test]
    fn nested_stages_truncate_at_every_level() {
        let (mut harness, rx) = Harness::new();
        let mut ctx = harness.ctx();
        let input = ctx.original().clone();

        let mut outer = |stage: &mut FilterContext<'_>| -> Result<(), FilterError> {
            let inner_input = stage.original().clone();
            let mut inner = |leaf: &mut FilterContext<'_>| -> Result<(), FilterError> {
                leaf.post_progress(33);
                Ok(())
            };
            stage
                .run_stage("inner", &inner_input, ProgressRange::new(50, 100), &mut inner)
                .map(drop)
        };
        ctx.run_stage("outer", &input, ProgressRange::new(0, 50), &mut outer)
            .unwrap();
        drop(ctx);

        // Inner: 50 + 33*50/100 = 66. Outer: 0 + 66*50/100 = 33.
        assert_eq!(drain(&rx), vec![FilterEvent::Progress(33)]);
    }

    #[test]
    fn stage_destination_matches_input_geometry() {
        let (mut harness, _rx) = Harness::new();
        let mut ctx = harness.ctx();
        let input = ImageBuffer::try_new(7, 3, true, true).unwrap();

        let mut body = |_: &mut FilterContext<'_>| -> Result<(), FilterError> { Ok(()) };
        let dest = ctx
            .run_stage("sized", &input, ProgressRange::full(), &mut body)
            .unwrap();
        assert!(dest.same_geometry(&input));
    }

    #[test]
    fn stage_with_empty_input_fails() {
        let (mut harness, _rx) = Harness::new();
        let mut ctx = harness.ctx();
        let empty = ImageBuffer::try_new(0, 5, false, false).unwrap();

        let mut body = |_: &mut FilterContext<'_>| -> Result<(), FilterError> { Ok(()) };
        let result = ctx.run_stage("empty", &empty, ProgressRange::full(), &mut body);
        assert!(matches!(result, Err(FilterError::EmptyInput)));
    }

    #[test]
    fn cancelled_stage_reports_cancelled() {
        let (mut harness, _rx) = Harness::new();
        let cancel = Arc::clone(&harness.cancel);
        let mut ctx = harness.ctx();
        let input = ctx.original().clone();

        let mut body = move |stage: &mut FilterContext<'_>| -> Result<(), FilterError> {
            // Request cancellation mid-stage; propagation reaches the
            // stage's own token through the attached link.
            cancel.request();
            assert!(stage.is_cancelled());
            Ok(())
        };
        let result = ctx.run_stage("stop", &input, ProgressRange::full(), &mut body);
        assert!(matches!(result, Err(FilterError::Cancelled)));
    }

    #[test]
    fn stage_token_detaches_on_success_and_on_error() {
        let (mut harness, _rx) = Harness::new();
        let cancel = Arc::clone(&harness.cancel);
        let mut ctx = harness.ctx();
        let input = ctx.original().clone();

        let mut ok_body = |_: &mut FilterContext<'_>| -> Result<(), FilterError> { Ok(()) };
        ctx.run_stage("fine", &input, ProgressRange::full(), &mut ok_body)
            .unwrap();
        assert!(!cancel.has_sub());

        let mut err_body = |_: &mut FilterContext<'_>| -> Result<(), FilterError> { Err(FilterError::OutOfMemory) };
        let result = ctx.run_stage("oom", &input, ProgressRange::full(), &mut err_body);
        assert!(matches!(result, Err(FilterError::OutOfMemory)));
        assert!(!cancel.has_sub());
    }
}
