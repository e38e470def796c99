//! The filter task: lifecycle, worker execution, and cancellation.
//!
//! A [`FilterTask`] binds a transformation body to a private copy of its
//! input image and runs it through the cycle
//! `Idle → Initializing → Running → {Completed | Cancelled | Failed}`,
//! emitting [`FilterEvent`]s along the way. Root tasks run on one
//! dedicated worker thread each ([`start`](FilterTask::start)) or
//! inline in the caller's thread ([`start_direct`](FilterTask::start_direct));
//! sub-filters never get a thread of their own — they execute inside
//! their parent's body via
//! [`FilterContext::run_stage`](crate::context::FilterContext::run_stage).
//!
//! Faults inside the body are contained at the run boundary: allocation
//! failure arrives as [`FilterError::OutOfMemory`] through the body's
//! `Result`, and a panicking body is caught and reported as a
//! `Finished(Failed)` event rather than tearing down the worker thread.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, AtomicU8, Ordering};

use crate::buffer::ImageBuffer;
use crate::cancel::CancelToken;
use crate::context::FilterContext;
use crate::error::{FilterError, Outcome};
use crate::event::{EventReceiver, EventSender, FilterEvent};
use crate::worker::Worker;

/// The transformation body of a filter.
///
/// `run` reads the original image, writes the destination, posts
/// progress through the context, and polls the cancellation flag to
/// exit early and cooperatively. `cleanup` is invoked by
/// [`FilterTask::cancel`] to release transient resources; the default
/// does nothing.
///
/// Plain closures of the right shape are bodies too, via the blanket
/// impl — convenient for tests and one-off filters.
pub trait FilterBody: Send {
    /// Execute the transformation.
    ///
    /// # Errors
    ///
    /// Returns a [`FilterError`] to end the run unsuccessfully;
    /// [`FilterError::Cancelled`] is reported as a cancellation, every
    /// other error as a failure.
    fn run(&mut self, ctx: &mut FilterContext<'_>) -> Result<(), FilterError>;

    /// Release transient resources after a cancellation. Called at most
    /// once per start cycle.
    fn cleanup(&mut self) {}
}

impl<F> FilterBody for F
where
    F: FnMut(&mut FilterContext<'_>) -> Result<(), FilterError> + Send,
{
    fn run(&mut self, ctx: &mut FilterContext<'_>) -> Result<(), FilterError> {
        self(ctx)
    }
}

impl FilterBody for Box<dyn FilterBody> {
    fn run(&mut self, ctx: &mut FilterContext<'_>) -> Result<(), FilterError> {
        (**self).run(ctx)
    }

    fn cleanup(&mut self) {
        (**self).cleanup();
    }
}

/// Lifecycle states of a [`FilterTask`].
///
/// `Completed`, `Cancelled`, and `Failed` are terminal; a new start
/// request leaves them through `Initializing` again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    /// Constructed, never started.
    Idle,
    /// A start request was accepted; the destination is being sized.
    Initializing,
    /// The transformation body is executing.
    Running,
    /// The body finished and cancellation was never requested.
    Completed,
    /// Cancellation was requested during the run.
    Cancelled,
    /// Invalid input, allocation failure, a body error, or a contained
    /// fault ended the run.
    Failed,
}

/// Atomic storage for [`FilterState`], shared with the worker thread.
#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    const IDLE: u8 = 0;
    const INITIALIZING: u8 = 1;
    const RUNNING: u8 = 2;
    const COMPLETED: u8 = 3;
    const CANCELLED: u8 = 4;
    const FAILED: u8 = 5;

    const fn new() -> Self {
        Self(AtomicU8::new(Self::IDLE))
    }

    fn set(&self, state: FilterState) {
        let raw = match state {
            FilterState::Idle => Self::IDLE,
            FilterState::Initializing => Self::INITIALIZING,
            FilterState::Running => Self::RUNNING,
            FilterState::Completed => Self::COMPLETED,
            FilterState::Cancelled => Self::CANCELLED,
            FilterState::Failed => Self::FAILED,
        };
        self.0.store(raw, Ordering::Release);
    }

    fn get(&self) -> FilterState {
        match self.0.load(Ordering::Acquire) {
            Self::INITIALIZING => FilterState::Initializing,
            Self::RUNNING => FilterState::Running,
            Self::COMPLETED => FilterState::Completed,
            Self::CANCELLED => FilterState::Cancelled,
            Self::FAILED => FilterState::Failed,
            _ => FilterState::Idle,
        }
    }
}

/// What a finished worker thread hands back to the task.
struct RunArtifacts {
    body: Box<dyn FilterBody>,
    destination: Option<ImageBuffer>,
}

/// One execution of a transformation over an image.
///
/// The task owns a private copy of the original image, decoupling it
/// from caller mutation. After a `Finished(Completed)` event the
/// destination is available through [`destination`](Self::destination)
/// once the worker has been joined (via [`wait`](Self::wait), `cancel`,
/// or a completed `start_direct`).
///
/// Dropping a task cancels it first: the flag is set (and propagated
/// through any attached sub-filter token), the worker is joined, and
/// the body's cleanup hook runs.
pub struct FilterTask {
    name: String,
    original: Arc<ImageBuffer>,
    body: Option<Box<dyn FilterBody>>,
    destination: Option<ImageBuffer>,
    cancel: Arc<CancelToken>,
    state: Arc<StateCell>,
    last_progress: Arc<AtomicI32>,
    events: EventSender,
    worker: Option<Worker<RunArtifacts>>,
    cleaned_up: bool,
}

impl FilterTask {
    /// Create a task from a name, an input image, a body, and the
    /// sending half of an event channel.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        original: ImageBuffer,
        body: impl FilterBody + 'static,
        events: EventSender,
    ) -> Self {
        Self {
            name: name.into(),
            original: Arc::new(original),
            body: Some(Box::new(body)),
            destination: None,
            cancel: Arc::new(CancelToken::new()),
            state: Arc::new(StateCell::new()),
            last_progress: Arc::new(AtomicI32::new(-1)),
            events,
            worker: None,
            cleaned_up: false,
        }
    }

    /// Create a task together with the receiving half of its event
    /// channel.
    #[must_use]
    pub fn with_channel(
        name: impl Into<String>,
        original: ImageBuffer,
        body: impl FilterBody + 'static,
    ) -> (Self, EventReceiver) {
        let (tx, rx) = std::sync::mpsc::channel();
        (Self::new(name, original, body, tx), rx)
    }

    /// The task's human-readable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The task's private copy of the input image.
    #[must_use]
    pub fn original(&self) -> &ImageBuffer {
        &self.original
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> FilterState {
        self.state.get()
    }

    /// Start the transformation on a dedicated worker thread.
    ///
    /// An empty original fails synchronously: the task moves straight to
    /// [`FilterState::Failed`] and emits `Finished(Failed)` without ever
    /// emitting `Started` or spawning a thread. A start request while a
    /// previous run is still executing is ignored.
    pub fn start(&mut self) {
        self.reap();
        if self.worker.is_some() {
            log::warn!("{}: start requested while already running", self.name);
            return;
        }
        if !self.accept_start() {
            return;
        }
        let Some(body) = self.body.take() else {
            log::warn!("{}: no body available to run", self.name);
            return;
        };

        let original = Arc::clone(&self.original);
        let cancel = Arc::clone(&self.cancel);
        let state = Arc::clone(&self.state);
        let last = Arc::clone(&self.last_progress);
        let events = self.events.clone();
        let job = move || {
            let mut body = body;
            let destination = execute(
                &original,
                body.as_mut(),
                &cancel,
                &events,
                &state,
                &last,
            );
            RunArtifacts { body, destination }
        };

        match Worker::spawn(&format!("filter-{}", self.name), job) {
            Ok(worker) => self.worker = Some(worker),
            Err(err) => {
                // The job (and the body with it) is consumed by the
                // failed spawn; all we can do is report the failure.
                log::error!("{}: could not spawn worker thread: {err}", self.name);
                self.state.set(FilterState::Failed);
                let _ = self.events.send(FilterEvent::Finished(Outcome::Failed));
            }
        }
    }

    /// Run the transformation synchronously in the calling thread.
    ///
    /// Same cycle and events as [`start`](Self::start), but the call
    /// blocks for the duration of the run and the destination is
    /// available immediately afterwards.
    pub fn start_direct(&mut self) {
        self.reap();
        if self.worker.is_some() {
            log::warn!("{}: direct start requested while already running", self.name);
            return;
        }
        if !self.accept_start() {
            return;
        }
        let Some(mut body) = self.body.take() else {
            log::warn!("{}: no body available to run", self.name);
            return;
        };

        self.destination = execute(
            &self.original,
            body.as_mut(),
            &self.cancel,
            &self.events,
            &self.state,
            &self.last_progress,
        );
        self.body = Some(body);
    }

    /// Request cancellation and block until the run has fully exited.
    ///
    /// Sets the cancellation flag — recursively through any attached
    /// sub-filter token, before this call returns — joins the worker
    /// thread, then invokes the body's cleanup hook. The hook runs at
    /// most once per start cycle, and runs even if the task never
    /// actually started.
    pub fn cancel(&mut self) {
        self.cancel.request();
        self.reap_blocking();
        if !self.cleaned_up {
            if let Some(body) = self.body.as_mut() {
                body.cleanup();
            }
            self.cleaned_up = true;
        }
    }

    /// Block until the current run (if any) has finished.
    pub fn wait(&mut self) {
        self.reap_blocking();
    }

    /// The destination image of the last completed run, if the worker
    /// has been joined.
    #[must_use]
    pub fn destination(&self) -> Option<&ImageBuffer> {
        self.destination.as_ref()
    }

    /// Take ownership of the destination image of the last completed
    /// run.
    pub fn take_destination(&mut self) -> Option<ImageBuffer> {
        self.destination.take()
    }

    /// Common start preconditions; emits the synchronous failure for
    /// empty input.
    fn accept_start(&mut self) -> bool {
        if self.original.is_empty() {
            log::debug!("{}: no valid image data", self.name);
            self.state.set(FilterState::Failed);
            let _ = self.events.send(FilterEvent::Finished(Outcome::Failed));
            return false;
        }
        self.cleaned_up = false;
        self.destination = None;
        true
    }

    /// Absorb a worker that has already exited, without blocking.
    fn reap(&mut self) {
        if self.worker.as_ref().is_some_and(Worker::is_finished) {
            self.reap_blocking();
        }
    }

    /// Join the worker (if any) and absorb its artifacts.
    fn reap_blocking(&mut self) {
        if let Some(worker) = self.worker.take() {
            if let Some(artifacts) = worker.join() {
                self.body = Some(artifacts.body);
                self.destination = artifacts.destination;
            } else {
                // The run routine contains body faults, so an abnormal
                // worker exit means the framework itself misbehaved.
                self.state.set(FilterState::Failed);
            }
        }
    }
}

impl Drop for FilterTask {
    fn drop(&mut self) {
        if self.worker.is_some() || !self.cleaned_up {
            self.cancel();
        }
    }
}

/// One full run cycle: size the destination, emit `Started`, run the
/// body with fault containment, emit exactly one `Finished`.
///
/// Returns the destination only for a completed run.
fn execute(
    original: &ImageBuffer,
    body: &mut dyn FilterBody,
    cancel: &Arc<CancelToken>,
    events: &EventSender,
    state: &StateCell,
    last: &AtomicI32,
) -> Option<ImageBuffer> {
    state.set(FilterState::Initializing);
    let mut dest = match original.try_like() {
        Ok(dest) => dest,
        Err(err) => {
            log::error!("destination allocation failed: {err}");
            state.set(FilterState::Failed);
            let _ = events.send(FilterEvent::Finished(Outcome::Failed));
            return None;
        }
    };

    state.set(FilterState::Running);
    let _ = events.send(FilterEvent::Started);
    cancel.reset();
    last.store(-1, Ordering::Relaxed);

    let result = catch_unwind(AssertUnwindSafe(|| {
        let mut ctx = FilterContext::root(original, &mut dest, cancel, events, last);
        body.run(&mut ctx)
    }));

    let outcome = match result {
        Ok(Ok(())) => {
            if cancel.is_cancelled() {
                Outcome::Cancelled
            } else {
                Outcome::Completed
            }
        }
        Ok(Err(FilterError::Cancelled)) => Outcome::Cancelled,
        Ok(Err(err)) => {
            log::error!("filter body failed: {err}");
            Outcome::Failed
        }
        Err(_) => {
            log::error!("filter body fault contained at run boundary");
            Outcome::Failed
        }
    };

    state.set(match outcome {
        Outcome::Completed => FilterState::Completed,
        Outcome::Cancelled => FilterState::Cancelled,
        Outcome::Failed => FilterState::Failed,
    });
    let _ = events.send(FilterEvent::Finished(outcome));

    outcome.succeeded().then_some(dest)
}
