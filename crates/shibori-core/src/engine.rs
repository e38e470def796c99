//! Bridge between filter tasks and external command engines.
//!
//! Some transformations are not written as native bodies but delegated
//! to an embedded processing engine driven by a textual command string.
//! The engine side speaks its own dialect — floating-point progress,
//! a polled stop flag, failures as opaque messages — and this module
//! adapts that dialect to the task framework: [`EngineControl`] carries
//! progress and cancellation across the boundary, and [`CommandFilter`]
//! wraps one engine invocation as an ordinary [`FilterBody`], so an
//! engine-backed filter runs, cancels, and reports exactly like a
//! native one.

use crate::buffer::ImageBuffer;
use crate::context::FilterContext;
use crate::error::FilterError;
use crate::task::FilterBody;

/// Failures reported from the engine side of the bridge.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine rejected or failed to execute the command.
    #[error("{0}")]
    Command(String),

    /// The engine observed the stop flag and abandoned the command.
    #[error("command interrupted")]
    Interrupted,
}

/// An embedded processing engine that executes textual commands.
///
/// `run` transforms `input` according to `command` and returns the
/// produced image, which must keep `input`'s geometry. Implementations
/// are expected to report progress through `control` and to poll
/// [`EngineControl::should_stop`] at convenient points, returning
/// [`EngineError::Interrupted`] when it turns `true`.
pub trait CommandEngine: Send {
    /// Execute `command` over `input`.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] when the command fails or is
    /// interrupted.
    fn run(
        &mut self,
        command: &str,
        input: &ImageBuffer,
        control: &EngineControl<'_, '_>,
    ) -> Result<ImageBuffer, EngineError>;
}

/// The engine's view of the surrounding filter run.
///
/// Progress arrives as the engine's native floating-point percentage
/// and is folded into the run's integer progress path; the stop probe
/// is the run's cancellation flag.
pub struct EngineControl<'c, 'a> {
    ctx: &'c FilterContext<'a>,
}

impl<'c, 'a> EngineControl<'c, 'a> {
    #[must_use]
    pub fn new(ctx: &'c FilterContext<'a>) -> Self {
        Self { ctx }
    }

    /// Report engine progress in percent.
    ///
    /// Negative values mean "unknown" in the engine dialect and are
    /// dropped; values above 100 are clamped. The truncated integer
    /// value goes through the run's normal progress path, so remapping
    /// and duplicate suppression apply as usual.
    pub fn set_progress(&self, percent: f32) {
        if percent < 0.0 {
            return;
        }
        let clamped = if percent > 100.0 { 100.0 } else { percent };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        self.ctx.post_progress(clamped as u8);
    }

    /// Whether the engine should abandon the current command.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.ctx.is_cancelled()
    }
}

/// A [`FilterBody`] that delegates the whole transformation to one
/// engine command.
pub struct CommandFilter<E> {
    engine: E,
    command: String,
}

impl<E: CommandEngine> CommandFilter<E> {
    #[must_use]
    pub fn new(engine: E, command: impl Into<String>) -> Self {
        Self {
            engine,
            command: command.into(),
        }
    }

    /// The command string handed to the engine on each run.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }
}

impl<E: CommandEngine> FilterBody for CommandFilter<E> {
    fn run(&mut self, ctx: &mut FilterContext<'_>) -> Result<(), FilterError> {
        let produced = {
            let control = EngineControl::new(ctx);
            self.engine.run(&self.command, control.ctx.original(), &control)
        };

        let output = match produced {
            Ok(output) => output,
            Err(EngineError::Interrupted) => return Err(FilterError::Cancelled),
            Err(err) => {
                log::error!("engine command {:?} failed: {err}", self.command);
                return Err(FilterError::Engine(err.to_string()));
            }
        };

        if !output.same_geometry(ctx.original()) {
            return Err(FilterError::Engine(format!(
                "engine output geometry {}x{} does not match input {}x{}",
                output.width(),
                output.height(),
                ctx.original().width(),
                ctx.original().height(),
            )));
        }
        *ctx.dest_mut() = output;
        Ok(())
    }
}
