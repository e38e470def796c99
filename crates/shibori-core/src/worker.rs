//! Worker-thread handle owned by a root filter task.
//!
//! The task's state machine does not inherit threading behavior; it
//! *owns* this small spawn/join wrapper, so the same run routine can
//! execute on a dedicated thread (the default) or inline in the
//! caller's thread (direct execution) without the task knowing the
//! difference. One root task maps to at most one worker thread; a
//! sub-filter never gets its own.

use std::thread;

/// A handle to one spawned worker thread producing a `T`.
#[derive(Debug)]
pub struct Worker<T> {
    handle: thread::JoinHandle<T>,
}

impl<T: Send + 'static> Worker<T> {
    /// Spawn a named worker thread running `job`.
    ///
    /// # Errors
    ///
    /// Returns the OS error when the thread cannot be created.
    pub fn spawn<F>(name: &str, job: F) -> std::io::Result<Self>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(name.to_owned())
            .spawn(job)?;
        Ok(Self { handle })
    }

    /// Whether the worker thread has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the worker thread exits and return its result.
    ///
    /// Returns `None` if the thread terminated by panicking outside the
    /// run routine's containment; the event is logged since no result
    /// can be recovered.
    pub fn join(self) -> Option<T> {
        match self.handle.join() {
            Ok(value) => Some(value),
            Err(_) => {
                log::error!("worker thread terminated abnormally");
                None
            }
        }
    }
}
