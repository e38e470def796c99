//! Cooperative cancellation tokens with parent/child propagation.
//!
//! Every task owns one [`CancelToken`]. A composed filter attaches the
//! token of its currently running sub-filter so that a cancellation
//! request on the parent reaches the whole tree before the caller's
//! wait-for-exit returns. The link is weak and non-owning: either side
//! can go away without leaving the other pointing at freed state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// A cancellation flag shared between a task and its execution context.
///
/// Cancellation is cooperative: [`request`](Self::request) only sets the
/// flag (recursively through the attached sub-token); the running body
/// is expected to poll [`is_cancelled`](Self::is_cancelled) and exit
/// early. Nothing is preempted.
#[derive(Debug, Default)]
pub struct CancelToken {
    flag: AtomicBool,
    /// The currently attached sub-filter's token, if any. At most one at
    /// a time; attaching a new one overwrites the previous link without
    /// cancelling it.
    sub: Mutex<Option<Weak<CancelToken>>>,
}

impl CancelToken {
    /// Create a fresh, unrequested token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Request cancellation of this token and, recursively, of the
    /// attached sub-token chain.
    pub fn request(&self) {
        self.flag.store(true, Ordering::Release);
        let sub = self.sub.lock().ok().and_then(|guard| {
            guard.as_ref().and_then(Weak::upgrade)
        });
        if let Some(sub) = sub {
            sub.request();
        }
    }

    /// Clear the flag for a new run. Does not touch the sub-token.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Release);
    }

    /// Attach a sub-filter's token, overwriting any previous link.
    ///
    /// If cancellation was already requested here, the child is flagged
    /// immediately so a stage attached mid-cancel still observes it.
    pub fn attach_sub(&self, sub: &Arc<Self>) {
        if let Ok(mut guard) = self.sub.lock() {
            *guard = Some(Arc::downgrade(sub));
        }
        if self.is_cancelled() {
            sub.request();
        }
    }

    /// Drop the sub-token link, if any.
    pub fn detach_sub(&self) {
        if let Ok(mut guard) = self.sub.lock() {
            *guard = None;
        }
    }

    /// Whether a sub-token is currently attached and alive.
    #[must_use]
    pub fn has_sub(&self) -> bool {
        self.sub
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().and_then(Weak::upgrade))
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_not_cancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(!token.has_sub());
    }

    #[test]
    fn request_sets_and_reset_clears() {
        let token = CancelToken::new();
        token.request();
        assert!(token.is_cancelled());
        token.reset();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn request_propagates_to_attached_sub() {
        let parent = CancelToken::new();
        let child = Arc::new(CancelToken::new());
        parent.attach_sub(&child);

        parent.request();
        assert!(child.is_cancelled(), "sub-token must be flagged by parent request");
    }

    #[test]
    fn request_propagates_through_nested_chain() {
        let root = CancelToken::new();
        let mid = Arc::new(CancelToken::new());
        let leaf = Arc::new(CancelToken::new());
        root.attach_sub(&mid);
        mid.attach_sub(&leaf);

        root.request();
        assert!(mid.is_cancelled());
        assert!(leaf.is_cancelled());
    }

    #[test]
    fn attach_after_request_flags_child_immediately() {
        let parent = CancelToken::new();
        parent.request();

        let child = Arc::new(CancelToken::new());
        parent.attach_sub(&child);
        assert!(child.is_cancelled());
    }

    #[test]
    fn attach_overwrites_previous_link_without_cancelling_it() {
        let parent = CancelToken::new();
        let first = Arc::new(CancelToken::new());
        let second = Arc::new(CancelToken::new());
        parent.attach_sub(&first);
        parent.attach_sub(&second);

        parent.request();
        assert!(!first.is_cancelled(), "replaced sub-token must not be cancelled");
        assert!(second.is_cancelled());
    }

    #[test]
    fn detach_clears_the_link() {
        let parent = CancelToken::new();
        let child = Arc::new(CancelToken::new());
        parent.attach_sub(&child);
        parent.detach_sub();

        parent.request();
        assert!(!child.is_cancelled());
        assert!(!parent.has_sub());
    }

    #[test]
    fn dropped_sub_token_upgrades_to_none() {
        let parent = CancelToken::new();
        {
            let child = Arc::new(CancelToken::new());
            parent.attach_sub(&child);
        }
        assert!(!parent.has_sub());
        // Requesting with a dead link must not misbehave.
        parent.request();
        assert!(parent.is_cancelled());
    }
}
