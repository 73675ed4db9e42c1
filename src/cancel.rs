//! Cooperative cancellation for the async stream operations.
//!
//! A [`CancelToken`] is a cloneable flag shared between the party running an
//! async compress/decompress loop and the party that may call it off. The
//! loops poll the token on entry and before every round-trip to the
//! underlying source or sink; once observed, the operation fails with
//! [`ZstdError::Cancelled`](crate::ZstdError::Cancelled) without advancing
//! the codec further. No rollback of partial progress is attempted — a
//! context reset makes the state reusable.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::frame::types::ZstdError;

/// Cloneable cancellation flag. All clones observe the same signal.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// A fresh, un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation. Idempotent; never blocks.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether cancellation has been signalled.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Fail fast when cancelled; used at every poll point.
    pub(crate) fn check(&self) -> Result<(), ZstdError> {
        if self.is_cancelled() {
            Err(ZstdError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_signal() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
        assert!(matches!(other.check(), Err(ZstdError::Cancelled)));
    }

    #[test]
    fn cancel_is_idempotent() {
        let token = CancelToken::new();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }
}
