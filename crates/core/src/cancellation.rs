use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Monotonic cancellation flag shared between the caller, the relay and the
/// monitor. Once set it is never cleared.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Returns `true` only for the call that set the flag.
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_starts_clear() {
        assert!(!CancellationToken::new().is_cancelled());
    }

    #[test]
    fn test_only_first_cancel_transitions() {
        let token = CancellationToken::new();
        let reader = token.clone();

        assert!(token.cancel());
        assert!(!token.cancel());
        assert!(!reader.cancel());
        assert!(reader.is_cancelled());
    }
}
