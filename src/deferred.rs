//! Deferred values and asynchronous operation markers.
//!
//! [`Deferred`] describes a slot whose value may not exist yet, may be in the
//! middle of being fetched, or has been fetched. [`AsyncOperationStatus`] tags
//! the two instants of a single fetch (it started, it finished) so that the
//! state machine only ever reacts to discrete events and never awaits.
//!
//! Neither type enforces a transition graph. Legal transitions are decided by
//! [`crate::app::State::update`].

/// A value that has not been requested, is being fetched, or has arrived.
///
/// The resolved payload is usually a `Result`, so "arrived" covers both
/// success and failure.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Deferred<T> {
    #[default]
    NotStarted,
    InProgress,
    Resolved(T),
}

impl<T> Deferred<T> {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Deferred::Resolved(_))
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, Deferred::InProgress)
    }

    /// Borrow the resolved payload, if any.
    pub fn as_resolved(&self) -> Option<&T> {
        match self {
            Deferred::Resolved(value) => Some(value),
            Deferred::NotStarted | Deferred::InProgress => None,
        }
    }
}

/// One asynchronous fetch seen as two events in the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsyncOperationStatus<T> {
    Started,
    Finished(T),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_not_started() {
        let slot: Deferred<u32> = Deferred::default();
        assert_eq!(slot, Deferred::NotStarted);
        assert!(!slot.is_resolved());
        assert!(!slot.is_in_progress());
    }

    #[test]
    fn test_as_resolved_only_for_resolved() {
        assert_eq!(Deferred::<u32>::InProgress.as_resolved(), None);
        assert_eq!(Deferred::<u32>::NotStarted.as_resolved(), None);
        assert_eq!(Deferred::Resolved(7).as_resolved(), Some(&7));
    }

    #[test]
    fn test_resolved_error_is_still_resolved() {
        let slot: Deferred<Result<u32, String>> = Deferred::Resolved(Err("boom".into()));
        assert!(slot.is_resolved());
        assert_eq!(slot.as_resolved(), Some(&Err("boom".to_string())));
    }
}
