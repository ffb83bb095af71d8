//! Out-of-band error reporting shared by the storage backends

use crate::storage::traits::StorageError;
use std::sync::{Arc, Mutex, PoisonError};

/// Callback invoked with every error a storage operation captures or returns
///
/// The hook only observes; it cannot change what the operation returns.
pub type ErrorHook = Arc<dyn Fn(&StorageError) + Send + Sync>;

/// Holds the last reported error and the optional hook
#[derive(Default)]
pub(crate) struct ErrorSlot {
    last: Mutex<Option<StorageError>>,
    hook: Option<ErrorHook>,
}

impl ErrorSlot {
    pub(crate) fn set_hook(&mut self, hook: ErrorHook) {
        self.hook = Some(hook);
    }

    /// Records `error`, notifies the hook and hands the error back
    pub(crate) fn report(&self, error: StorageError) -> StorageError {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(error.clone());

        if let Some(hook) = &self.hook {
            hook(&error);
        }

        error
    }

    pub(crate) fn last(&self) -> Option<StorageError> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn take(&self) -> Option<StorageError> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_report_stores_and_notifies() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);

        let mut slot = ErrorSlot::default();
        slot.set_hook(Arc::new(move |_: &StorageError| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        let returned = slot.report(StorageError::NotInitialized);

        assert!(matches!(returned, StorageError::NotInitialized));
        assert!(matches!(slot.last(), Some(StorageError::NotInitialized)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_take_clears_slot() {
        let slot = ErrorSlot::default();
        assert!(slot.take().is_none());

        slot.report(StorageError::NotInitialized);
        assert!(slot.take().is_some());
        assert!(slot.last().is_none());
    }
}
