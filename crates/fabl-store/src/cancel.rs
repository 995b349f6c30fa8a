use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag telling an in-flight write to abandon its transaction.
///
/// Backends check it immediately before making a write visible; once set,
/// the write is rolled back and fails with [`crate::StoreError::Cancelled`].
#[derive(Clone, Debug, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// A guard that cancels this flag when dropped unless disarmed first.
    pub fn drop_guard(&self) -> CancelOnDrop {
        CancelOnDrop {
            cancellation: Some(self.clone()),
        }
    }
}

/// Cancels its [`Cancellation`] on drop.
///
/// Held by the async side of a blocking call: if the awaiting future is
/// dropped (for example by a request timeout), the guard goes with it.
#[derive(Debug)]
pub struct CancelOnDrop {
    cancellation: Option<Cancellation>,
}

impl CancelOnDrop {
    /// Consume the guard without cancelling.
    pub fn disarm(mut self) {
        self.cancellation = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(cancellation) = self.cancellation.take() {
            cancellation.cancel();
        }
    }
}
