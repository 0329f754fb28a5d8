use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A shared flag checked between employees of a payroll run.
///
/// Clones share the same underlying flag, so a caller can keep one clone and
/// cancel a run that is executing on other threads.
///
/// # Example
///
/// ```
/// use statutory_engine::run::CancellationFlag;
///
/// let flag = CancellationFlag::new();
/// let worker_view = flag.clone();
/// flag.cancel();
/// assert!(worker_view.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancellationFlag {
    /// Creates a flag that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Employees already computed are kept.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
