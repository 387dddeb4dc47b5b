use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Result returned by runnables.
type TaskResult<T = ()> = anyhow::Result<T>;

// ----- Runnable --------------------------------------------------------------

/// A long-running unit of work owned by the process supervisor.
/// Note: take `self` by `Arc` to make the spawned future `'static` and `Send`.
#[async_trait]
pub trait Runnable: Send + Sync + 'static {
    /// Stable name used in logs and in the run report.
    fn name(&self) -> &str;

    /// Long-running loop. Must return when `cancel` is cancelled.
    ///
    /// Returning an error that wraps [`Canceled`] is treated as a clean stop.
    async fn run(self: Arc<Self>, cancel: CancellationToken) -> TaskResult<()>;
}

// ----- Cancellation marker ---------------------------------------------------

/// Marker error for "stopped because shutdown was requested".
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation canceled")]
pub struct Canceled;

/// True if any error in the chain is [`Canceled`].
pub fn is_canceled(err: &anyhow::Error) -> bool {
    err.chain().any(|e| e.is::<Canceled>())
}
