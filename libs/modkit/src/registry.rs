use std::sync::Arc;

use crate::lifecycle::Runnable;

/// The runnables a process supervises, in registration order.
///
/// Registration order is only used for logging; all entries are launched together.
#[derive(Default)]
pub struct ServiceRegistry {
    entries: Vec<Arc<dyn Runnable>>,
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("runnables", &self.names())
            .finish()
    }
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration.
    pub fn with(mut self, runnable: Arc<dyn Runnable>) -> Self {
        self.register(runnable);
        self
    }

    pub fn register(&mut self, runnable: Arc<dyn Runnable>) -> &mut Self {
        tracing::debug!(runnable = runnable.name(), "registered runnable");
        self.entries.push(runnable);
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|r| r.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> Vec<Arc<dyn Runnable>> {
        self.entries
    }
}
