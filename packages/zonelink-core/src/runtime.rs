//! Task spawning abstraction for runtime independence.
//!
//! Services that pump long-lived event streams (session events, slot
//! events, bridge frames) spawn those pumps through [`TaskSpawner`] rather
//! than calling `tokio::spawn` directly, so embedders can route tasks onto
//! their own runtime handle.

use std::future::Future;

/// Abstraction for spawning background tasks.
///
/// The spawner does not provide a way to cancel or join spawned tasks;
/// pumps exit on their own when their source channel closes.
pub trait TaskSpawner: Send + Sync {
    /// Spawns a future as a background task.
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Tokio-based spawner used by the standalone server.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    /// Creates a new `TokioSpawner` with the given runtime handle.
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Creates a new `TokioSpawner` using the current runtime's handle.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[must_use]
    pub fn current() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(future);
    }
}
