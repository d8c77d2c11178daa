//! Runtime abstraction layer for async operations
//!
//! Tile fetches are spawned through a process-wide [`AsyncSpawner`]. The
//! default runs them on the ambient Tokio runtime; hosts with their own
//! executor can install one with [`init_runtime`] before the first load.

use crate::prelude::{Future, Pin};
use crate::Result;
use std::sync::OnceLock;

/// A trait for spawning async tasks (object-safe version)
pub trait AsyncSpawner: Send + Sync + 'static {
    /// Spawn a future and return a handle to it. On error the future is
    /// dropped unpolled.
    fn spawn_boxed(
        &self,
        future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
    ) -> Result<Box<dyn AsyncHandle>>;
}

/// Handle to a spawned async task. Dropping it detaches the task.
pub trait AsyncHandle: Send + Sync {
    /// Check if the task is finished
    fn is_finished(&self) -> bool;

    /// Cancel the task
    fn cancel(&self);
}

/// Spawn `future` on the installed runtime
pub fn spawn<F>(future: F) -> Result<Box<dyn AsyncHandle>>
where
    F: Future<Output = ()> + Send + 'static,
{
    runtime().spawn_boxed(Box::pin(future))
}

pub mod spawners {
    use super::*;
    use crate::MapError;
    use ::tokio::runtime::Handle;
    use ::tokio::task::JoinHandle;

    /// Spawns onto the Tokio runtime of the calling thread. Fails when the
    /// caller is not inside one.
    pub struct TokioSpawner;

    impl AsyncSpawner for TokioSpawner {
        fn spawn_boxed(
            &self,
            future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
        ) -> Result<Box<dyn AsyncHandle>> {
            let handle = Handle::try_current()
                .map_err(|err| MapError::TileLoad(format!("no Tokio runtime: {err}")))?;
            Ok(Box::new(TokioHandle(handle.spawn(future))))
        }
    }

    struct TokioHandle(JoinHandle<()>);

    impl AsyncHandle for TokioHandle {
        fn is_finished(&self) -> bool {
            self.0.is_finished()
        }

        fn cancel(&self) {
            self.0.abort();
        }
    }
}

static RUNTIME: OnceLock<Box<dyn AsyncSpawner>> = OnceLock::new();

/// Install a spawner. Only the first call (or first spawn) wins; returns
/// false if a spawner was already in place.
pub fn init_runtime(spawner: Box<dyn AsyncSpawner>) -> bool {
    let installed = RUNTIME.set(spawner).is_ok();
    if !installed {
        log::debug!("async spawner already installed, keeping the existing one");
    }
    installed
}

/// Get the global runtime spawner
pub fn runtime() -> &'static dyn AsyncSpawner {
    RUNTIME
        .get_or_init(|| Box::new(spawners::TokioSpawner))
        .as_ref()
}
