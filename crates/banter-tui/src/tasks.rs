use std::collections::HashMap;
use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// The background jobs the app runs, one slot each. Spawning into an
/// occupied slot replaces the previous task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskSlot {
    StatusProbe,
    ModelFetch,
    ModelChange,
    Chat,
    SaveTranscript,
    SavePreferences,
}

struct TaskEntry {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Registry of the app's background tasks.
///
/// Every task is tracked under a [`TaskSlot`] and torn down deterministically:
/// replaced when its slot is reused, cancelled and awaited on shutdown. Nothing
/// the app spawns outlives the registry.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: HashMap<TaskSlot, TaskEntry>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` under `slot`, cancelling whatever held the slot before.
    /// The closure receives a token that is cancelled when the task is
    /// replaced or the registry shuts down.
    pub fn spawn<F, Fut>(&mut self, slot: TaskSlot, task: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(task(cancel.clone()));
        if let Some(previous) = self.tasks.insert(slot, TaskEntry { cancel, handle }) {
            debug!(?slot, "replacing background task");
            previous.cancel.cancel();
            previous.handle.abort();
        }
    }

    pub fn cancel(&mut self, slot: TaskSlot) {
        if let Some(entry) = self.tasks.remove(&slot) {
            entry.cancel.cancel();
            entry.handle.abort();
        }
    }

    /// Cancel every task and wait for all of them to wind down.
    pub async fn shutdown(mut self) {
        for (slot, entry) in self.tasks.drain() {
            entry.cancel.cancel();
            entry.handle.abort();
            if let Err(e) = entry.handle.await
                && !e.is_cancelled()
            {
                debug!(?slot, error = %e, "background task ended abnormally");
            }
        }
    }
}
