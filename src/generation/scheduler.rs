//! Priority arbiter for the external generator.
//!
//! Background build tasks are preemptible: interactive chat cancels every
//! tracked task and waits a bounded time for them to observe the
//! cancellation before it takes the generator. Shutdown follows the same
//! path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::constants::CANCEL_WAIT_SECS;

struct TrackedBuild {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Default)]
pub struct GenerationScheduler {
    tasks: Mutex<HashMap<u64, TrackedBuild>>,
    next_id: AtomicU64,
}

impl GenerationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a spawned build task. Finished tasks are pruned on the way in.
    pub fn track(&self, token: CancellationToken, handle: JoinHandle<()>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut tasks = self.tasks.lock().unwrap();
        tasks.retain(|_, t| !t.handle.is_finished());
        tasks.insert(id, TrackedBuild { token, handle });
        id
    }

    pub fn live_build_count(&self) -> usize {
        let mut tasks = self.tasks.lock().unwrap();
        tasks.retain(|_, t| !t.handle.is_finished());
        tasks.len()
    }

    async fn cancel_all_and_wait(&self, wait: Duration) {
        let drained: Vec<TrackedBuild> = {
            let mut tasks = self.tasks.lock().unwrap();
            tasks.drain().map(|(_, t)| t).collect()
        };
        if drained.is_empty() {
            return;
        }

        for task in &drained {
            task.token.cancel();
        }

        let join_all =
            futures::future::join_all(drained.into_iter().map(|t| t.handle));
        if tokio::time::timeout(wait, join_all).await.is_err() {
            tracing::warn!(
                wait_secs = wait.as_secs(),
                "Cancelled build tasks did not finish within the wait window"
            );
        }
    }

    /// Chat is about to start: evict background builds from the generator.
    pub async fn preempt_for_chat(&self) {
        self.cancel_all_and_wait(Duration::from_secs(CANCEL_WAIT_SECS))
            .await;
    }

    /// Cancel and drain everything; bounded so a misbehaving backend
    /// cannot block shutdown.
    pub async fn shutdown(&self) {
        self.cancel_all_and_wait(Duration::from_secs(CANCEL_WAIT_SECS))
            .await;
    }
}
