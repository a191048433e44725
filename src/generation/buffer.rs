//! Background buffer controller: keeps the ready-question count at its
//! target by launching (at most one) background build task.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::builder::{BuildTarget, QuestionBuilder};
use crate::generation::scheduler::GenerationScheduler;
use crate::session::state::ActiveSessions;
use crate::store::Store;

pub struct BufferController {
    store: Arc<Store>,
    builder: Arc<QuestionBuilder>,
    scheduler: Arc<GenerationScheduler>,
    sessions: Arc<ActiveSessions>,
    min_ready_questions: usize,
    /// Process-wide guard against double-spawn. Set before the build task
    /// is spawned, cleared in its finalizer.
    in_flight: AtomicBool,
}

impl BufferController {
    pub fn new(
        store: Arc<Store>,
        builder: Arc<QuestionBuilder>,
        scheduler: Arc<GenerationScheduler>,
        sessions: Arc<ActiveSessions>,
        min_ready_questions: usize,
    ) -> Self {
        Self {
            store,
            builder,
            scheduler,
            sessions,
            min_ready_questions,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_generating(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// `min_ready_questions` plus the summed shortfall of live sessions,
    /// so sessions that are not yet filled pull extra generation.
    async fn target(&self) -> usize {
        self.min_ready_questions + self.sessions.total_shortfall().await
    }

    /// Re-check the buffer. Invoked after every answer, session start,
    /// generation completion, and manual archive change; a no-op while a
    /// build is already running.
    pub fn check<'a>(self: &'a Arc<Self>) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            if self
                .in_flight
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                return;
            }

            let target = self.target().await;
            let ready = match self.store.ready_question_count() {
                Ok(n) => n,
                Err(e) => {
                    tracing::error!(error = %e, "Buffer check failed to read ready count");
                    self.in_flight.store(false, Ordering::SeqCst);
                    return;
                }
            };
            if ready >= target {
                self.in_flight.store(false, Ordering::SeqCst);
                return;
            }

            // Nothing to generate from: no eligible cluster pairs in rotation.
            match self.store.get_word_cluster_question_counts() {
                Ok(counts) if counts.is_empty() => {
                    self.in_flight.store(false, Ordering::SeqCst);
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "Buffer check failed to read pair counts");
                    self.in_flight.store(false, Ordering::SeqCst);
                    return;
                }
            }

            let need = target - ready;
            tracing::info!(ready, target, need, "Launching background question build");

            let token = CancellationToken::new();
            let task_token = token.clone();
            let this = self.clone();
            let handle = tokio::spawn(async move {
                this.run_build(need, task_token).await;
            });
            self.scheduler.track(token, handle);
        })
    }

    /// Build up to `need` questions, observing cancellation at every
    /// suspension point. A cancelled build discards its partial question;
    /// the uncovered slots become eligible again at the next check.
    async fn run_build(self: Arc<Self>, need: usize, token: CancellationToken) {
        let mut built = 0usize;
        let mut cancelled = false;

        for _ in 0..need {
            if token.is_cancelled() {
                cancelled = true;
                break;
            }

            let target = match self.next_build_target() {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to pick a generation target");
                    break;
                }
            };

            let question = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    cancelled = true;
                    break;
                }
                result = self.builder.build(target) => match result {
                    Ok(q) => q,
                    Err(e) => {
                        tracing::error!(error = %e, "Background build failed");
                        break;
                    }
                },
            };

            match question {
                Some(q) => {
                    if let Err(e) = self.store.save_question(&q) {
                        tracing::error!(error = %e, "Failed to save generated question");
                        break;
                    }
                    built += 1;
                    tracing::info!(
                        word = %q.target_word,
                        cluster = %q.cluster_title,
                        question_type = q.question_type.as_str(),
                        "Question added to buffer"
                    );
                }
                // Generation gave up on this slot; move to the next one.
                None => continue,
            }
        }

        self.in_flight.store(false, Ordering::SeqCst);
        tracing::info!(built, cancelled, "Background build finished");

        // Archival during the build may have changed the target. A build
        // that produced nothing stays short until the next external
        // trigger, so persistent generation failure cannot spin here.
        if !cancelled && built > 0 {
            self.check().await;
        }
    }

    /// Soonest-due active pair with no ready question first, then an
    /// uncovered new pair; otherwise let the builder's weighted selector
    /// choose.
    fn next_build_target(&self) -> Result<Option<BuildTarget>, crate::store::StoreError> {
        for pair in self.store.get_word_clusters_needing_questions()? {
            if let Some(target) = self.builder.resolve_target(&pair.word, &pair.cluster_title)? {
                return Ok(Some(target));
            }
        }
        for (word, cluster_title) in self.store.get_new_word_clusters_without_questions(1)? {
            if let Some(target) = self.builder.resolve_target(&word, &cluster_title)? {
                return Ok(Some(target));
            }
        }
        Ok(None)
    }
}
