use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;

use crate::builder::QuestionBuilder;
use crate::config::Config;
use crate::generation::{BufferController, GenerationScheduler};
use crate::providers::{GenerationBackend, TtsBackend};
use crate::session::state::ActiveSessions;
use crate::session::SessionManager;
use crate::srs::SrsEngine;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    store: Arc<Store>,
    manager: Arc<SessionManager>,
    buffer: Arc<BufferController>,
    scheduler: Arc<GenerationScheduler>,
    builder: Arc<QuestionBuilder>,
    backend: Arc<dyn GenerationBackend>,
    config: Arc<Config>,
    shutdown_tx: broadcast::Sender<()>,
    started_at: Instant,
}

impl AppState {
    pub fn new(
        store: Arc<Store>,
        backend: Arc<dyn GenerationBackend>,
        tts: Option<Arc<dyn TtsBackend>>,
        config: &Config,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Self {
        let srs = Arc::new(SrsEngine::new(
            store.clone(),
            config.training.archive_interval_days,
        ));
        let builder = Arc::new(QuestionBuilder::new(
            store.clone(),
            backend.clone(),
            config.limits.clone(),
        ));
        let scheduler = Arc::new(GenerationScheduler::new());
        let sessions = Arc::new(ActiveSessions::new());
        let buffer = Arc::new(BufferController::new(
            store.clone(),
            builder.clone(),
            scheduler.clone(),
            sessions.clone(),
            config.training.min_ready_questions,
        ));
        let manager = Arc::new(SessionManager::new(
            store.clone(),
            srs,
            buffer.clone(),
            sessions,
            tts,
            PathBuf::from(&config.tts.audio_cache_dir),
            config.training.session_size,
            config.limits.max_review_pool,
        ));

        Self {
            store,
            manager,
            buffer,
            scheduler,
            builder,
            backend,
            config: Arc::new(config.clone()),
            shutdown_tx,
            started_at: Instant::now(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    pub fn buffer(&self) -> &Arc<BufferController> {
        &self.buffer
    }

    pub fn scheduler(&self) -> &Arc<GenerationScheduler> {
        &self.scheduler
    }

    pub fn builder(&self) -> &Arc<QuestionBuilder> {
        &self.builder
    }

    pub fn backend(&self) -> &Arc<dyn GenerationBackend> {
        &self.backend
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn shutdown_rx(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn shutdown_tx(&self) -> &broadcast::Sender<()> {
        &self.shutdown_tx
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
