//! External backend contracts: text generation and text-to-speech.

pub mod mock;
pub mod ollama;
pub mod tts;

use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;

use crate::config::Config;

pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, BackendError>> + Send>>;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend network error: {0}")]
    Network(String),
    #[error("backend api error: status={status}, message={message}")]
    Api { status: u16, message: String },
    #[error("backend request timed out")]
    Timeout,
    #[error("backend stream error: {0}")]
    Stream(String),
    #[error("tts synthesis error: {0}")]
    Synthesis(String),
}

/// The external text generator. At most one logical user holds it at a
/// time; the scheduler arbitrates between chat and background builds.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Single full completion. May contain JSON with or without code
    /// fences and/or `<think>` blocks.
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, BackendError>;

    /// Token stream until done. Dropping the stream cancels the upstream
    /// request.
    async fn generate_stream(
        &self,
        prompt: &str,
        temperature: f32,
        system: Option<&str>,
    ) -> Result<TokenStream, BackendError>;

    /// Backend identifier recorded on generated questions,
    /// e.g. "ollama/qwen3:8b".
    fn id(&self) -> String;
}

#[async_trait]
pub trait TtsBackend: Send + Sync {
    async fn synthesize(&self, text: &str, output: &Path) -> Result<(), BackendError>;

    fn id(&self) -> String;
}

pub fn build_generation_backend(config: &Config) -> Arc<dyn GenerationBackend> {
    match config.generation.backend.as_str() {
        "mock" => Arc::new(mock::MockGeneration::new()),
        _ => Arc::new(ollama::OllamaBackend::new(
            &config.generation.ollama_url,
            &config.generation.model,
            config.generation.timeout_secs,
        )),
    }
}

pub fn build_tts_backend(config: &Config) -> Option<Arc<dyn TtsBackend>> {
    match config.tts.backend.as_str() {
        "mock" => Some(Arc::new(tts::MockTts::new(&config.tts.voice))),
        _ => None,
    }
}
