//! Scripted in-process backend for tests and offline runs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::providers::{BackendError, GenerationBackend, TokenStream};

/// Returns scripted responses in order; once the script is exhausted it
/// falls back to a fixed filler response. An optional artificial latency
/// makes preemption observable in tests.
#[derive(Debug, Default)]
pub struct MockGeneration {
    script: Mutex<VecDeque<String>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn push_response(&self, response: impl Into<String>) {
        self.script.lock().unwrap().push_back(response.into());
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_response(&self) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "Mock generation response".to_string())
    }
}

/// Shared handle so tests can keep scripting after handing the backend to
/// the application (`Arc<MockGeneration>` coerces to
/// `Arc<dyn GenerationBackend>`).
pub type SharedMock = Arc<MockGeneration>;

#[async_trait]
impl GenerationBackend for MockGeneration {
    async fn generate(&self, _prompt: &str, _temperature: f32) -> Result<String, BackendError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.next_response())
    }

    async fn generate_stream(
        &self,
        _prompt: &str,
        _temperature: f32,
        _system: Option<&str>,
    ) -> Result<TokenStream, BackendError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let text = self.next_response();
        let tokens: Vec<String> = text
            .split_inclusive(' ')
            .map(|t| t.to_string())
            .collect();
        let stream = async_stream::stream! {
            for token in tokens {
                yield Ok::<_, BackendError>(token);
            }
        };
        Ok(Box::pin(stream))
    }

    fn id(&self) -> String {
        "mock".to_string()
    }
}
