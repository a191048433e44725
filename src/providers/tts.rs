//! TTS backends. Narration is optional; the default configuration runs
//! without one.

use std::path::Path;

use async_trait::async_trait;

use crate::providers::{BackendError, TtsBackend};

/// Writes the input text to the output path instead of audio. Lets the
/// audio cache path be exercised without a real synthesizer.
#[derive(Debug)]
pub struct MockTts {
    voice: String,
}

impl MockTts {
    pub fn new(voice: &str) -> Self {
        Self {
            voice: voice.to_string(),
        }
    }
}

#[async_trait]
impl TtsBackend for MockTts {
    async fn synthesize(&self, text: &str, output: &Path) -> Result<(), BackendError> {
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BackendError::Synthesis(e.to_string()))?;
        }
        tokio::fs::write(output, text.as_bytes())
            .await
            .map_err(|e| BackendError::Synthesis(e.to_string()))?;
        Ok(())
    }

    fn id(&self) -> String {
        format!("mock/{}", self.voice)
    }
}
