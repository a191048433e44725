//! Ollama backend — `/api/generate`, non-streaming and NDJSON streaming.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::providers::{BackendError, GenerationBackend, TokenStream};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    temperature: f32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    done: bool,
}

#[derive(Debug)]
pub struct OllamaBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaBackend {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    async fn post_generate(
        &self,
        request: &GenerateRequest<'_>,
    ) -> Result<reqwest::Response, BackendError> {
        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout
                } else {
                    BackendError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl GenerationBackend for OllamaBackend {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, BackendError> {
        let started = std::time::Instant::now();
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            temperature,
            stream: false,
            system: None,
        };
        let response = self.post_generate(&request).await?;
        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        tracing::debug!(
            model = %self.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            chars = body.response.len(),
            "Generation completed"
        );
        Ok(body.response)
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        temperature: f32,
        system: Option<&str>,
    ) -> Result<TokenStream, BackendError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            temperature,
            stream: true,
            system,
        };
        let response = self.post_generate(&request).await?;

        // Ollama streams newline-delimited JSON; fragments are buffered
        // until a full line is available. Dropping the stream closes the
        // underlying request, which is how cancellation propagates.
        let stream = async_stream::stream! {
            let mut bytes = response.bytes_stream();
            let mut buffer = String::new();
            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(BackendError::Stream(e.to_string()));
                        break;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].trim().to_string();
                    buffer.drain(..=pos);
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<GenerateResponse>(&line) {
                        Ok(part) => {
                            if !part.response.is_empty() {
                                yield Ok(part.response);
                            }
                            if part.done {
                                return;
                            }
                        }
                        Err(e) => {
                            yield Err(BackendError::Stream(e.to_string()));
                            return;
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }

    fn id(&self) -> String {
        format!("ollama/{}", self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_includes_model() {
        let backend = OllamaBackend::new("http://localhost:11434/", "qwen3:8b", 120);
        assert_eq!(backend.id(), "ollama/qwen3:8b");
        assert_eq!(backend.base_url, "http://localhost:11434");
    }

    #[test]
    fn request_serializes_without_system_when_absent() {
        let request = GenerateRequest {
            model: "m",
            prompt: "p",
            temperature: 0.7,
            stream: false,
            system: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("system").is_none());
        assert_eq!(json["stream"], false);
    }
}
