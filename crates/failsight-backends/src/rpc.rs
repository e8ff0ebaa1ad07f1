use crate::sse::{SseChunk, SseDecoder};
use crate::traits::{AnalysisBackend, BackendConfig, StreamEvent};
use crate::{Error, Result};
use async_trait::async_trait;
use failsight_types::{AnalysisContext, AnalysisResult, ChatMessage, FailureInsight};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

const DEFAULT_ENDPOINT: &str = "http://localhost:9000";

/// Default confidence when the service reports none
const DEFAULT_CONFIDENCE: f32 = 0.75;

#[derive(Debug, Serialize)]
struct AnalyzePayload<'a> {
    action: &'static str,
    context: &'a AnalysisContext,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatPayload<'a> {
    action: &'static str,
    message: &'a str,
    history: &'a [ChatMessage],
    context: &'a AnalysisContext,
    stream: bool,
}

fn default_confidence() -> f32 {
    DEFAULT_CONFIDENCE
}

/// The service's structured analysis response, all fields optional
#[derive(Debug, Deserialize)]
struct RpcAnalysis {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    failure_insights: Vec<FailureInsight>,
    #[serde(default)]
    suggested_solutions: Vec<String>,
    #[serde(default)]
    correlated_logs: Vec<String>,
    #[serde(default = "default_confidence")]
    confidence: f32,
}

impl From<RpcAnalysis> for AnalysisResult {
    fn from(value: RpcAnalysis) -> Self {
        AnalysisResult {
            summary: value.summary,
            failure_insights: value.failure_insights,
            suggested_solutions: value.suggested_solutions,
            correlated_logs: value.correlated_logs,
            confidence: value.confidence,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcChatResponse {
    #[serde(default)]
    response: String,
}

/// Generic RPC analysis backend.
///
/// Talks to any JSON service exposing `/api/analyze`, `/api/chat` and
/// `/health`. Streaming responses arrive as SSE and go through the shared
/// line decoder, so non-JSON payloads and the `[DONE]` sentinel behave the
/// same regardless of what the service emits.
pub struct RpcBackend {
    client: reqwest::Client,
    endpoint: String,
    initialized: bool,
}

impl RpcBackend {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            initialized: false,
        }
    }

    fn ensure_initialized(&self) -> Result<()> {
        if !self.initialized {
            return Err(Error::NotInitialized(self.name().to_string()));
        }
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint.trim_end_matches('/'), path)
    }

    async fn post_json<T: Serialize>(&self, path: &str, payload: &T) -> Result<reqwest::Response> {
        let response = self.client.post(self.url(path)).json(payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Request {
                status: Some(status.as_u16()),
                message: body,
            });
        }
        Ok(response)
    }

    async fn stream_sse<T: Serialize>(
        &self,
        path: &str,
        payload: &T,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<()> {
        self.ensure_initialized()?;

        let response = match self
            .client
            .post(self.url(path))
            .header("accept", "text/event-stream")
            .json(payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                return Ok(());
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let _ = tx
                .send(StreamEvent::Error(format!(
                    "service returned {}: {}",
                    status, body
                )))
                .await;
            return Ok(());
        }

        let mut decoder = SseDecoder::new();
        let mut stream = response.bytes_stream();
        let mut buffer = String::new();

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                    return Ok(());
                }
            };
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(line_end) = buffer.find('\n') {
                let line = buffer[..line_end].to_string();
                buffer.drain(..=line_end);

                let event = match decoder.feed_line(&line) {
                    Some(SseChunk::Text(text)) => StreamEvent::Text(text),
                    Some(SseChunk::Error(message)) => StreamEvent::Error(message),
                    None => {
                        if decoder.is_terminated() {
                            return Ok(());
                        }
                        continue;
                    }
                };
                if tx.send(event).await.is_err() {
                    // Consumer hung up; drop the connection
                    return Ok(());
                }
            }
        }

        Ok(())
    }
}

impl Default for RpcBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnalysisBackend for RpcBackend {
    fn name(&self) -> &'static str {
        "rpc"
    }

    fn display_name(&self) -> &'static str {
        "Analysis RPC Service"
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    async fn initialize(&mut self, config: &BackendConfig) -> Result<()> {
        if let Some(endpoint) = &config.endpoint {
            self.endpoint = endpoint.clone();
        }

        // Probe the service; an unreachable endpoint leaves the backend
        // uninitialized instead of failing the whole startup
        match self
            .client
            .get(self.url("/health"))
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                self.initialized = true;
                info!(endpoint = %self.endpoint, "RPC backend initialized");
            }
            Ok(response) => {
                warn!(
                    endpoint = %self.endpoint,
                    status = response.status().as_u16(),
                    "RPC service health probe returned non-success"
                );
                self.initialized = false;
            }
            Err(e) => {
                warn!(endpoint = %self.endpoint, error = %e, "RPC service not reachable");
                self.initialized = false;
            }
        }
        Ok(())
    }

    async fn analyze_complete(&self, context: &AnalysisContext) -> Result<AnalysisResult> {
        self.ensure_initialized()?;
        let payload = AnalyzePayload {
            action: "analyze_failures",
            context,
            stream: false,
        };
        let response = self.post_json("/api/analyze", &payload).await?;
        let parsed: RpcAnalysis = response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;
        Ok(parsed.into())
    }

    async fn analyze_streaming(
        &self,
        context: &AnalysisContext,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<()> {
        let payload = AnalyzePayload {
            action: "analyze_failures",
            context,
            stream: true,
        };
        self.stream_sse("/api/analyze", &payload, tx).await
    }

    async fn chat_complete(
        &self,
        message: &str,
        history: &[ChatMessage],
        context: &AnalysisContext,
    ) -> Result<String> {
        self.ensure_initialized()?;
        let payload = ChatPayload {
            action: "chat",
            message,
            history,
            context,
            stream: false,
        };
        let response = self.post_json("/api/chat", &payload).await?;
        let parsed: RpcChatResponse = response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;
        Ok(parsed.response)
    }

    async fn chat_streaming(
        &self,
        message: &str,
        history: &[ChatMessage],
        context: &AnalysisContext,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<()> {
        let payload = ChatPayload {
            action: "chat",
            message,
            history,
            context,
            stream: true,
        };
        self.stream_sse("/api/chat", &payload, tx).await
    }

    async fn health_check(&self) -> bool {
        if !self.initialized {
            return false;
        }
        match self
            .client
            .get(self.url("/health"))
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("RPC health check failed: {}", e);
                false
            }
        }
    }
}
