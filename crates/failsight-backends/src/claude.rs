use crate::postprocess::decompose_response;
use crate::prompt::{build_analysis_prompt, build_system_prompt};
use crate::traits::{AnalysisBackend, BackendConfig, StreamEvent};
use crate::{Error, Result};
use async_trait::async_trait;
use failsight_types::{AnalysisContext, AnalysisResult, ChatMessage, ChatRole};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

const ANALYSIS_MAX_TOKENS: u32 = 4096;
const CHAT_MAX_TOKENS: u32 = 2048;
const TEMPERATURE: f32 = 0.7;

/// Fixed confidence constant for Claude results
const CONFIDENCE: f32 = 0.90;

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

impl MessagesResponse {
    fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ResponseBlock::Text { text } => Some(text.as_str()),
                ResponseBlock::Other => None,
            })
            .collect()
    }
}

/// Server events on the Messages API SSE stream
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamApiEvent {
    ContentBlockDelta {
        delta: Delta,
    },
    MessageStop,
    Error {
        error: ApiError,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Delta {
    TextDelta {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

fn wire_messages(history: &[ChatMessage], message: &str) -> Vec<WireMessage> {
    let mut messages: Vec<WireMessage> = history
        .iter()
        .map(|m| WireMessage {
            role: match m.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            },
            content: m.content.clone(),
        })
        .collect();
    messages.push(WireMessage {
        role: "user",
        content: message.to_string(),
    });
    messages
}

/// Claude analysis backend
pub struct ClaudeBackend {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    initialized: bool,
}

impl ClaudeBackend {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            initialized: false,
        }
    }

    fn api_key(&self) -> Result<&str> {
        if !self.initialized {
            return Err(Error::NotInitialized(self.name().to_string()));
        }
        self.api_key
            .as_deref()
            .ok_or_else(|| Error::NotInitialized(self.name().to_string()))
    }

    fn request(&self, system: String, messages: Vec<WireMessage>, max_tokens: u32) -> MessagesRequest {
        MessagesRequest {
            model: self.model.clone(),
            max_tokens,
            temperature: TEMPERATURE,
            system,
            messages,
            stream: None,
        }
    }

    async fn complete(&self, request: &MessagesRequest) -> Result<String> {
        let response = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", self.api_key()?)
            .header("anthropic-version", API_VERSION)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Request {
                status: Some(status.as_u16()),
                message: body,
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;
        Ok(parsed.text())
    }

    async fn stream(
        &self,
        mut request: MessagesRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<()> {
        let api_key = self.api_key()?;
        request.stream = Some(true);

        let response = match self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
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
                .send(StreamEvent::Error(format!("HTTP {}: {}", status, body)))
                .await;
            return Ok(());
        }

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
                let line = buffer[..line_end].trim().to_string();
                buffer.drain(..=line_end);

                // SSE streams interleave event:, id: and comment lines
                let Some(payload) = line.strip_prefix("data: ") else {
                    continue;
                };
                let Ok(event) = serde_json::from_str::<StreamApiEvent>(payload) else {
                    continue;
                };

                match event {
                    StreamApiEvent::ContentBlockDelta {
                        delta: Delta::TextDelta { text },
                    } => {
                        if tx.send(StreamEvent::Text(text)).await.is_err() {
                            // Consumer hung up; drop the connection
                            return Ok(());
                        }
                    }
                    StreamApiEvent::MessageStop => return Ok(()),
                    StreamApiEvent::Error { error } => {
                        let _ = tx.send(StreamEvent::Error(error.message)).await;
                        return Ok(());
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }
}

impl Default for ClaudeBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnalysisBackend for ClaudeBackend {
    fn name(&self) -> &'static str {
        "claude"
    }

    fn display_name(&self) -> &'static str {
        "Anthropic Claude 3.5 Sonnet"
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    async fn initialize(&mut self, config: &BackendConfig) -> Result<()> {
        if let Some(model) = &config.model {
            self.model = model.clone();
        }

        match &config.api_key {
            Some(key) if !key.is_empty() => {
                self.api_key = Some(key.clone());
                self.initialized = true;
                info!("Claude backend initialized");
            }
            _ => {
                warn!("Claude API key not provided");
                self.initialized = false;
            }
        }
        Ok(())
    }

    async fn analyze_complete(&self, context: &AnalysisContext) -> Result<AnalysisResult> {
        let request = self.request(
            build_system_prompt(context),
            wire_messages(&[], &build_analysis_prompt(context)),
            ANALYSIS_MAX_TOKENS,
        );
        let text = self.complete(&request).await?;
        Ok(decompose_response(&text, CONFIDENCE))
    }

    async fn analyze_streaming(
        &self,
        context: &AnalysisContext,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<()> {
        let request = self.request(
            build_system_prompt(context),
            wire_messages(&[], &build_analysis_prompt(context)),
            ANALYSIS_MAX_TOKENS,
        );
        self.stream(request, tx).await
    }

    async fn chat_complete(
        &self,
        message: &str,
        history: &[ChatMessage],
        context: &AnalysisContext,
    ) -> Result<String> {
        let request = self.request(
            build_system_prompt(context),
            wire_messages(history, message),
            CHAT_MAX_TOKENS,
        );
        self.complete(&request).await
    }

    async fn chat_streaming(
        &self,
        message: &str,
        history: &[ChatMessage],
        context: &AnalysisContext,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<()> {
        let request = self.request(
            build_system_prompt(context),
            wire_messages(history, message),
            CHAT_MAX_TOKENS,
        );
        self.stream(request, tx).await
    }

    async fn health_check(&self) -> bool {
        let Ok(api_key) = self.api_key() else {
            return false;
        };

        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: 10,
            temperature: 0.0,
            system: String::new(),
            messages: vec![WireMessage {
                role: "user",
                content: "Test".to_string(),
            }],
            stream: None,
        };
        match self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .timeout(Duration::from_secs(5))
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("Claude health check failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_messages_preserve_history_order() {
        let history = vec![
            ChatMessage::user("why did it fail?"),
            ChatMessage::assistant("disk was full"),
        ];
        let messages = wire_messages(&history, "how do I fix it?");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[1].role, "assistant");
        assert_eq!(messages[2].role, "user");
        assert_eq!(messages[2].content, "how do I fix it?");
    }

    #[test]
    fn test_response_text_skips_non_text_blocks() {
        let response: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"text","text":"part one"},{"type":"tool_use","id":"x","name":"t","input":{}},{"type":"text","text":" part two"}]}"#,
        )
        .unwrap();
        assert_eq!(response.text(), "part one part two");
    }

    #[test]
    fn test_stream_event_text_delta() {
        let event: StreamApiEvent = serde_json::from_str(
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hello"}}"#,
        )
        .unwrap();
        match event {
            StreamApiEvent::ContentBlockDelta {
                delta: Delta::TextDelta { text },
            } => assert_eq!(text, "Hello"),
            _ => panic!("Expected text delta"),
        }
    }

    #[test]
    fn test_stream_event_unknown_tolerated() {
        let event: StreamApiEvent =
            serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(event, StreamApiEvent::Other));
    }

    #[tokio::test]
    async fn test_uninitialized_analyze_rejected() {
        let backend = ClaudeBackend::new();
        let context = AnalysisContext::default();
        match backend.analyze_complete(&context).await {
            Err(Error::NotInitialized(name)) => assert_eq!(name, "claude"),
            _ => panic!("Expected NotInitialized"),
        }
    }

    #[tokio::test]
    async fn test_uninitialized_health_check_false() {
        assert!(!ClaudeBackend::new().health_check().await);
    }
}
