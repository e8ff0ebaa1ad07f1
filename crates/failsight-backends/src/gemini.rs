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

const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Fixed confidence constant for Gemini results
const CONFIDENCE: f32 = 0.85;

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

impl GeminiResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

fn user_content(text: &str) -> GeminiContent {
    GeminiContent {
        role: Some("user".to_string()),
        parts: vec![GeminiPart {
            text: text.to_string(),
        }],
    }
}

/// Map chat history onto Gemini's contents format, order and roles preserved
fn history_contents(history: &[ChatMessage], message: &str) -> Vec<GeminiContent> {
    let mut contents: Vec<GeminiContent> = history
        .iter()
        .map(|m| GeminiContent {
            role: Some(match m.role {
                ChatRole::User => "user".to_string(),
                ChatRole::Assistant => "model".to_string(),
            }),
            parts: vec![GeminiPart {
                text: m.content.clone(),
            }],
        })
        .collect();
    contents.push(user_content(message));
    contents
}

/// Gemini analysis backend
pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    initialized: bool,
}

impl GeminiBackend {
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

    async fn generate(&self, request: &GeminiRequest) -> Result<String> {
        let url = format!("{}/{}:generateContent", API_BASE, self.model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key()?)
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

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;
        Ok(parsed.text())
    }

    async fn generate_streaming(
        &self,
        request: &GeminiRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<()> {
        let api_key = match self.api_key() {
            Ok(key) => key,
            Err(e) => return Err(e),
        };

        let url = format!(
            "{}/{}:streamGenerateContent?alt=sse",
            API_BASE, self.model
        );
        let response = match self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(request)
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

                let Some(payload) = line.strip_prefix("data: ") else {
                    continue;
                };
                let Ok(parsed) = serde_json::from_str::<GeminiResponse>(payload) else {
                    continue;
                };
                let text = parsed.text();
                if !text.is_empty() && tx.send(StreamEvent::Text(text)).await.is_err() {
                    // Consumer hung up; drop the connection
                    return Ok(());
                }
            }
        }

        Ok(())
    }
}

impl Default for GeminiBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnalysisBackend for GeminiBackend {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn display_name(&self) -> &'static str {
        "Google Gemini 2.0 Flash"
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
                info!("Gemini backend initialized");
            }
            _ => {
                warn!("Gemini API key not provided");
                self.initialized = false;
            }
        }
        Ok(())
    }

    async fn analyze_complete(&self, context: &AnalysisContext) -> Result<AnalysisResult> {
        let full_prompt = format!(
            "{}\n\n{}",
            build_system_prompt(context),
            build_analysis_prompt(context)
        );
        let request = GeminiRequest {
            contents: vec![user_content(&full_prompt)],
            system_instruction: None,
        };
        let text = self.generate(&request).await?;
        Ok(decompose_response(&text, CONFIDENCE))
    }

    async fn analyze_streaming(
        &self,
        context: &AnalysisContext,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<()> {
        let full_prompt = format!(
            "{}\n\n{}",
            build_system_prompt(context),
            build_analysis_prompt(context)
        );
        let request = GeminiRequest {
            contents: vec![user_content(&full_prompt)],
            system_instruction: None,
        };
        self.generate_streaming(&request, tx).await
    }

    async fn chat_complete(
        &self,
        message: &str,
        history: &[ChatMessage],
        context: &AnalysisContext,
    ) -> Result<String> {
        let request = GeminiRequest {
            contents: history_contents(history, message),
            system_instruction: Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: build_system_prompt(context),
                }],
            }),
        };
        self.generate(&request).await
    }

    async fn chat_streaming(
        &self,
        message: &str,
        history: &[ChatMessage],
        context: &AnalysisContext,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<()> {
        let request = GeminiRequest {
            contents: history_contents(history, message),
            system_instruction: Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: build_system_prompt(context),
                }],
            }),
        };
        self.generate_streaming(&request, tx).await
    }

    async fn health_check(&self) -> bool {
        if !self.initialized {
            return false;
        }
        let Ok(api_key) = self.api_key() else {
            return false;
        };

        let url = format!("{}/{}:generateContent", API_BASE, self.model);
        let request = GeminiRequest {
            contents: vec![user_content("Test")],
            system_instruction: None,
        };
        match self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .timeout(Duration::from_secs(5))
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("Gemini health check failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uninitialized_rejects_before_network() {
        let backend = GeminiBackend::new();
        match backend.api_key() {
            Err(Error::NotInitialized(name)) => assert_eq!(name, "gemini"),
            _ => panic!("Expected NotInitialized"),
        }
    }

    #[tokio::test]
    async fn test_initialize_without_key_stays_uninitialized() {
        let mut backend = GeminiBackend::new();
        backend
            .initialize(&BackendConfig::default())
            .await
            .unwrap();
        assert!(!backend.is_initialized());
        assert!(!backend.health_check().await);
    }

    #[tokio::test]
    async fn test_initialize_with_key() {
        let mut backend = GeminiBackend::new();
        backend
            .initialize(&BackendConfig {
                api_key: Some("key-123".to_string()),
                model: Some("gemini-test".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(backend.is_initialized());
        assert_eq!(backend.model, "gemini-test");
    }

    #[test]
    fn test_history_mapping_preserves_order_and_roles() {
        let history = vec![
            ChatMessage::user("first question"),
            ChatMessage::assistant("first answer"),
        ];
        let contents = history_contents(&history, "follow-up");
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0].role.as_deref(), Some("user"));
        assert_eq!(contents[1].role.as_deref(), Some("model"));
        assert_eq!(contents[2].role.as_deref(), Some("user"));
        assert_eq!(contents[2].parts[0].text, "follow-up");
    }

    #[test]
    fn test_response_text_concatenates_parts() {
        let response: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"world"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(response.text(), "Hello world");
    }

    #[test]
    fn test_empty_response_text() {
        let response: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(response.text(), "");
    }
}
