use crate::Result;
use async_trait::async_trait;
use failsight_types::{AnalysisContext, AnalysisResult, BackendInfo, ChatMessage};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// One item of a backend's chunk stream.
///
/// A mid-stream failure travels as `Error` so the consumer can frame it and
/// still terminate the stream cleanly; it is not a call-level error.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Text(String),
    Error(String),
}

/// Per-backend configuration handed to `initialize`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Capability contract implemented by every analysis backend.
///
/// Streaming calls push into a channel: the call drives the provider stream
/// and sends chunks into `tx`, returning when the stream ends. A consumer
/// that drops its receiver cancels the call: sends start failing, the loop
/// bails out, and the underlying connection is dropped.
///
/// Responsibilities:
/// - Reject requests before any network call when not initialized
/// - Map chat history role-for-role onto the provider's native format
/// - Never panic or hang in `health_check`
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Unique backend ID (e.g. "gemini", "claude", "rpc")
    fn name(&self) -> &'static str;

    /// Human-readable name
    fn display_name(&self) -> &'static str;

    /// Whether this backend can stream partial results
    fn supports_streaming(&self) -> bool {
        true
    }

    /// Whether `initialize` succeeded
    fn is_initialized(&self) -> bool;

    /// Configure the backend. Idempotent.
    ///
    /// Missing credentials or an unreachable endpoint leave the backend in a
    /// non-initialized state and return Ok, so one misconfigured backend
    /// never blocks the others. Err is reserved for unexpected internal
    /// failures.
    async fn initialize(&mut self, config: &BackendConfig) -> Result<()>;

    /// Analyze failures and return one complete structured result
    async fn analyze_complete(&self, context: &AnalysisContext) -> Result<AnalysisResult>;

    /// Analyze failures, streaming text chunks into `tx`
    async fn analyze_streaming(
        &self,
        context: &AnalysisContext,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<()>;

    /// Answer one chat message with full context, non-streaming
    async fn chat_complete(
        &self,
        message: &str,
        history: &[ChatMessage],
        context: &AnalysisContext,
    ) -> Result<String>;

    /// Answer one chat message, streaming text chunks into `tx`
    async fn chat_streaming(
        &self,
        message: &str,
        history: &[ChatMessage],
        context: &AnalysisContext,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<()>;

    /// Cheap liveness probe; bounded wait, must not throw
    async fn health_check(&self) -> bool;

    /// Capability descriptor for listings
    fn info(&self) -> BackendInfo {
        BackendInfo {
            name: self.name().to_string(),
            display_name: self.display_name().to_string(),
            supports_streaming: self.supports_streaming(),
            initialized: self.is_initialized(),
        }
    }
}
