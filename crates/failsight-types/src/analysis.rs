use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::report::{FailureRecord, LogExcerpt, TestRunSummary};

/// Everything a backend needs to analyze one test run.
///
/// Built per (job, report) pair and handed to backends by shared reference;
/// backends must not mutate it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisContext {
    pub failures: Vec<FailureRecord>,
    /// Skips are surfaced separately, never mixed into `failures`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_tests: Vec<FailureRecord>,
    pub summary: TestRunSummary,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub log_excerpts: Vec<LogExcerpt>,
    /// Optional environment/deployment details from operational log bundles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_info: Option<BTreeMap<String, String>>,
}

/// One best-effort insight mined from an AI response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureInsight {
    pub description: String,
}

/// Structured result of a non-streaming analysis call.
///
/// The decomposition of the response text is heuristic; empty collections are
/// a valid outcome. `confidence` is a fixed per-backend constant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: String,
    pub failure_insights: Vec<FailureInsight>,
    pub suggested_solutions: Vec<String>,
    pub correlated_logs: Vec<String>,
    pub confidence: f32,
}

/// Role of a chat history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of conversation history, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Capability descriptor for one registered backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendInfo {
    pub name: String,
    pub display_name: String,
    pub supports_streaming: bool,
    pub initialized: bool,
}

/// Listing of all registered backends, as served to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendListing {
    pub available: Vec<BackendInfo>,
    pub total: usize,
}
