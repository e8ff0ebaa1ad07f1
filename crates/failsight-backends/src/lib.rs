// Error types
pub mod error;

// Backend capability trait (public API)
pub mod traits;

// Backend implementations
pub mod claude;
pub mod gemini;
pub mod rpc;

// Shared prompt construction
pub mod prompt;

// Response text mining
pub mod postprocess;

// SSE decoding and outbound framing
pub mod sse;

// Backend registry
pub mod registry;

// Traits
pub use traits::{AnalysisBackend, BackendConfig, StreamEvent};

// Backends
pub use claude::ClaudeBackend;
pub use gemini::GeminiBackend;
pub use rpc::RpcBackend;

// Prompt construction
pub use prompt::{build_analysis_prompt, build_system_prompt, format_failures};

// Response post-processing
pub use postprocess::decompose_response;

// Streaming bridge
pub use sse::{DONE_FRAME, SseChunk, SseDecoder, bridge_events, frame_error, frame_text};

// Registry
pub use registry::{BackendRegistry, BackendSettings, default_registry};

// Error types
pub use error::{Error, Result};
