// Integration tests for the streaming contract: backend chunk source → channel → SSE bridge
use async_trait::async_trait;
use failsight_backends::{
    AnalysisBackend, BackendConfig, DONE_FRAME, Result, StreamEvent, bridge_events, frame_error,
    frame_text,
};
use failsight_types::{AnalysisContext, AnalysisResult, ChatMessage};
use futures::StreamExt;
use tokio::sync::mpsc;

/// Backend that emits scripted events, standing in for a provider stream
struct ScriptedBackend {
    events: Vec<StreamEvent>,
}

#[async_trait]
impl AnalysisBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn display_name(&self) -> &'static str {
        "Scripted"
    }

    fn is_initialized(&self) -> bool {
        true
    }

    async fn initialize(&mut self, _config: &BackendConfig) -> Result<()> {
        Ok(())
    }

    async fn analyze_complete(&self, _context: &AnalysisContext) -> Result<AnalysisResult> {
        Ok(AnalysisResult::default())
    }

    async fn analyze_streaming(
        &self,
        _context: &AnalysisContext,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<()> {
        for event in &self.events {
            if tx.send(event.clone()).await.is_err() {
                return Ok(());
            }
        }
        Ok(())
    }

    async fn chat_complete(
        &self,
        _message: &str,
        _history: &[ChatMessage],
        _context: &AnalysisContext,
    ) -> Result<String> {
        Ok(String::new())
    }

    async fn chat_streaming(
        &self,
        _message: &str,
        _history: &[ChatMessage],
        _context: &AnalysisContext,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<()> {
        self.analyze_streaming(&AnalysisContext::default(), tx).await
    }

    async fn health_check(&self) -> bool {
        true
    }
}

async fn run_bridge(events: Vec<StreamEvent>) -> Vec<String> {
    let backend = ScriptedBackend { events };
    let context = AnalysisContext::default();
    let (tx, rx) = mpsc::channel(16);

    let (call_result, frames) = tokio::join!(
        backend.analyze_streaming(&context, tx),
        bridge_events(rx).collect::<Vec<String>>()
    );
    call_result.expect("streaming call failed");
    frames
}

#[tokio::test]
async fn test_happy_path_frames_end_with_done() {
    let frames = run_bridge(vec![
        StreamEvent::Text("The failure".to_string()),
        StreamEvent::Text(" looks like disk exhaustion.".to_string()),
    ])
    .await;

    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0], frame_text("The failure"));
    assert_eq!(frames[1], frame_text(" looks like disk exhaustion."));
    assert_eq!(frames[2], DONE_FRAME);
}

#[tokio::test]
async fn test_error_mid_stream_still_terminates() {
    let frames = run_bridge(vec![
        StreamEvent::Text("partial".to_string()),
        StreamEvent::Error("backend timeout".to_string()),
    ])
    .await;

    assert_eq!(frames.len(), 3);
    assert_eq!(frames[1], frame_error("backend timeout"));
    assert_eq!(frames[2], DONE_FRAME);
    // Exactly one terminal sentinel, nothing after it
    assert_eq!(frames.iter().filter(|f| *f == DONE_FRAME).count(), 1);
    assert_eq!(frames.last().map(String::as_str), Some(DONE_FRAME));
}

#[tokio::test]
async fn test_empty_backend_stream_yields_lone_done() {
    let frames = run_bridge(Vec::new()).await;
    assert_eq!(frames, vec![DONE_FRAME.to_string()]);
}

#[tokio::test]
async fn test_dropped_consumer_cancels_backend() {
    let backend = ScriptedBackend {
        events: (0..1000)
            .map(|i| StreamEvent::Text(format!("chunk {}", i)))
            .collect(),
    };
    let context = AnalysisContext::default();
    let (tx, mut rx) = mpsc::channel(1);

    // Take one chunk, then abandon the stream
    let consumer = async {
        let first = rx.recv().await;
        drop(rx);
        first
    };
    let (first, call_result) = tokio::join!(consumer, backend.analyze_streaming(&context, tx));

    assert!(first.is_some());
    // The backend noticed the hangup and returned instead of pushing 1000 chunks
    call_result.expect("cancelled stream should not error");
}
