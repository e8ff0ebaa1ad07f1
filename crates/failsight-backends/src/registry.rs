use crate::claude::ClaudeBackend;
use crate::gemini::GeminiBackend;
use crate::rpc::RpcBackend;
use crate::traits::{AnalysisBackend, BackendConfig};
use failsight_types::BackendListing;
use std::collections::{BTreeMap, HashMap};
use tracing::{error, info};

/// Per-backend configuration, keyed by backend name
pub type BackendSettings = BTreeMap<String, BackendConfig>;

/// Explicit backend registry, constructed once at startup and threaded
/// through call sites instead of living as ambient global state.
///
/// Registration happens before any lookups; after that the registry is
/// read-only, so no synchronization is needed.
#[derive(Default)]
pub struct BackendRegistry {
    backends: HashMap<String, Box<dyn AnalysisBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend. A second registration under the same name
    /// replaces the first.
    pub fn register(&mut self, backend: Box<dyn AnalysisBackend>) {
        info!(backend = backend.name(), "registering analysis backend");
        self.backends.insert(backend.name().to_string(), backend);
    }

    pub fn get(&self, name: &str) -> Option<&dyn AnalysisBackend> {
        self.backends.get(name).map(|b| b.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.backends.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Capability listing for all registered backends, sorted by name
    pub fn list_available(&self) -> BackendListing {
        let mut available: Vec<_> = self.backends.values().map(|b| b.info()).collect();
        available.sort_by(|a, b| a.name.cmp(&b.name));
        BackendListing {
            total: available.len(),
            available,
        }
    }

    /// Initialize every registered backend independently.
    ///
    /// Each backend gets its own config section (or the default). A failing
    /// backend is logged and skipped; it never blocks the others.
    pub async fn initialize_all(&mut self, settings: &BackendSettings) {
        for (name, backend) in self.backends.iter_mut() {
            let config = settings.get(name).cloned().unwrap_or_default();
            match backend.initialize(&config).await {
                Ok(()) => {
                    info!(
                        backend = name.as_str(),
                        initialized = backend.is_initialized(),
                        "backend initialization finished"
                    );
                }
                Err(e) => {
                    error!(backend = name.as_str(), error = %e, "backend initialization failed");
                }
            }
        }
    }
}

/// Startup discovery: the registry with every built-in backend registered.
pub fn default_registry() -> BackendRegistry {
    let mut registry = BackendRegistry::new();
    registry.register(Box::new(GeminiBackend::new()));
    registry.register(Box::new(ClaudeBackend::new()));
    registry.register(Box::new(RpcBackend::new()));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::StreamEvent;
    use crate::{Error, Result};
    use async_trait::async_trait;
    use failsight_types::{AnalysisContext, AnalysisResult, ChatMessage};
    use tokio::sync::mpsc;

    struct FakeBackend {
        name: &'static str,
        fail_initialize: bool,
        initialized: bool,
    }

    impl FakeBackend {
        fn new(name: &'static str, fail_initialize: bool) -> Self {
            Self {
                name,
                fail_initialize,
                initialized: false,
            }
        }
    }

    #[async_trait]
    impl AnalysisBackend for FakeBackend {
        fn name(&self) -> &'static str {
            self.name
        }

        fn display_name(&self) -> &'static str {
            "Fake"
        }

        fn is_initialized(&self) -> bool {
            self.initialized
        }

        async fn initialize(&mut self, _config: &BackendConfig) -> Result<()> {
            if self.fail_initialize {
                return Err(Error::Network("boom".to_string()));
            }
            self.initialized = true;
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
            let _ = tx.send(StreamEvent::Text("chunk".to_string())).await;
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
            _tx: mpsc::Sender<StreamEvent>,
        ) -> Result<()> {
            Ok(())
        }

        async fn health_check(&self) -> bool {
            self.initialized
        }
    }

    #[test]
    fn test_same_name_replaces_previous() {
        let mut registry = BackendRegistry::new();
        registry.register(Box::new(FakeBackend::new("dup", true)));
        registry.register(Box::new(FakeBackend::new("dup", false)));

        assert_eq!(registry.list_available().total, 1);
        assert_eq!(registry.names(), vec!["dup"]);
    }

    #[test]
    fn test_get_unknown_backend() {
        let registry = BackendRegistry::new();
        assert!(registry.get("nope").is_none());
    }

    #[tokio::test]
    async fn test_initialize_all_continues_past_failure() {
        let mut registry = BackendRegistry::new();
        registry.register(Box::new(FakeBackend::new("bad", true)));
        registry.register(Box::new(FakeBackend::new("good", false)));

        registry.initialize_all(&BackendSettings::new()).await;

        assert!(!registry.get("bad").unwrap().is_initialized());
        assert!(registry.get("good").unwrap().is_initialized());
    }

    #[test]
    fn test_default_registry_has_all_backends() {
        let registry = default_registry();
        let listing = registry.list_available();
        assert_eq!(listing.total, 3);
        let names: Vec<_> = listing.available.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["claude", "gemini", "rpc"]);
        assert!(listing.available.iter().all(|b| !b.initialized));
        assert!(listing.available.iter().all(|b| b.supports_streaming));
    }
}
