use crate::ai::{GeminiBackend, GenerativeBackend};
use crate::config::ServerConfig;
use crate::docstore::DocumentStore;
use std::sync::Arc;

/// Shared application state passed to all route handlers. Either half may
/// be absent; the matching endpoints then degrade instead of failing to
/// start.
#[derive(Clone, Default)]
pub struct AppState {
    pub documents: Option<Arc<DocumentStore>>,
    pub ai: Option<Arc<dyn GenerativeBackend>>,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let documents = match &config.data_path {
            Some(path) => {
                let store = DocumentStore::open(path)?;
                tracing::info!(path = %path.display(), "project storage enabled");
                Some(Arc::new(store))
            }
            None => None,
        };
        let ai: Option<Arc<dyn GenerativeBackend>> = match &config.gemini {
            Some(gemini) => {
                let backend = GeminiBackend::new(gemini.clone())?;
                tracing::info!(model = %backend.name(), "AI suggestions enabled");
                Some(Arc::new(backend))
            }
            None => None,
        };
        Ok(Self { documents, ai })
    }

    pub fn storage_enabled(&self) -> bool {
        self.documents.is_some()
    }

    pub fn ai_enabled(&self) -> bool {
        self.ai.is_some()
    }
}
