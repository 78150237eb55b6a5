use std::collections::BTreeMap;
use std::sync::Arc;

use roomcraft_contracts::design::{EncodedImage, ExtractionPayload};

use crate::config::StudioConfig;
use crate::error::GatewayError;

mod dryrun;
mod gemini;

pub use dryrun::{DryrunBackend, ScriptedCall};
pub use gemini::GeminiBackend;

/// One image plus the instruction text sent with it.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRequest {
    pub image: EncodedImage,
    pub prompt: String,
}

impl RemoteRequest {
    pub fn new(image: EncodedImage, prompt: impl Into<String>) -> Self {
        Self {
            image,
            prompt: prompt.into(),
        }
    }
}

/// A remote service able to transform room images and describe them.
///
/// Implementations make exactly one attempt per call; retries belong to the
/// gateway.
pub trait RemoteBackend: Send + Sync {
    fn name(&self) -> &str;
    fn transform(&self, request: &RemoteRequest) -> Result<EncodedImage, GatewayError>;
    fn extract(&self, request: &RemoteRequest) -> Result<ExtractionPayload, GatewayError>;
}

#[derive(Default)]
pub struct BackendRegistry {
    backends: BTreeMap<String, Arc<dyn RemoteBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<B: RemoteBackend + 'static>(&mut self, backend: B) {
        self.backends
            .insert(backend.name().to_string(), Arc::new(backend));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn RemoteBackend>> {
        self.backends.get(name.trim()).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.backends.keys().cloned().collect()
    }
}

pub fn default_backend_registry(config: &StudioConfig) -> BackendRegistry {
    let mut registry = BackendRegistry::new();
    registry.register(DryrunBackend::new());
    registry.register(GeminiBackend::new(config));
    registry
}
