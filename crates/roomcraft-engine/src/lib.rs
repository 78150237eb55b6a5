//! Room redesign engine: image normalization, prompt construction, the
//! retrying remote gateway and the session orchestrator.

pub mod backends;
pub mod config;
pub mod error;
pub mod gateway;
pub mod normalize;
pub mod prompts;
pub mod shopping;
pub mod studio;

pub use backends::{default_backend_registry, BackendRegistry, RemoteBackend, RemoteRequest};
pub use config::StudioConfig;
pub use error::{FailureKind, GatewayError, ServiceBusyKind, StudioError};
pub use gateway::{ExtractionOutcome, Gateway, OperationKind, RetryPolicy, Sleeper, ThreadSleeper};
pub use normalize::{ImageNormalizer, NormalizedImage};
pub use shopping::shopping_url;
pub use studio::{
    ExtractionCompletion, GenerationOutcome, GenerationReport, PendingGeneration, Pipeline, Studio,
    TransformCompletion,
};
