use std::sync::Arc;
use std::thread;
use std::time::Duration;

use roomcraft_contracts::design::{DerivedData, EncodedImage};
use tracing::{debug, warn};

use crate::backends::{RemoteBackend, RemoteRequest};
use crate::config::StudioConfig;
use crate::error::GatewayError;

pub trait Sleeper: Send + Sync {
    fn sleep(&self, delay: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, delay: Duration) {
        thread::sleep(delay);
    }
}

/// Exponential backoff: the n-th retry waits `base_delay * 2^n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&StudioConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    pub fn from_config(config: &StudioConfig) -> Self {
        Self::new(config.max_retries, config.base_delay)
    }

    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Transform,
    Extract,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transform => "transform",
            Self::Extract => "extract",
        }
    }
}

/// Extraction never fails outright; a failed call yields empty data and keeps
/// the error for logging.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOutcome {
    pub data: DerivedData,
    pub error: Option<GatewayError>,
}

impl ExtractionOutcome {
    pub fn degraded(error: GatewayError) -> Self {
        Self {
            data: DerivedData::empty(),
            error: Some(error),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Single entry point for remote calls, applying the retry policy.
#[derive(Clone)]
pub struct Gateway {
    backend: Arc<dyn RemoteBackend>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl Gateway {
    pub fn new(backend: Arc<dyn RemoteBackend>, policy: RetryPolicy) -> Self {
        Self {
            backend,
            policy,
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Runs `call` until it succeeds, fails with a non-retryable error, or
    /// the retry budget is spent. The returned error records the attempt count.
    pub fn invoke<T>(
        &self,
        kind: OperationKind,
        mut call: impl FnMut() -> Result<T, GatewayError>,
    ) -> Result<T, GatewayError> {
        let mut retry = 0u32;
        loop {
            match call() {
                Ok(value) => {
                    if retry > 0 {
                        debug!(
                            operation = kind.as_str(),
                            attempts = retry + 1,
                            "remote call recovered"
                        );
                    }
                    return Ok(value);
                }
                Err(mut err) => {
                    err.attempts = retry + 1;
                    if !err.is_retryable() {
                        return Err(err);
                    }
                    if retry >= self.policy.max_retries {
                        err.exhausted = true;
                        warn!(
                            operation = kind.as_str(),
                            attempts = err.attempts,
                            failure = err.kind.as_str(),
                            "retries exhausted"
                        );
                        return Err(err);
                    }
                    let delay = self.policy.delay_for(retry);
                    warn!(
                        operation = kind.as_str(),
                        retry = retry + 1,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        failure = err.kind.as_str(),
                        "transient failure; backing off"
                    );
                    self.sleeper.sleep(delay);
                    retry += 1;
                }
            }
        }
    }

    pub fn invoke_transform(&self, request: &RemoteRequest) -> Result<EncodedImage, GatewayError> {
        self.invoke(OperationKind::Transform, || self.backend.transform(request))
    }

    pub fn invoke_extract(&self, request: &RemoteRequest) -> ExtractionOutcome {
        match self.invoke(OperationKind::Extract, || self.backend.extract(request)) {
            Ok(payload) => ExtractionOutcome {
                data: DerivedData::from_payload(payload),
                error: None,
            },
            Err(err) => {
                warn!(
                    failure = err.kind.as_str(),
                    attempts = err.attempts,
                    error = %err,
                    "extraction failed; continuing with empty results"
                );
                ExtractionOutcome::degraded(err)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use roomcraft_contracts::design::{EncodedImage, ExtractedItem, ExtractionPayload};

    use super::{Gateway, RetryPolicy, Sleeper};
    use crate::backends::{RemoteBackend, RemoteRequest};
    use crate::error::{FailureKind, GatewayError, ServiceBusyKind, StudioError};

    #[derive(Default)]
    pub(crate) struct RecordingSleeper {
        pub(crate) delays: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub(crate) fn recorded(&self) -> Vec<Duration> {
            self.delays.lock().map(|rows| rows.clone()).unwrap_or_default()
        }
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, delay: Duration) {
            if let Ok(mut rows) = self.delays.lock() {
                rows.push(delay);
            }
        }
    }

    /// Backend replaying scripted results, then succeeding.
    #[derive(Default)]
    struct ScriptedBackend {
        transform_script: Mutex<VecDeque<GatewayError>>,
        extract_script: Mutex<VecDeque<GatewayError>>,
        transform_calls: AtomicU32,
        extract_calls: AtomicU32,
    }

    impl ScriptedBackend {
        fn failing_transforms(errors: Vec<GatewayError>) -> Self {
            Self {
                transform_script: Mutex::new(errors.into()),
                ..Self::default()
            }
        }

        fn failing_extracts(errors: Vec<GatewayError>) -> Self {
            Self {
                extract_script: Mutex::new(errors.into()),
                ..Self::default()
            }
        }
    }

    impl RemoteBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        fn transform(&self, _request: &RemoteRequest) -> Result<EncodedImage, GatewayError> {
            self.transform_calls.fetch_add(1, Ordering::SeqCst);
            match self.transform_script.lock().ok().and_then(|mut q| q.pop_front()) {
                Some(err) => Err(err),
                None => Ok(EncodedImage::new(vec![7], "image/png")),
            }
        }

        fn extract(&self, _request: &RemoteRequest) -> Result<ExtractionPayload, GatewayError> {
            self.extract_calls.fetch_add(1, Ordering::SeqCst);
            match self.extract_script.lock().ok().and_then(|mut q| q.pop_front()) {
                Some(err) => Err(err),
                None => Ok(ExtractionPayload {
                    furniture: vec![ExtractedItem {
                        item_name: "Sofa".to_string(),
                        color: "Blue".to_string(),
                        search_query: "blue sofa".to_string(),
                    }],
                    palette: Vec::new(),
                }),
            }
        }
    }

    fn gateway(backend: Arc<ScriptedBackend>, sleeper: Arc<RecordingSleeper>) -> Gateway {
        Gateway::new(backend, RetryPolicy::new(3, Duration::from_millis(2000))).with_sleeper(sleeper)
    }

    fn request() -> RemoteRequest {
        RemoteRequest::new(EncodedImage::new(vec![1], "image/jpeg"), "prompt")
    }

    #[test]
    fn delays_double_from_base() {
        let policy = RetryPolicy::new(3, Duration::from_millis(2000));
        assert_eq!(policy.delay_for(0), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(4000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(8000));
    }

    #[test]
    fn persistent_rate_limit_retries_exactly_max_times() {
        let backend = Arc::new(ScriptedBackend::failing_transforms(
            (0..10)
                .map(|_| GatewayError::from_status(429, "Too many requests"))
                .collect(),
        ));
        let sleeper = Arc::new(RecordingSleeper::default());
        let result = gateway(backend.clone(), sleeper.clone()).invoke_transform(&request());

        let err = match result {
            Ok(_) => panic!("expected exhaustion"),
            Err(err) => err,
        };
        assert_eq!(err.kind, FailureKind::RateLimited);
        assert!(err.exhausted);
        assert_eq!(err.attempts, 4);
        assert_eq!(backend.transform_calls.load(Ordering::SeqCst), 4);
        assert_eq!(
            sleeper.recorded(),
            vec![
                Duration::from_millis(2000),
                Duration::from_millis(4000),
                Duration::from_millis(8000),
            ]
        );
    }

    #[test]
    fn recovers_after_transient_failures() -> anyhow::Result<()> {
        let backend = Arc::new(ScriptedBackend::failing_transforms(vec![
            GatewayError::from_status(503, "overloaded"),
            GatewayError::new(FailureKind::Transport, "connection reset"),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let image = gateway(backend.clone(), sleeper.clone()).invoke_transform(&request())?;
        assert_eq!(image.bytes, vec![7]);
        assert_eq!(backend.transform_calls.load(Ordering::SeqCst), 3);
        assert_eq!(sleeper.recorded().len(), 2);
        Ok(())
    }

    #[test]
    fn non_transient_failure_is_not_retried() {
        let backend = Arc::new(ScriptedBackend::failing_transforms(vec![
            GatewayError::from_status(400, "Invalid argument"),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let result = gateway(backend.clone(), sleeper.clone()).invoke_transform(&request());

        let err = match result {
            Ok(_) => panic!("expected failure"),
            Err(err) => err,
        };
        assert_eq!(err.kind, FailureKind::BadRequest);
        assert_eq!(err.attempts, 1);
        assert!(!err.exhausted);
        assert_eq!(backend.transform_calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.recorded().is_empty());
    }

    #[test]
    fn zero_retries_fails_on_first_transient_error() {
        let backend = Arc::new(ScriptedBackend::failing_transforms(vec![
            GatewayError::from_status(503, "overloaded"),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let gateway = Gateway::new(backend.clone(), RetryPolicy::new(0, Duration::from_secs(2)))
            .with_sleeper(sleeper.clone());
        let err = match gateway.invoke_transform(&request()) {
            Ok(_) => panic!("expected failure"),
            Err(err) => err,
        };
        assert!(err.exhausted);
        assert_eq!(backend.transform_calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.recorded().is_empty());
    }

    #[test]
    fn exhausted_transport_failures_surface_as_service_busy() {
        let backend = Arc::new(ScriptedBackend::failing_transforms(
            (0..4)
                .map(|_| GatewayError::new(FailureKind::Transport, "operation timed out"))
                .collect(),
        ));
        let sleeper = Arc::new(RecordingSleeper::default());
        let err = match gateway(backend.clone(), sleeper.clone()).invoke_transform(&request()) {
            Ok(_) => panic!("expected exhaustion"),
            Err(err) => err,
        };
        assert_eq!(err.kind, FailureKind::Transport);
        assert!(err.exhausted);
        assert_eq!(err.attempts, 4);
        assert_eq!(sleeper.recorded().len(), 3);

        let studio_err = StudioError::from(err);
        assert!(matches!(
            studio_err,
            StudioError::TransientService {
                kind: ServiceBusyKind::Overloaded,
                attempts: 4,
                ..
            }
        ));
        assert_eq!(studio_err.kind_str(), "transient_service");
        assert_eq!(
            studio_err.user_message(),
            "Service Busy: The AI model is currently overloaded. Please wait a moment and try again."
        );
    }

    #[test]
    fn extraction_failure_degrades_to_empty_data() {
        let backend = Arc::new(ScriptedBackend::failing_extracts(vec![
            GatewayError::from_status(500, "internal"),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let outcome = gateway(backend.clone(), sleeper).invoke_extract(&request());
        assert!(outcome.is_degraded());
        assert!(outcome.data.is_empty());
        assert_eq!(backend.extract_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn extraction_success_assigns_item_ids() {
        let backend = Arc::new(ScriptedBackend::default());
        let sleeper = Arc::new(RecordingSleeper::default());
        let outcome = gateway(backend, sleeper).invoke_extract(&request());
        assert!(!outcome.is_degraded());
        assert_eq!(outcome.data.items.len(), 1);
        assert!(!outcome.data.items[0].id.is_empty());
    }
}
