use thiserror::Error;

/// Why a remote operation failed. Drives both retry and user messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RateLimited,
    Overloaded,
    Auth,
    BadRequest,
    /// The service answered but produced no image.
    NoCandidate,
    /// Timeout or connection failure before a response arrived.
    Transport,
    Other,
}

impl FailureKind {
    pub fn from_status(code: u16) -> Self {
        match code {
            429 => Self::RateLimited,
            503 => Self::Overloaded,
            401 | 403 => Self::Auth,
            400 | 404 | 422 => Self::BadRequest,
            _ => Self::Other,
        }
    }

    /// Classifies a failure from its text alone. Only used when no status
    /// code is available, or to spot auth problems reported as 400/404.
    pub fn from_message(message: &str) -> Self {
        let lowered = message.to_ascii_lowercase();
        if lowered.contains("requested entity was not found")
            || lowered.contains("403")
            || lowered.contains("api key")
        {
            return Self::Auth;
        }
        if lowered.contains("503") || lowered.contains("overloaded") {
            return Self::Overloaded;
        }
        if lowered.contains("429") || lowered.contains("quota") || lowered.contains("rate limit")
        {
            return Self::RateLimited;
        }
        Self::Other
    }

    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::Overloaded | Self::Transport)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::Overloaded => "overloaded",
            Self::Auth => "auth",
            Self::BadRequest => "bad_request",
            Self::NoCandidate => "no_candidate",
            Self::Transport => "transport",
            Self::Other => "other",
        }
    }
}

/// A failed remote operation, after any retries the gateway made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct GatewayError {
    pub kind: FailureKind,
    pub message: String,
    pub status: Option<u16>,
    /// Finish or block reason reported alongside an empty result.
    pub reason: Option<String>,
    pub attempts: u32,
    /// Set when a retryable failure ran out of attempts.
    pub exhausted: bool,
}

impl GatewayError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            reason: None,
            attempts: 1,
            exhausted: false,
        }
    }

    pub fn from_status(code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut kind = FailureKind::from_status(code);
        if matches!(kind, FailureKind::BadRequest | FailureKind::Other)
            && FailureKind::from_message(&message) == FailureKind::Auth
        {
            kind = FailureKind::Auth;
        }
        Self {
            status: Some(code),
            ..Self::new(kind, message)
        }
    }

    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(FailureKind::from_message(&message), message)
    }

    pub fn no_candidate(reason: Option<String>) -> Self {
        let reason = reason
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let message = match reason.as_deref() {
            Some(reason) => format!("no image candidate returned (reason: {reason})"),
            None => "no image candidate returned".to_string(),
        };
        Self {
            reason,
            ..Self::new(FailureKind::NoCandidate, message)
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceBusyKind {
    RateLimited,
    Overloaded,
}

/// Every way a design request can fail, as seen by the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StudioError {
    #[error("{0}")]
    Validation(String),
    #[error("service busy after {attempts} attempts: {message}")]
    TransientService {
        kind: ServiceBusyKind,
        attempts: u32,
        message: String,
    },
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("no image produced: {message}")]
    NoResult {
        reason: Option<String>,
        message: String,
    },
    #[error("image decode failed: {0}")]
    Decode(String),
    #[error("{0}")]
    Other(String),
}

impl StudioError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Text shown in the status line when this error lands the session in ERROR.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::TransientService { .. } => {
                "Service Busy: The AI model is currently overloaded. Please wait a moment and try again.".to_string()
            }
            Self::Auth(_) => {
                "Authentication Error: Please check your API key and try again.".to_string()
            }
            Self::NoResult {
                reason: Some(reason),
                ..
            } => format!(
                "The AI couldn't generate the image (Reason: {reason}). Please try a different photo or style."
            ),
            Self::NoResult { reason: None, .. } => {
                "No image generated by the AI. Please try again.".to_string()
            }
            Self::Decode(_) => {
                "We couldn't read that image. Please upload a JPEG, PNG or WebP photo.".to_string()
            }
            Self::Other(message) => format!("Error: {message}"),
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::TransientService { .. } => "transient_service",
            Self::Auth(_) => "auth",
            Self::NoResult { .. } => "no_result",
            Self::Decode(_) => "decode",
            Self::Other(_) => "other",
        }
    }
}

impl From<GatewayError> for StudioError {
    fn from(err: GatewayError) -> Self {
        match err.kind {
            FailureKind::RateLimited => Self::TransientService {
                kind: ServiceBusyKind::RateLimited,
                attempts: err.attempts,
                message: err.message,
            },
            FailureKind::Overloaded | FailureKind::Transport => Self::TransientService {
                kind: ServiceBusyKind::Overloaded,
                attempts: err.attempts,
                message: err.message,
            },
            FailureKind::Auth => Self::Auth(err.message),
            FailureKind::NoCandidate => Self::NoResult {
                reason: err.reason,
                message: err.message,
            },
            FailureKind::BadRequest | FailureKind::Other => Self::Other(err.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FailureKind, GatewayError, ServiceBusyKind, StudioError};

    #[test]
    fn status_codes_map_to_kinds() {
        assert_eq!(FailureKind::from_status(429), FailureKind::RateLimited);
        assert_eq!(FailureKind::from_status(503), FailureKind::Overloaded);
        assert_eq!(FailureKind::from_status(403), FailureKind::Auth);
        assert_eq!(FailureKind::from_status(422), FailureKind::BadRequest);
        assert_eq!(FailureKind::from_status(500), FailureKind::Other);
    }

    #[test]
    fn only_transient_kinds_retry() {
        assert!(FailureKind::RateLimited.is_retryable());
        assert!(FailureKind::Overloaded.is_retryable());
        assert!(FailureKind::Transport.is_retryable());
        assert!(!FailureKind::Auth.is_retryable());
        assert!(!FailureKind::BadRequest.is_retryable());
        assert!(!FailureKind::NoCandidate.is_retryable());
    }

    #[test]
    fn message_fallback_classification() {
        assert_eq!(
            FailureKind::from_message("Resource exhausted: quota exceeded"),
            FailureKind::RateLimited
        );
        assert_eq!(
            FailureKind::from_message("The model is overloaded"),
            FailureKind::Overloaded
        );
        assert_eq!(
            FailureKind::from_message("Requested entity was not found."),
            FailureKind::Auth
        );
        assert_eq!(FailureKind::from_message("boom"), FailureKind::Other);
    }

    #[test]
    fn invalid_key_reported_as_400_is_auth() {
        let err = GatewayError::from_status(400, "API key not valid. Please pass a valid API key.");
        assert_eq!(err.kind, FailureKind::Auth);
        assert_eq!(err.status, Some(400));
        assert!(!err.is_retryable());
    }

    #[test]
    fn exhausted_rate_limit_becomes_service_busy() {
        let mut err = GatewayError::from_status(429, "Too many requests");
        err.attempts = 4;
        err.exhausted = true;
        let studio = StudioError::from(err);
        assert_eq!(
            studio,
            StudioError::TransientService {
                kind: ServiceBusyKind::RateLimited,
                attempts: 4,
                message: "Too many requests".to_string(),
            }
        );
        assert!(studio.user_message().starts_with("Service Busy"));
    }

    #[test]
    fn no_candidate_message_includes_reason() {
        let studio = StudioError::from(GatewayError::no_candidate(Some("SAFETY".to_string())));
        assert_eq!(
            studio.user_message(),
            "The AI couldn't generate the image (Reason: SAFETY). Please try a different photo or style."
        );
        let bare = StudioError::from(GatewayError::no_candidate(None));
        assert_eq!(
            bare.user_message(),
            "No image generated by the AI. Please try again."
        );
    }

    #[test]
    fn other_failures_are_prefixed() {
        let studio = StudioError::from(GatewayError::from_status(500, "internal"));
        assert_eq!(studio.user_message(), "Error: internal");
    }
}
