use anyhow::bail;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    #[default]
    Idle,
    Generating,
    Extracting,
    Complete,
    Error,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "IDLE",
            Phase::Generating => "GENERATING",
            Phase::Extracting => "EXTRACTING",
            Phase::Complete => "COMPLETE",
            Phase::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    Start,
    ValidationFailed,
    TransformSucceeded,
    TransformFailed,
    ExtractionFinished,
    Reset,
}

/// Pipeline status shown to the user, with an optional message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessingStatus {
    phase: Phase,
    message: Option<String>,
}

impl ProcessingStatus {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.phase, Phase::Generating | Phase::Extracting)
    }

    pub fn next_phase(&self, event: StatusEvent) -> Option<Phase> {
        use StatusEvent::*;
        match (self.phase, event) {
            (_, Reset) => Some(Phase::Idle),
            // A newer request may supersede one still in flight.
            (_, Start) => Some(Phase::Generating),
            (Phase::Idle | Phase::Complete | Phase::Error, ValidationFailed) => Some(Phase::Error),
            (Phase::Generating, TransformSucceeded) => Some(Phase::Extracting),
            (Phase::Generating, TransformFailed) => Some(Phase::Error),
            (Phase::Extracting, ExtractionFinished) => Some(Phase::Complete),
            _ => None,
        }
    }

    pub fn transition(
        &mut self,
        event: StatusEvent,
        message: Option<String>,
    ) -> anyhow::Result<Phase> {
        let Some(next) = self.next_phase(event) else {
            bail!(
                "invalid status transition from {} on {:?}",
                self.phase.as_str(),
                event
            );
        };
        self.phase = next;
        self.message = message;
        Ok(next)
    }
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.message.as_deref() {
            Some(message) => write!(f, "{}: {}", self.phase.as_str(), message),
            None => write!(f, "{}", self.phase.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Phase, ProcessingStatus, StatusEvent};

    #[test]
    fn happy_path_is_strictly_sequential() -> anyhow::Result<()> {
        let mut status = ProcessingStatus::idle();
        status.transition(StatusEvent::Start, Some("Reimagining your space...".into()))?;
        assert!(status.is_busy());
        status.transition(StatusEvent::TransformSucceeded, None)?;
        assert_eq!(status.phase(), Phase::Extracting);
        status.transition(StatusEvent::ExtractionFinished, None)?;
        assert_eq!(status.phase(), Phase::Complete);
        assert!(!status.is_busy());
        Ok(())
    }

    #[test]
    fn extraction_cannot_finish_before_transform() {
        let mut status = ProcessingStatus::idle();
        assert!(status
            .transition(StatusEvent::ExtractionFinished, None)
            .is_err());
        assert_eq!(status.phase(), Phase::Idle);
    }

    #[test]
    fn extracting_never_reaches_error() {
        let mut status = ProcessingStatus::idle();
        let _ = status.transition(StatusEvent::Start, None);
        let _ = status.transition(StatusEvent::TransformSucceeded, None);
        assert_eq!(status.next_phase(StatusEvent::TransformFailed), None);
        assert_eq!(status.next_phase(StatusEvent::ValidationFailed), None);
    }

    #[test]
    fn display_includes_message() -> anyhow::Result<()> {
        let mut status = ProcessingStatus::idle();
        status.transition(StatusEvent::ValidationFailed, Some("missing items".into()))?;
        assert_eq!(status.to_string(), "ERROR: missing items");
        Ok(())
    }
}
