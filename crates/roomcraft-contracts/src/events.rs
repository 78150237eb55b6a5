//! Session event log (`events.jsonl`).
//!
//! Every line is a [`LoggedEvent`]: the session id, a timestamp and one
//! [`SessionEvent`] flattened next to them, tagged by `type`.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryDirection {
    Revert,
    Redo,
}

/// Where a superseded result was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Transform,
    Extract,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    SessionStarted {
        backend: String,
    },
    ImageUploaded {
        mime_type: String,
        bytes: usize,
        width: u32,
        height: u32,
    },
    GenerationStarted {
        request_id: u64,
        mode: String,
        is_refinement: bool,
        parent_version_id: Option<String>,
        prompt: String,
        focus_hint: Option<String>,
    },
    /// `request_id` is absent when the request was rejected before a token
    /// was issued.
    GenerationFailed {
        request_id: Option<u64>,
        kind: String,
        message: String,
        error: Option<String>,
    },
    VersionCreated {
        request_id: u64,
        version_id: String,
        parent_version_id: Option<String>,
        mime_type: String,
        bytes: usize,
        cursor: i64,
        versions: usize,
    },
    ExtractionCompleted {
        request_id: u64,
        items: usize,
        swatches: usize,
        degraded: bool,
        error: Option<String>,
    },
    StaleResultDiscarded {
        request_id: u64,
        latest_request_id: u64,
        stage: PipelineStage,
    },
    HistoryMoved {
        direction: HistoryDirection,
        cursor: i64,
        version_id: Option<String>,
    },
    ItemSaved {
        item_id: String,
        item_name: String,
        custom: bool,
    },
    ItemUnsaved {
        item_id: String,
        item_name: String,
    },
    SessionFinished {
        summary_path: String,
    },
}

impl SessionEvent {
    /// The `type` tag this event is written under.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SessionStarted { .. } => "session_started",
            Self::ImageUploaded { .. } => "image_uploaded",
            Self::GenerationStarted { .. } => "generation_started",
            Self::GenerationFailed { .. } => "generation_failed",
            Self::VersionCreated { .. } => "version_created",
            Self::ExtractionCompleted { .. } => "extraction_completed",
            Self::StaleResultDiscarded { .. } => "stale_result_discarded",
            Self::HistoryMoved { .. } => "history_moved",
            Self::ItemSaved { .. } => "item_saved",
            Self::ItemUnsaved { .. } => "item_unsaved",
            Self::SessionFinished { .. } => "session_finished",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedEvent {
    pub session_id: String,
    pub ts: String,
    #[serde(flatten)]
    pub event: SessionEvent,
}

/// Append-only log for one session. The file is opened once and each event
/// is written as a single compact line.
#[derive(Debug)]
pub struct EventLog {
    path: PathBuf,
    session_id: String,
    file: Mutex<File>,
}

impl EventLog {
    pub fn open(path: impl Into<PathBuf>, session_id: impl Into<String>) -> anyhow::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open event log {}", path.display()))?;
        Ok(Self {
            path,
            session_id: session_id.into(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn record(&self, event: SessionEvent) -> anyhow::Result<LoggedEvent> {
        let logged = LoggedEvent {
            session_id: self.session_id.clone(),
            ts: now_utc_iso(),
            event,
        };
        let mut line = serde_json::to_string(&logged)?;
        line.push('\n');
        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow::anyhow!("event log lock poisoned"))?;
        file.write_all(line.as_bytes())?;
        Ok(logged)
    }
}

/// Reads a session log back in file order. Lines that are not a known event
/// are skipped.
pub fn read_events(path: &Path) -> anyhow::Result<Vec<LoggedEvent>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(raw
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}

pub fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Write;

    use chrono::DateTime;
    use serde_json::Value;

    use super::*;

    fn uploaded() -> SessionEvent {
        SessionEvent::ImageUploaded {
            mime_type: "image/jpeg".to_string(),
            bytes: 2048,
            width: 640,
            height: 480,
        }
    }

    #[test]
    fn record_writes_one_tagged_line() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let log = EventLog::open(&path, "session-123")?;

        let logged = log.record(uploaded())?;

        let content = fs::read_to_string(&path)?;
        assert_eq!(content.lines().count(), 1);
        let row: Value = serde_json::from_str(content.trim_end())?;
        assert_eq!(row["type"], "image_uploaded");
        assert_eq!(row["session_id"], "session-123");
        assert_eq!(row["width"], 640);
        assert_eq!(row["ts"], Value::String(logged.ts.clone()));
        DateTime::parse_from_rfc3339(&logged.ts)?;
        Ok(())
    }

    #[test]
    fn read_events_returns_typed_events_in_order() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("nested").join("events.jsonl");
        let log = EventLog::open(&path, "session-123")?;

        log.record(SessionEvent::SessionStarted {
            backend: "dryrun".to_string(),
        })?;
        log.record(SessionEvent::GenerationFailed {
            request_id: None,
            kind: "validation".to_string(),
            message: "Please upload a photo of your room first.".to_string(),
            error: None,
        })?;
        log.record(SessionEvent::HistoryMoved {
            direction: HistoryDirection::Revert,
            cursor: 0,
            version_id: Some("v1".to_string()),
        })?;

        let events = read_events(&path)?;
        let kinds: Vec<_> = events.iter().map(|row| row.event.kind()).collect();
        assert_eq!(
            kinds,
            vec!["session_started", "generation_failed", "history_moved"]
        );
        assert!(events.iter().all(|row| row.session_id == "session-123"));
        assert_eq!(
            events[2].event,
            SessionEvent::HistoryMoved {
                direction: HistoryDirection::Revert,
                cursor: 0,
                version_id: Some("v1".to_string()),
            }
        );
        Ok(())
    }

    #[test]
    fn unknown_lines_are_skipped_on_read() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let log = EventLog::open(&path, "session-123")?;
        log.record(uploaded())?;
        {
            let mut file = OpenOptions::new().append(true).open(&path)?;
            file.write_all(b"{\"type\":\"from_the_future\"}\nnot json\n\n")?;
        }
        log.record(SessionEvent::SessionFinished {
            summary_path: "summary.json".to_string(),
        })?;

        let kinds: Vec<_> = read_events(&path)?
            .iter()
            .map(|row| row.event.kind())
            .collect();
        assert_eq!(kinds, vec!["image_uploaded", "session_finished"]);
        Ok(())
    }

    #[test]
    fn kind_matches_serialized_tag() -> anyhow::Result<()> {
        let events = [
            uploaded(),
            SessionEvent::StaleResultDiscarded {
                request_id: 1,
                latest_request_id: 2,
                stage: PipelineStage::Extract,
            },
            SessionEvent::ItemUnsaved {
                item_id: "a".to_string(),
                item_name: "Sofa".to_string(),
            },
        ];
        for event in events {
            let value = serde_json::to_value(&event)?;
            assert_eq!(value["type"], event.kind());
        }
        Ok(())
    }
}
