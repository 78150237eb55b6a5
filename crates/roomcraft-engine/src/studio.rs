use std::path::Path;
use std::sync::Arc;

use roomcraft_contracts::catalog::{Palette, StyleCatalog};
use roomcraft_contracts::design::{
    DesignMode, EncodedImage, FurnitureItem, GeneratedVersion, Phase, SavedItems, Session,
    StatusEvent, StyleChoice,
};
use roomcraft_contracts::events::{
    now_utc_iso, EventLog, HistoryDirection, PipelineStage, SessionEvent,
};
use roomcraft_contracts::summary::{write_summary, SessionSummary};
use tracing::{debug, info, warn};

use crate::backends::{RemoteBackend, RemoteRequest};
use crate::config::StudioConfig;
use crate::error::{FailureKind, GatewayError, StudioError};
use crate::gateway::{ExtractionOutcome, Gateway, RetryPolicy};
use crate::normalize::ImageNormalizer;
use crate::prompts::{
    build_extraction_prompt, build_makeover_prompt, build_palette_instruction,
    build_partial_prompt, build_refinement_prompt,
};

pub const STATUS_MAKEOVER: &str = "Reimagining your space...";
pub const STATUS_PARTIAL: &str = "Adding your items...";
pub const STATUS_REFINE: &str = "Refining your design...";
pub const STATUS_EXTRACTING: &str = "Finding furniture matches...";

const MISSING_IMAGE: &str = "Please upload a photo of your room first.";
const MISSING_ITEMS: &str = "Please describe the items you want to add.";
const FREEFORM_FALLBACK_LABEL: &str = "Designer's Choice";

/// The side-effecting half of a generation: normalize, then call the gateway.
///
/// Holds no session state, so a caller may run it on another thread between
/// [`Studio::begin_generation`] and [`Studio::complete_transform`].
#[derive(Clone)]
pub struct Pipeline {
    gateway: Gateway,
    normalizer: ImageNormalizer,
}

impl Pipeline {
    pub fn new(gateway: Gateway, normalizer: ImageNormalizer) -> Self {
        Self {
            gateway,
            normalizer,
        }
    }

    pub fn from_config(backend: Arc<dyn RemoteBackend>, config: &StudioConfig) -> Self {
        Self::new(
            Gateway::new(backend, RetryPolicy::from_config(config)),
            ImageNormalizer::from_config(config),
        )
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn normalizer(&self) -> &ImageNormalizer {
        &self.normalizer
    }

    pub fn run_transform(&self, pending: &PendingGeneration) -> Result<EncodedImage, StudioError> {
        let normalized = self.normalizer.normalize(&pending.source)?;
        debug!(
            request_id = pending.request_id,
            width = normalized.size.0,
            height = normalized.size.1,
            bytes = normalized.image.len(),
            "source normalized"
        );
        let request = RemoteRequest::new(normalized.image, pending.prompt.clone());
        Ok(self.gateway.invoke_transform(&request)?)
    }

    pub fn run_extract(&self, image: &EncodedImage, focus_hint: Option<&str>) -> ExtractionOutcome {
        let normalized = match self.normalizer.normalize(image) {
            Ok(normalized) => normalized,
            Err(err) => {
                warn!(error = %err, "generated image could not be normalized for extraction");
                return ExtractionOutcome::degraded(GatewayError::new(
                    FailureKind::Other,
                    err.to_string(),
                ));
            }
        };
        let request = RemoteRequest::new(normalized.image, build_extraction_prompt(focus_hint));
        self.gateway.invoke_extract(&request)
    }
}

/// A generation that has been validated and tokened but not yet run.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingGeneration {
    pub request_id: u64,
    pub mode: DesignMode,
    /// Original upload, or the current version for a chained refinement.
    pub source: EncodedImage,
    pub parent_version_id: Option<String>,
    pub prompt: String,
    pub focus_hint: Option<String>,
}

impl PendingGeneration {
    pub fn is_chained(&self) -> bool {
        self.parent_version_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransformCompletion {
    Applied {
        version_id: String,
        image: EncodedImage,
    },
    /// A newer request was started; nothing was changed.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionCompletion {
    Applied {
        items: usize,
        swatches: usize,
        degraded: bool,
    },
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    pub request_id: u64,
    pub version_id: String,
    pub items: usize,
    pub swatches: usize,
    pub extraction_degraded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Complete(GenerationReport),
    Stale,
}

/// Drives one design session: validation, prompt selection, the status
/// machine, version history and the derived shopping data.
pub struct Studio {
    session: Session,
    pipeline: Pipeline,
    styles: StyleCatalog,
    events: Option<EventLog>,
    started_at: String,
    latest_request: u64,
}

impl Studio {
    pub fn new(session: Session, pipeline: Pipeline) -> Self {
        Self {
            session,
            pipeline,
            styles: StyleCatalog::default(),
            events: None,
            started_at: now_utc_iso(),
            latest_request: 0,
        }
    }

    pub fn with_styles(mut self, styles: StyleCatalog) -> Self {
        self.styles = styles;
        self
    }

    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = Some(events);
        self.emit(SessionEvent::SessionStarted {
            backend: self.pipeline.gateway().backend_name().to_string(),
        });
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn styles(&self) -> &StyleCatalog {
        &self.styles
    }

    pub fn latest_request(&self) -> u64 {
        self.latest_request
    }

    pub fn is_busy(&self) -> bool {
        self.session.status().is_busy()
    }

    /// Starts over with a new photo. Any request still in flight becomes stale.
    pub fn upload(&mut self, image: EncodedImage) -> Result<(u32, u32), StudioError> {
        let (width, height) = self.pipeline.normalizer().read_dimensions(&image)?;
        self.latest_request += 1;
        let mime_type = image.mime_type.clone();
        let bytes = image.len();
        self.session.replace_source(image);
        info!(width, height, bytes, "room photo uploaded");
        self.emit(SessionEvent::ImageUploaded {
            mime_type,
            bytes,
            width,
            height,
        });
        Ok((width, height))
    }

    pub fn set_mode(&mut self, mode: DesignMode) {
        self.session.mode = mode;
        self.clear_error();
    }

    pub fn set_style(&mut self, style: StyleChoice) {
        self.session.style = style;
        self.clear_error();
    }

    pub fn set_items_to_add(&mut self, items: &str) {
        self.session.items_to_add = items.trim().to_string();
        self.clear_error();
    }

    pub fn set_refinement_instruction(&mut self, instruction: &str) {
        self.session.refinement_instruction = instruction.trim().to_string();
        self.clear_error();
    }

    /// Leaves ERROR for IDLE. Returns whether there was an error to dismiss.
    pub fn dismiss_error(&mut self) -> bool {
        self.clear_error()
    }

    fn clear_error(&mut self) -> bool {
        if self.session.status().phase() != Phase::Error {
            return false;
        }
        self.set_status(StatusEvent::Reset, None);
        true
    }

    /// Label used for the style slot of a prompt.
    pub fn style_label(&self, instruction: Option<&str>) -> String {
        match &self.session.style {
            StyleChoice::Preset(id) => self
                .styles
                .find(id)
                .or_else(|| self.styles.first())
                .map(|style| style.label.clone())
                .unwrap_or_else(|| FREEFORM_FALLBACK_LABEL.to_string()),
            StyleChoice::Freeform(text) => [Some(text.as_str()), instruction]
                .into_iter()
                .flatten()
                .map(str::trim)
                .find(|value| !value.is_empty())
                .unwrap_or(FREEFORM_FALLBACK_LABEL)
                .to_string(),
        }
    }

    /// Validates the request, picks the source and prompt, issues a request
    /// token and moves the session to GENERATING. No remote call is made.
    pub fn begin_generation(
        &mut self,
        is_refinement: bool,
        instruction_override: Option<&str>,
    ) -> Result<PendingGeneration, StudioError> {
        let Some(original) = self.session.source_image().cloned() else {
            return Err(self.reject(MISSING_IMAGE));
        };
        let mode = self.session.mode;
        let items = self.session.items_to_add.trim().to_string();
        if mode == DesignMode::Partial && items.is_empty() && !is_refinement {
            return Err(self.reject(MISSING_ITEMS));
        }

        let instruction = instruction_override
            .unwrap_or(self.session.refinement_instruction.as_str())
            .trim()
            .to_string();
        let instruction = (!instruction.is_empty()).then_some(instruction);

        let chained = if is_refinement {
            instruction.as_ref().and_then(|instruction| {
                self.session
                    .history()
                    .current()
                    .map(|version| (version, instruction.clone()))
            })
        } else {
            None
        };

        let (source, parent_version_id, prompt, focus_hint, status_message) = match chained {
            Some((version, instruction)) => (
                version.image.clone(),
                Some(version.version_id.clone()),
                build_refinement_prompt(&instruction),
                Some(instruction),
                STATUS_REFINE,
            ),
            None => {
                let style_label = self.style_label(instruction.as_deref());
                match mode {
                    DesignMode::Makeover => (
                        original,
                        None,
                        build_makeover_prompt(&style_label, instruction.as_deref().unwrap_or("")),
                        instruction.clone(),
                        STATUS_MAKEOVER,
                    ),
                    DesignMode::Partial => {
                        // A refinement with nothing to chain from adds the instruction itself.
                        let (items, extra) = match (items.is_empty(), instruction.clone()) {
                            (false, extra) => (items, extra),
                            (true, Some(instruction)) => (instruction, None),
                            (true, None) => return Err(self.reject(MISSING_ITEMS)),
                        };
                        (
                            original,
                            None,
                            build_partial_prompt(&items, &style_label, extra.as_deref().unwrap_or("")),
                            Some(items),
                            STATUS_PARTIAL,
                        )
                    }
                }
            }
        };

        self.latest_request += 1;
        let pending = PendingGeneration {
            request_id: self.latest_request,
            mode,
            source,
            parent_version_id,
            prompt,
            focus_hint,
        };
        self.set_status(StatusEvent::Start, Some(status_message.to_string()));
        info!(
            request_id = pending.request_id,
            mode = mode.as_str(),
            chained = pending.is_chained(),
            "generation started"
        );
        self.emit(SessionEvent::GenerationStarted {
            request_id: pending.request_id,
            mode: mode.as_str().to_string(),
            is_refinement,
            parent_version_id: pending.parent_version_id.clone(),
            prompt: pending.prompt.clone(),
            focus_hint: pending.focus_hint.clone(),
        });
        Ok(pending)
    }

    /// Applies a transform result. On success the image becomes the newest
    /// version and the session moves to EXTRACTING; on failure it moves to
    /// ERROR with history and derived data untouched.
    pub fn complete_transform(
        &mut self,
        pending: &PendingGeneration,
        result: Result<EncodedImage, StudioError>,
    ) -> Result<TransformCompletion, StudioError> {
        if self.is_stale(pending) {
            self.discard_stale(pending, PipelineStage::Transform);
            return Ok(TransformCompletion::Stale);
        }

        let image = match result {
            Ok(image) => image,
            Err(err) => {
                warn!(request_id = pending.request_id, error = %err, "generation failed");
                self.set_status(StatusEvent::TransformFailed, Some(err.user_message()));
                self.emit(SessionEvent::GenerationFailed {
                    request_id: Some(pending.request_id),
                    kind: err.kind_str().to_string(),
                    message: err.user_message(),
                    error: Some(err.to_string()),
                });
                return Err(err);
            }
        };

        let version = GeneratedVersion {
            version_id: self.session.history().next_version_id(),
            image: image.clone(),
            prompt: pending.prompt.clone(),
            parent_version_id: pending.parent_version_id.clone(),
            request_id: pending.request_id,
            created_at: now_utc_iso(),
        };
        let version_id = version.version_id.clone();
        self.session.history_mut().append(version);
        self.set_status(
            StatusEvent::TransformSucceeded,
            Some(STATUS_EXTRACTING.to_string()),
        );
        self.emit(SessionEvent::VersionCreated {
            request_id: pending.request_id,
            version_id: version_id.clone(),
            parent_version_id: pending.parent_version_id.clone(),
            mime_type: image.mime_type.clone(),
            bytes: image.len(),
            cursor: self.session.history().cursor(),
            versions: self.session.history().len(),
        });
        Ok(TransformCompletion::Applied { version_id, image })
    }

    /// Replaces the derived data and completes the request. Results for any
    /// request other than the one currently extracting are dropped.
    pub fn complete_extraction(
        &mut self,
        pending: &PendingGeneration,
        outcome: ExtractionOutcome,
    ) -> ExtractionCompletion {
        if self.is_stale(pending)
            || self.session.status().phase() != Phase::Extracting
        {
            self.discard_stale(pending, PipelineStage::Extract);
            return ExtractionCompletion::Stale;
        }

        let degraded = outcome.is_degraded();
        let items = outcome.data.items.len();
        let swatches = outcome.data.palette.len();
        self.session.replace_derived(outcome.data);
        self.set_status(StatusEvent::ExtractionFinished, None);
        info!(
            request_id = pending.request_id,
            items, swatches, degraded, "generation complete"
        );
        self.emit(SessionEvent::ExtractionCompleted {
            request_id: pending.request_id,
            items,
            swatches,
            degraded,
            error: outcome.error.map(|err| err.to_string()),
        });
        ExtractionCompletion::Applied {
            items,
            swatches,
            degraded,
        }
    }

    /// Runs a full generation: begin, transform, extract.
    pub fn generate(
        &mut self,
        is_refinement: bool,
        instruction_override: Option<&str>,
    ) -> Result<GenerationOutcome, StudioError> {
        let pending = self.begin_generation(is_refinement, instruction_override)?;
        let result = self.pipeline.run_transform(&pending);
        let (version_id, image) = match self.complete_transform(&pending, result)? {
            TransformCompletion::Applied { version_id, image } => (version_id, image),
            TransformCompletion::Stale => return Ok(GenerationOutcome::Stale),
        };
        let outcome = self
            .pipeline
            .run_extract(&image, pending.focus_hint.as_deref());
        Ok(match self.complete_extraction(&pending, outcome) {
            ExtractionCompletion::Applied {
                items,
                swatches,
                degraded,
            } => GenerationOutcome::Complete(GenerationReport {
                request_id: pending.request_id,
                version_id,
                items,
                swatches,
                extraction_degraded: degraded,
            }),
            ExtractionCompletion::Stale => GenerationOutcome::Stale,
        })
    }

    /// Refines the current design toward `palette`. The palette stays
    /// proposed until the next extraction replaces the derived data.
    pub fn apply_palette(&mut self, palette: &Palette) -> Result<GenerationOutcome, StudioError> {
        self.session.proposed_palette = Some(palette.clone());
        let instruction = build_palette_instruction(palette);
        self.generate(true, Some(&instruction))
    }

    pub fn revert(&mut self) -> bool {
        let moved = self.session.history_mut().revert();
        if moved {
            self.emit_history_moved(HistoryDirection::Revert);
        }
        moved
    }

    pub fn redo(&mut self) -> bool {
        let moved = self.session.history_mut().redo();
        if moved {
            self.emit_history_moved(HistoryDirection::Redo);
        }
        moved
    }

    fn emit_history_moved(&self, direction: HistoryDirection) {
        let history = self.session.history();
        self.emit(SessionEvent::HistoryMoved {
            direction,
            cursor: history.cursor(),
            version_id: history.current().map(|version| version.version_id.clone()),
        });
    }

    /// Saves or unsaves an item from the shopping list (or an already saved
    /// one). Returns the new membership, or `None` for an unknown id.
    pub fn toggle_saved(&mut self, item_id: &str) -> Option<bool> {
        let item = self
            .session
            .derived()
            .items
            .iter()
            .find(|item| item.id == item_id)
            .cloned()
            .or_else(|| self.session.saved().get(item_id).cloned())?;
        let saved = self.session.saved_mut().toggle(&item);
        self.emit(if saved {
            SessionEvent::ItemSaved {
                item_id: item.id,
                item_name: item.item_name,
                custom: false,
            }
        } else {
            SessionEvent::ItemUnsaved {
                item_id: item.id,
                item_name: item.item_name,
            }
        });
        Some(saved)
    }

    /// Sets the user's own purchase link; a blank link clears it.
    pub fn update_link(&mut self, item_id: &str, link: &str) -> bool {
        let saved = self.session.saved_mut().update_link(item_id, link);
        let trimmed = link.trim();
        let listed = match self.session.derived_mut().item_mut(item_id) {
            Some(item) => {
                item.link = (!trimmed.is_empty()).then(|| trimmed.to_string());
                true
            }
            None => false,
        };
        saved || listed
    }

    /// Replaces the saved list, e.g. with one loaded from disk.
    pub fn restore_saved(&mut self, saved: SavedItems) {
        self.session.set_saved(saved);
    }

    pub fn add_custom_item(
        &mut self,
        name: &str,
        link: Option<String>,
    ) -> Result<FurnitureItem, StudioError> {
        let item = self
            .session
            .saved_mut()
            .add_custom(name, link)
            .map_err(|err| StudioError::validation(err.to_string()))?;
        self.emit(SessionEvent::ItemSaved {
            item_id: item.id.clone(),
            item_name: item.item_name.clone(),
            custom: true,
        });
        Ok(item)
    }

    pub fn summary(&self) -> SessionSummary {
        let history = self.session.history();
        SessionSummary {
            session_id: self.session.session_id().to_string(),
            started_at: self.started_at.clone(),
            finished_at: now_utc_iso(),
            total_versions: history.len() as u64,
            cursor: history.cursor(),
            shopping_items: self.session.derived().items.len() as u64,
            palette_swatches: self.session.derived().palette.len() as u64,
            saved_items: self.session.saved().len() as u64,
        }
    }

    /// Writes `summary.json` and closes the event log.
    pub fn finish(&self, summary_path: &Path) -> anyhow::Result<SessionSummary> {
        let summary = self.summary();
        write_summary(summary_path, &summary)?;
        self.emit(SessionEvent::SessionFinished {
            summary_path: summary_path.to_string_lossy().into_owned(),
        });
        Ok(summary)
    }

    fn is_stale(&self, pending: &PendingGeneration) -> bool {
        pending.request_id != self.latest_request
    }

    fn discard_stale(&self, pending: &PendingGeneration, stage: PipelineStage) {
        debug!(
            request_id = pending.request_id,
            latest = self.latest_request,
            ?stage,
            "discarding stale result"
        );
        self.emit(SessionEvent::StaleResultDiscarded {
            request_id: pending.request_id,
            latest_request_id: self.latest_request,
            stage,
        });
    }

    fn reject(&mut self, message: &str) -> StudioError {
        let err = StudioError::validation(message);
        if self
            .session
            .status()
            .next_phase(StatusEvent::ValidationFailed)
            .is_some()
        {
            self.set_status(StatusEvent::ValidationFailed, Some(err.user_message()));
        }
        self.emit(SessionEvent::GenerationFailed {
            request_id: None,
            kind: err.kind_str().to_string(),
            message: err.user_message(),
            error: None,
        });
        err
    }

    fn set_status(&mut self, event: StatusEvent, message: Option<String>) {
        if let Err(err) = self.session.status_mut().transition(event, message) {
            warn!(error = %err, "status transition rejected");
        }
    }

    fn emit(&self, event: SessionEvent) {
        let Some(events) = self.events.as_ref() else {
            return;
        };
        let kind = event.kind();
        if let Err(err) = events.record(event) {
            warn!(event = kind, error = %err, "event log write failed");
        }
    }
}
