use uuid::Uuid;

use super::furniture::DerivedData;
use super::history::{GeneratedVersion, VersionHistory};
use super::image::EncodedImage;
use super::saved::SavedItems;
use super::status::ProcessingStatus;
use crate::catalog::Palette;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DesignMode {
    /// Restyle the whole room.
    #[default]
    Makeover,
    /// Keep the room, insert or edit only the named items.
    Partial,
}

impl DesignMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "makeover" | "redecorate" | "full" => Some(Self::Makeover),
            "partial" | "add" | "decor" => Some(Self::Partial),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Makeover => "MAKEOVER",
            Self::Partial => "PARTIAL",
        }
    }
}

/// Which style a generation should aim for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleChoice {
    /// A catalog style id.
    Preset(String),
    /// "Surprise me": the text (or, when blank, the user's instruction) is the style.
    Freeform(String),
}

impl Default for StyleChoice {
    fn default() -> Self {
        Self::Preset("modern".to_string())
    }
}

/// Everything one editing session owns.
#[derive(Debug, Clone)]
pub struct Session {
    session_id: String,
    source_image: Option<EncodedImage>,
    history: VersionHistory<GeneratedVersion>,
    derived: DerivedData,
    saved: SavedItems,
    status: ProcessingStatus,
    pub mode: DesignMode,
    pub style: StyleChoice,
    pub items_to_add: String,
    pub refinement_instruction: String,
    /// Palette the user asked to apply; shown until extraction replaces `derived`.
    pub proposed_palette: Option<Palette>,
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(format!("session-{}", Uuid::new_v4()))
    }

    pub fn with_id(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            source_image: None,
            history: VersionHistory::new(),
            derived: DerivedData::empty(),
            saved: SavedItems::new(),
            status: ProcessingStatus::idle(),
            mode: DesignMode::default(),
            style: StyleChoice::default(),
            items_to_add: String::new(),
            refinement_instruction: String::new(),
            proposed_palette: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn source_image(&self) -> Option<&EncodedImage> {
        self.source_image.as_ref()
    }

    /// Starts over from a new upload. Saved items are kept.
    pub fn replace_source(&mut self, image: EncodedImage) {
        self.source_image = Some(image);
        self.history.reset();
        self.derived = DerivedData::empty();
        self.refinement_instruction.clear();
        self.proposed_palette = None;
        self.status = ProcessingStatus::idle();
    }

    pub fn history(&self) -> &VersionHistory<GeneratedVersion> {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut VersionHistory<GeneratedVersion> {
        &mut self.history
    }

    pub fn current_image(&self) -> Option<&EncodedImage> {
        self.history.current_image()
    }

    pub fn derived(&self) -> &DerivedData {
        &self.derived
    }

    pub fn derived_mut(&mut self) -> &mut DerivedData {
        &mut self.derived
    }

    pub fn replace_derived(&mut self, derived: DerivedData) {
        self.derived = derived;
        self.proposed_palette = None;
    }

    pub fn saved(&self) -> &SavedItems {
        &self.saved
    }

    pub fn saved_mut(&mut self) -> &mut SavedItems {
        &mut self.saved
    }

    pub fn set_saved(&mut self, saved: SavedItems) {
        self.saved = saved;
    }

    pub fn status(&self) -> &ProcessingStatus {
        &self.status
    }

    pub fn status_mut(&mut self) -> &mut ProcessingStatus {
        &mut self.status
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
