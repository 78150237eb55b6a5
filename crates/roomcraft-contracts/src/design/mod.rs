mod furniture;
mod history;
mod image;
mod saved;
mod session;
mod status;

pub use furniture::{
    ColorSwatch, DerivedData, ExtractedItem, ExtractionPayload, FurnitureItem, CUSTOM_ITEM_COLOR,
};
pub use history::{GeneratedVersion, VersionHistory};
pub use image::{mime_for_path, EncodedImage};
pub use saved::SavedItems;
pub use session::{DesignMode, Session, StyleChoice};
pub use status::{Phase, ProcessingStatus, StatusEvent};
