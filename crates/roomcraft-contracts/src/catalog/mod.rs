mod palettes;
mod styles;

pub use palettes::{Palette, PaletteCatalog};
pub use styles::{DesignStyle, StyleCatalog};
