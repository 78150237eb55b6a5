use indexmap::IndexMap;

use crate::design::ColorSwatch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub name: String,
    pub swatches: Vec<ColorSwatch>,
}

impl Palette {
    pub fn new(name: impl Into<String>, swatches: Vec<ColorSwatch>) -> Self {
        Self {
            name: name.into(),
            swatches,
        }
    }
}

/// Ordered catalog of predefined palettes a user can apply to a design.
#[derive(Debug, Clone)]
pub struct PaletteCatalog {
    palettes: IndexMap<String, Palette>,
}

impl PaletteCatalog {
    pub fn new(palettes: Option<IndexMap<String, Palette>>) -> Self {
        Self {
            palettes: palettes.unwrap_or_else(default_palettes),
        }
    }

    /// Case-insensitive lookup by name.
    pub fn find(&self, name: &str) -> Option<&Palette> {
        let needle = name.trim();
        self.palettes
            .values()
            .find(|palette| palette.name.eq_ignore_ascii_case(needle))
    }

    pub fn list(&self) -> impl Iterator<Item = &Palette> {
        self.palettes.values()
    }
}

impl Default for PaletteCatalog {
    fn default() -> Self {
        Self::new(None)
    }
}

fn default_palettes() -> IndexMap<String, Palette> {
    let mut map = IndexMap::new();

    let mut insert = |name: &str, swatches: &[(&str, &str)]| {
        map.insert(
            name.to_string(),
            Palette::new(
                name,
                swatches
                    .iter()
                    .map(|(hex, label)| ColorSwatch::new(*hex, *label))
                    .collect(),
            ),
        );
    };

    insert(
        "Ocean Calm",
        &[
            ("#1B3B5F", "Deep Harbor"),
            ("#3E7CB1", "Coastal Blue"),
            ("#8FC1D4", "Sea Glass"),
            ("#E8F1F2", "Foam White"),
            ("#C9B79C", "Sandbar"),
        ],
    );
    insert(
        "Desert Sunset",
        &[
            ("#C0583B", "Terracotta"),
            ("#E39B6B", "Apricot Clay"),
            ("#F2D4B5", "Sandstone"),
            ("#7A5C4D", "Canyon Brown"),
            ("#F7EFE6", "Bleached Bone"),
        ],
    );
    insert(
        "Forest Retreat",
        &[
            ("#2F4A3A", "Pine Shadow"),
            ("#5B7B5A", "Moss"),
            ("#A3B18A", "Sage Leaf"),
            ("#DAD7CD", "Birch Bark"),
            ("#8B5E3C", "Walnut"),
        ],
    );
    insert(
        "Nordic Frost",
        &[
            ("#FFFFFF", "Snow"),
            ("#D9DEE3", "Frost Grey"),
            ("#9AA7B1", "Slate Mist"),
            ("#4A5560", "Storm"),
            ("#D8C3A5", "Pale Oak"),
        ],
    );

    map
}
