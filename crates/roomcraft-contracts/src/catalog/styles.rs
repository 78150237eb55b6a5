use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignStyle {
    pub id: String,
    pub label: String,
    pub description: String,
}

/// Ordered catalog of preset design styles.
#[derive(Debug, Clone)]
pub struct StyleCatalog {
    styles: IndexMap<String, DesignStyle>,
}

impl StyleCatalog {
    pub fn new(styles: Option<IndexMap<String, DesignStyle>>) -> Self {
        Self {
            styles: styles.unwrap_or_else(default_styles),
        }
    }

    pub fn get(&self, id: &str) -> Option<&DesignStyle> {
        self.styles.get(id.trim())
    }

    /// Looks a style up by id or (case-insensitively) by label.
    pub fn find(&self, key: &str) -> Option<&DesignStyle> {
        let needle = key.trim();
        self.get(needle).or_else(|| {
            self.styles
                .values()
                .find(|style| style.label.eq_ignore_ascii_case(needle))
        })
    }

    pub fn first(&self) -> Option<&DesignStyle> {
        self.styles.values().next()
    }

    pub fn list(&self) -> impl Iterator<Item = &DesignStyle> {
        self.styles.values()
    }
}

impl Default for StyleCatalog {
    fn default() -> Self {
        Self::new(None)
    }
}

fn default_styles() -> IndexMap<String, DesignStyle> {
    let mut map = IndexMap::new();

    let mut insert = |id: &str, label: &str, description: &str| {
        map.insert(
            id.to_string(),
            DesignStyle {
                id: id.to_string(),
                label: label.to_string(),
                description: description.to_string(),
            },
        );
    };

    insert(
        "modern",
        "Modern Minimalist",
        "Clean lines, neutral colors, and functional furniture.",
    );
    insert(
        "coastal",
        "Coastal Breeze",
        "Light airy spaces, soft blues, whites, and natural textures.",
    );
    insert(
        "farmhouse",
        "Modern Farmhouse",
        "Rustic charm, reclaimed wood, neutral tones, and cozy vibes.",
    );
    insert(
        "boho",
        "Bohemian Chic",
        "Eclectic patterns, plants, rattan, and warm tones.",
    );
    insert(
        "traditional",
        "Classic Traditional",
        "Timeless elegance, rich wood finishes, and symmetrical layouts.",
    );
    insert(
        "midcentury",
        "Mid-Century Modern",
        "Retro vibes, organic curves, and teak wood.",
    );

    map
}
