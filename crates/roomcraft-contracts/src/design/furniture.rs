use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CUSTOM_ITEM_COLOR: &str = "Custom Item";

/// A shoppable item seen in a generated design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FurnitureItem {
    pub id: String,
    pub item_name: String,
    /// Color and material as seen in the image.
    pub color: String,
    pub search_query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl FurnitureItem {
    pub fn new(
        item_name: impl Into<String>,
        color: impl Into<String>,
        search_query: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            item_name: item_name.into(),
            color: color.into(),
            search_query: search_query.into(),
            link: None,
        }
    }

    /// A user-entered item; the name doubles as its search query.
    pub fn custom(item_name: &str, link: Option<String>) -> Self {
        let name = item_name.trim();
        let mut item = Self::new(name, CUSTOM_ITEM_COLOR, name);
        item.link = link
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        item
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorSwatch {
    pub hex: String,
    pub name: String,
}

impl ColorSwatch {
    pub fn new(hex: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            hex: hex.into(),
            name: name.into(),
        }
    }
}

/// Raw extractor row: `{itemName, color, searchQuery}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedItem {
    #[serde(default)]
    pub item_name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub search_query: String,
}

/// Wire shape requested from the extraction model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionPayload {
    #[serde(default)]
    pub furniture: Vec<ExtractedItem>,
    #[serde(default)]
    pub palette: Vec<ColorSwatch>,
}

impl ExtractionPayload {
    /// Parses the model's JSON text. Markdown code fences around the JSON are tolerated.
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let trimmed = strip_code_fence(text.trim());
        let payload: ExtractionPayload = serde_json::from_str(trimmed)?;
        Ok(payload)
    }
}

/// Shopping list and palette derived from the current design.
///
/// Replaced wholesale after every extraction; never merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedData {
    pub items: Vec<FurnitureItem>,
    pub palette: Vec<ColorSwatch>,
}

impl DerivedData {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Assigns fresh ids to every extracted row. Rows without a name are dropped.
    pub fn from_payload(payload: ExtractionPayload) -> Self {
        let items = payload
            .furniture
            .into_iter()
            .filter(|row| !row.item_name.trim().is_empty())
            .map(|row| {
                let query = if row.search_query.trim().is_empty() {
                    format!("{} {}", row.color.trim(), row.item_name.trim())
                        .trim()
                        .to_string()
                } else {
                    row.search_query.trim().to_string()
                };
                FurnitureItem::new(row.item_name.trim(), row.color.trim(), query)
            })
            .collect();
        Self {
            items,
            palette: payload.palette,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.palette.is_empty()
    }

    pub fn item_mut(&mut self, id: &str) -> Option<&mut FurnitureItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{DerivedData, ExtractionPayload, FurnitureItem, CUSTOM_ITEM_COLOR};

    const SAMPLE: &str = r##"{
        "furniture": [
            {"itemName": "Linen Sofa", "color": "Sand linen", "searchQuery": "sand linen sofa"},
            {"itemName": "Rattan Chair", "color": "Natural rattan", "searchQuery": ""},
            {"itemName": "  ", "color": "x", "searchQuery": "x"}
        ],
        "palette": [{"hex": "#F4EDE4", "name": "Sea Salt"}]
    }"##;

    #[test]
    fn parse_accepts_fenced_json() -> anyhow::Result<()> {
        let fenced = format!("```json\n{SAMPLE}\n```");
        let payload = ExtractionPayload::parse(&fenced)?;
        assert_eq!(payload.furniture.len(), 3);
        assert_eq!(payload.palette[0].name, "Sea Salt");
        Ok(())
    }

    #[test]
    fn parse_defaults_missing_arrays() -> anyhow::Result<()> {
        let payload = ExtractionPayload::parse("{}")?;
        assert!(payload.furniture.is_empty());
        assert!(payload.palette.is_empty());
        Ok(())
    }

    #[test]
    fn from_payload_assigns_unique_ids_and_fills_queries() -> anyhow::Result<()> {
        let data = DerivedData::from_payload(ExtractionPayload::parse(SAMPLE)?);
        assert_eq!(data.items.len(), 2);
        let ids: HashSet<&str> = data.items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert_eq!(data.items[1].search_query, "Natural rattan Rattan Chair");
        assert_eq!(data.palette.len(), 1);
        Ok(())
    }

    #[test]
    fn custom_item_uses_name_as_query_and_drops_blank_link() {
        let item = FurnitureItem::custom(" West Elm Sofa ", Some("  ".to_string()));
        assert_eq!(item.item_name, "West Elm Sofa");
        assert_eq!(item.search_query, "West Elm Sofa");
        assert_eq!(item.color, CUSTOM_ITEM_COLOR);
        assert_eq!(item.link, None);
    }
}
