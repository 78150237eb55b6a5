use std::path::Path;

use anyhow::{bail, Context};
use indexmap::IndexMap;

use super::furniture::FurnitureItem;

/// User-curated list of items, keyed by item id.
///
/// Holds copies, so entries survive replacement of the derived shopping list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SavedItems {
    items: IndexMap<String, FurnitureItem>,
}

impl SavedItems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a copy of `item`, or removes it when already saved. Returns the new membership.
    pub fn toggle(&mut self, item: &FurnitureItem) -> bool {
        if self.items.shift_remove(&item.id).is_some() {
            return false;
        }
        self.items.insert(item.id.clone(), item.clone());
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&FurnitureItem> {
        self.items.get(id)
    }

    /// Sets (or clears, for a blank link) the link on a saved item.
    pub fn update_link(&mut self, id: &str, link: &str) -> bool {
        let Some(item) = self.items.get_mut(id) else {
            return false;
        };
        let trimmed = link.trim();
        item.link = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        true
    }

    pub fn add_custom(&mut self, name: &str, link: Option<String>) -> anyhow::Result<FurnitureItem> {
        if name.trim().is_empty() {
            bail!("custom item requires a name");
        }
        let item = FurnitureItem::custom(name, link);
        self.items.insert(item.id.clone(), item.clone());
        Ok(item)
    }

    pub fn items(&self) -> impl Iterator<Item = &FurnitureItem> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let rows: Vec<&FurnitureItem> = self.items.values().collect();
        std::fs::write(path, serde_json::to_string_pretty(&rows)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    /// Loads a saved list; a missing file yields an empty list.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        let rows: Vec<FurnitureItem> = serde_json::from_str(&raw)
            .with_context(|| format!("invalid saved items file {}", path.display()))?;
        Ok(Self {
            items: rows
                .into_iter()
                .map(|item| (item.id.clone(), item))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::SavedItems;
    use crate::design::furniture::FurnitureItem;

    #[test]
    fn toggle_adds_then_removes() {
        let mut saved = SavedItems::new();
        let item = FurnitureItem::new("Lamp", "Brass", "brass lamp");
        assert!(saved.toggle(&item));
        assert!(saved.contains(&item.id));
        assert!(!saved.toggle(&item));
        assert!(saved.is_empty());
    }

    #[test]
    fn saved_copy_is_independent_of_source_list() {
        let mut saved = SavedItems::new();
        let mut list = vec![FurnitureItem::new("Rug", "Jute", "jute rug")];
        saved.toggle(&list[0]);
        let id = list[0].id.clone();
        list.clear();
        assert_eq!(saved.get(&id).map(|item| item.item_name.as_str()), Some("Rug"));
    }

    #[test]
    fn update_link_sets_and_clears() {
        let mut saved = SavedItems::new();
        let item = FurnitureItem::new("Lamp", "Brass", "brass lamp");
        saved.toggle(&item);
        assert!(saved.update_link(&item.id, " https://shop.test/lamp "));
        assert_eq!(
            saved.get(&item.id).and_then(|row| row.link.as_deref()),
            Some("https://shop.test/lamp")
        );
        assert!(saved.update_link(&item.id, ""));
        assert_eq!(saved.get(&item.id).and_then(|row| row.link.clone()), None);
        assert!(!saved.update_link("missing", "x"));
    }

    #[test]
    fn add_custom_rejects_blank_names() -> anyhow::Result<()> {
        let mut saved = SavedItems::new();
        assert!(saved.add_custom("   ", None).is_err());
        assert!(saved.is_empty());
        let item = saved.add_custom("West Elm Sofa", Some("https://westelm.test".to_string()))?;
        assert!(saved.contains(&item.id));
        assert_eq!(item.link.as_deref(), Some("https://westelm.test"));
        Ok(())
    }

    #[test]
    fn save_and_load_preserve_order() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("saved_items.json");
        let mut saved = SavedItems::new();
        saved.add_custom("First", None)?;
        saved.add_custom("Second", Some("https://shop.test".to_string()))?;
        saved.save(&path)?;

        let loaded = SavedItems::load(&path)?;
        assert_eq!(loaded, saved);
        let names: Vec<&str> = loaded.items().map(|item| item.item_name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second"]);
        Ok(())
    }

    #[test]
    fn load_missing_file_is_empty() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        assert!(SavedItems::load(&temp.path().join("none.json"))?.is_empty());
        Ok(())
    }
}
