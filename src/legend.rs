//! Category → color legend used to pick node header colors.
//!
//! Entries are free text; nothing here is validated.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Header color for nodes created without a category.
pub const DEFAULT_NODE_COLOR: &str = "#1e293b";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub description: String,
}

impl LegendEntry {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        color: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: color.into(),
            description: description.into(),
        }
    }
}

/// Built-in medallion layers.
pub fn default_legend() -> Vec<LegendEntry> {
    vec![
        LegendEntry::new("gold", "Gold", "#fbbf24", "Curated, business-level tables"),
        LegendEntry::new("silver", "Silver", "#94a3b8", "Cleaned and conformed tables"),
        LegendEntry::new("bronze", "Bronze", "#cd7f32", "Raw ingested tables"),
        LegendEntry::new("landing", "Landing", "#22c55e", "Files as delivered by sources"),
        LegendEntry::new("neutral", "Neutral", DEFAULT_NODE_COLOR, "Uncategorized"),
    ]
}

#[derive(Debug, Clone)]
pub struct Legend {
    entries: Arc<Vec<LegendEntry>>,
    next: u64,
}

impl Default for Legend {
    fn default() -> Self {
        Self::new(default_legend())
    }
}

impl Legend {
    pub fn new(entries: Vec<LegendEntry>) -> Self {
        Self {
            entries: Arc::new(entries),
            next: 1,
        }
    }

    pub fn entries(&self) -> Arc<Vec<LegendEntry>> {
        Arc::clone(&self.entries)
    }

    pub fn get(&self, id: &str) -> Option<&LegendEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn add(&mut self, name: &str, color: &str, description: &str) -> String {
        let id = loop {
            let id = format!("legend_{}", self.next);
            self.next += 1;
            if self.get(&id).is_none() {
                break id;
            }
        };

        let mut entries = (*self.entries).clone();
        entries.push(LegendEntry::new(id.clone(), name, color, description));
        self.entries = Arc::new(entries);
        id
    }

    pub fn update(&mut self, id: &str, name: &str, color: &str, description: &str) -> bool {
        let Some(index) = self.entries.iter().position(|e| e.id == id) else {
            return false;
        };
        let mut entries = (*self.entries).clone();
        entries[index] = LegendEntry::new(id, name, color, description);
        self.entries = Arc::new(entries);
        true
    }

    pub fn remove(&mut self, id: &str) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        let entries = self.entries.iter().filter(|e| e.id != id).cloned().collect();
        self.entries = Arc::new(entries);
        true
    }

    pub fn replace(&mut self, entries: Vec<LegendEntry>) {
        self.entries = Arc::new(entries);
    }

    pub fn clear(&mut self) {
        self.entries = Arc::new(Vec::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_legend() {
        let legend = Legend::default();
        assert_eq!(legend.entries().len(), 5);
        assert_eq!(legend.get("neutral").unwrap().color, DEFAULT_NODE_COLOR);
    }

    #[test]
    fn test_add_update_remove() {
        let mut legend = Legend::new(vec![]);
        let id = legend.add("Finance", "#ff0000", "");
        assert_eq!(legend.get(&id).unwrap().name, "Finance");

        let before = legend.entries();
        assert!(legend.update(&id, "Finance", "not a color", "anything goes"));
        assert!(!Arc::ptr_eq(&before, &legend.entries()));
        assert_eq!(legend.get(&id).unwrap().color, "not a color");

        assert!(legend.remove(&id));
        assert!(!legend.remove(&id));
        assert!(!legend.update(&id, "x", "y", "z"));
        assert!(legend.entries().is_empty());
    }

    #[test]
    fn test_add_skips_taken_ids() {
        let mut legend = Legend::new(vec![LegendEntry::new("legend_1", "A", "#000", "")]);
        assert_eq!(legend.add("B", "#fff", ""), "legend_2");
    }
}
