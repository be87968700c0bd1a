//! Persisted project document shape.
//!
//! `ProjectState` is the nested form exchanged with repositories and the
//! export renderer. Inside the process the store keeps the same data in flat
//! maps (see [`crate::store`]); a `ProjectState` is always a snapshot.

use crate::catalog::{Category, Framework};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Maximum number of characters kept from an uploaded document.
pub const MAX_DOCUMENT_CHARS: usize = 5000;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(ProjectId);
string_id!(IdeaId);
string_id!(DocumentId);
string_id!(
    /// Identity of the authenticated user owning a project collection.
    UserId
);

impl ProjectId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl IdeaId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl DocumentId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

// ---------------------------------------------------------------------------
// Idea
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    #[default]
    Human,
    Ai,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Idea {
    pub id: IdeaId,
    pub text: String,
    #[serde(default)]
    pub origin: Origin,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub order: u32,
}

// ---------------------------------------------------------------------------
// FrameworkItem
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkItem {
    pub id: Category,
    pub title: String,
    pub color: String,
    #[serde(default)]
    pub ideas: Vec<Idea>,
    #[serde(default)]
    pub justification: String,
}

impl FrameworkItem {
    pub fn empty(category: Category) -> Self {
        Self {
            id: category,
            title: category.title().to_string(),
            color: category.color().to_string(),
            ideas: Vec::new(),
            justification: String::new(),
        }
    }

    pub fn selected_ideas(&self) -> impl Iterator<Item = &Idea> {
        self.ideas.iter().filter(|i| i.selected)
    }
}

// ---------------------------------------------------------------------------
// FrameworkMap
// ---------------------------------------------------------------------------

/// One field per catalog framework, so a missing or unknown framework key is
/// unrepresentable. Unknown keys in incoming JSON are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FrameworkMap {
    #[serde(default)]
    pub pestle: Vec<FrameworkItem>,
    #[serde(default)]
    pub porter: Vec<FrameworkItem>,
    #[serde(default)]
    pub marketing4p: Vec<FrameworkItem>,
    #[serde(default)]
    pub swot: Vec<FrameworkItem>,
}

impl FrameworkMap {
    /// Every framework populated with every catalog category, all empty.
    pub fn from_catalog() -> Self {
        let mut map = Self::default();
        for &fw in Framework::all() {
            *map.items_mut(fw) = fw
                .categories()
                .iter()
                .map(|&c| FrameworkItem::empty(c))
                .collect();
        }
        map
    }

    pub fn items(&self, framework: Framework) -> &[FrameworkItem] {
        match framework {
            Framework::Pestle => &self.pestle,
            Framework::Porter => &self.porter,
            Framework::Marketing4p => &self.marketing4p,
            Framework::Swot => &self.swot,
        }
    }

    pub fn items_mut(&mut self, framework: Framework) -> &mut Vec<FrameworkItem> {
        match framework {
            Framework::Pestle => &mut self.pestle,
            Framework::Porter => &mut self.porter,
            Framework::Marketing4p => &mut self.marketing4p,
            Framework::Swot => &mut self.swot,
        }
    }

    pub fn item(&self, category: Category) -> Option<&FrameworkItem> {
        self.items(category.framework())
            .iter()
            .find(|i| i.id == category)
    }
}

// ---------------------------------------------------------------------------
// DocumentRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub name: String,
    #[serde(default)]
    pub content: String,
}

impl DocumentRecord {
    /// Build a record from uploaded text, keeping at most
    /// [`MAX_DOCUMENT_CHARS`] characters.
    pub fn ingest(name: impl Into<String>, content: &str) -> Self {
        Self {
            id: DocumentId::generate(),
            name: name.into(),
            content: truncate_chars(content, MAX_DOCUMENT_CHARS),
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((byte_idx, _)) => s[..byte_idx].to_string(),
        None => s.to_string(),
    }
}

// ---------------------------------------------------------------------------
// ProjectState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectState {
    pub id: ProjectId,
    pub name: String,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub business_description: String,
    #[serde(default)]
    pub documents: Vec<DocumentRecord>,
    #[serde(default)]
    pub frameworks: FrameworkMap,
}

impl ProjectState {
    /// Bring a document received from a repository back in line with the
    /// model invariants.
    ///
    /// Each framework is rebuilt in catalog order: missing categories are
    /// added empty, items filed under the wrong framework are moved to their
    /// own, titles and colors come from the catalog. Blank ideas are dropped,
    /// duplicate idea ids are re-issued, order values are renumbered to list
    /// position and over-long documents are cut to the cap.
    pub fn normalize(mut self) -> Self {
        let mut incoming: Vec<FrameworkItem> = Vec::new();
        for &fw in Framework::all() {
            incoming.append(self.frameworks.items_mut(fw));
        }

        let mut seen_ideas: HashSet<IdeaId> = HashSet::new();
        let mut map = FrameworkMap::from_catalog();
        for item in incoming {
            let Some(slot) = map
                .items_mut(item.id.framework())
                .iter_mut()
                .find(|s| s.id == item.id)
            else {
                continue;
            };
            // First occurrence of a category wins.
            if !slot.ideas.is_empty() || !slot.justification.is_empty() {
                continue;
            }
            slot.justification = item.justification;
            for mut idea in item.ideas {
                if idea.text.trim().is_empty() {
                    continue;
                }
                if !seen_ideas.insert(idea.id.clone()) {
                    idea.id = IdeaId::generate();
                    seen_ideas.insert(idea.id.clone());
                }
                slot.ideas.push(idea);
            }
            for (pos, idea) in slot.ideas.iter_mut().enumerate() {
                idea.order = pos as u32;
            }
        }
        self.frameworks = map;

        for doc in &mut self.documents {
            if doc.content.chars().count() > MAX_DOCUMENT_CHARS {
                doc.content = truncate_chars(&doc.content, MAX_DOCUMENT_CHARS);
            }
        }
        self
    }
}

/// Merge `incoming` into `existing` field by field: keys present in
/// `incoming` overwrite, keys only in `existing` are kept. Non-object values
/// replace wholesale. Applying the same `incoming` twice is a no-op.
pub fn merge_fields(existing: &mut serde_json::Value, incoming: serde_json::Value) {
    match (existing, incoming) {
        (serde_json::Value::Object(dst), serde_json::Value::Object(src)) => {
            for (k, v) in src {
                dst.insert(k, v);
            }
        }
        (dst, src) => *dst = src,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idea(id: &str, text: &str, order: u32) -> Idea {
        Idea {
            id: IdeaId::from(id),
            text: text.to_string(),
            origin: Origin::Human,
            selected: true,
            order,
        }
    }

    #[test]
    fn ingest_truncates_to_cap() {
        let doc = DocumentRecord::ingest("big.txt", &"x".repeat(7000));
        assert_eq!(doc.content.chars().count(), MAX_DOCUMENT_CHARS);
    }

    #[test]
    fn ingest_counts_characters_not_bytes() {
        let doc = DocumentRecord::ingest("accents.txt", &"é".repeat(6000));
        assert_eq!(doc.content.chars().count(), MAX_DOCUMENT_CHARS);
        let short = DocumentRecord::ingest("short.txt", "hello");
        assert_eq!(short.content, "hello");
    }

    #[test]
    fn from_catalog_populates_every_category() {
        let map = FrameworkMap::from_catalog();
        for &fw in Framework::all() {
            let ids: Vec<Category> = map.items(fw).iter().map(|i| i.id).collect();
            assert_eq!(ids, fw.categories());
        }
    }

    #[test]
    fn normalize_fills_missing_and_moves_misfiled_items() {
        let mut item = FrameworkItem::empty(Category::Strengths);
        item.ideas.push(idea("a", "Loyal customers", 7));
        let state = ProjectState {
            id: ProjectId::from("p1"),
            name: "Acme".into(),
            last_updated: Utc::now(),
            business_description: String::new(),
            documents: vec![],
            frameworks: FrameworkMap {
                pestle: vec![item],
                ..Default::default()
            },
        }
        .normalize();

        assert_eq!(state.frameworks.pestle.len(), 6);
        assert!(state.frameworks.pestle.iter().all(|i| i.ideas.is_empty()));
        let strengths = state.frameworks.item(Category::Strengths).unwrap();
        assert_eq!(strengths.ideas.len(), 1);
        assert_eq!(strengths.ideas[0].order, 0);
    }

    #[test]
    fn normalize_reissues_duplicate_ids_and_drops_blank_ideas() {
        let mut political = FrameworkItem::empty(Category::Political);
        political.ideas = vec![idea("dup", "One", 0), idea("x", "  ", 1)];
        let mut legal = FrameworkItem::empty(Category::Legal);
        legal.ideas = vec![idea("dup", "Two", 0)];
        let mut frameworks = FrameworkMap::from_catalog();
        frameworks.pestle[0] = political;
        frameworks.pestle[4] = legal;

        let state = ProjectState {
            id: ProjectId::from("p1"),
            name: "Acme".into(),
            last_updated: Utc::now(),
            business_description: String::new(),
            documents: vec![],
            frameworks,
        }
        .normalize();

        let political = state.frameworks.item(Category::Political).unwrap();
        let legal = state.frameworks.item(Category::Legal).unwrap();
        assert_eq!(political.ideas.len(), 1);
        assert_eq!(political.ideas[0].id.as_str(), "dup");
        assert_ne!(legal.ideas[0].id.as_str(), "dup");
    }

    #[test]
    fn project_state_uses_camel_case_on_the_wire() {
        let state = ProjectState {
            id: ProjectId::from("p1"),
            name: "Acme".into(),
            last_updated: Utc::now(),
            business_description: "Widgets".into(),
            documents: vec![],
            frameworks: FrameworkMap::from_catalog(),
        };
        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("lastUpdated").is_some());
        assert_eq!(json["businessDescription"], "Widgets");
        assert_eq!(json["frameworks"]["swot"][0]["id"], "strengths");
    }

    #[test]
    fn merge_fields_keeps_unknown_existing_keys() {
        let mut existing = serde_json::json!({"name": "Old", "ownerNote": "keep"});
        let incoming = serde_json::json!({"name": "New"});
        merge_fields(&mut existing, incoming.clone());
        merge_fields(&mut existing, incoming);
        assert_eq!(existing, serde_json::json!({"name": "New", "ownerNote": "keep"}));
    }
}
