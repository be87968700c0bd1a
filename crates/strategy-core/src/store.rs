//! In-memory project store.
//!
//! Entities live in flat maps keyed by id: projects, framework items keyed by
//! `(project, category)`, and ideas keyed by idea id. Ownership is expressed
//! by id lists (a project owns the items under its id, an item owns the ideas
//! listed in it); nothing points back up.
//!
//! All mutation of an existing project goes through
//! [`ProjectStore::update_project`], which hands the updater a
//! [`ProjectEditor`]. The editor journals the original value of every entity
//! before its first change, so a failing updater is rolled back entity by
//! entity and only the touched path is ever copied.

use crate::catalog::{Category, Framework};
use crate::clock::{Clock, SystemClock};
use crate::error::{Result, StrategyError};
use crate::model::{
    DocumentId, DocumentRecord, FrameworkItem, FrameworkMap, Idea, IdeaId, Origin, ProjectId,
    ProjectState,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Marker appended to the text of AI-suggested ideas.
pub const AI_SUFFIX: &str = " (AI)";

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Toward index 0.
    Up,
    /// Toward the end of the list.
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Up => "up",
            Direction::Down => "down",
        })
    }
}

impl std::str::FromStr for Direction {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            _ => Err(StrategyError::InvalidRequest(format!(
                "direction must be 'up' or 'down', got '{s}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct ProjectRecord {
    id: ProjectId,
    name: String,
    last_updated: DateTime<Utc>,
    business_description: String,
    documents: Vec<DocumentRecord>,
}

#[derive(Debug, Clone, Default)]
struct ItemRecord {
    ideas: Vec<IdeaId>,
    justification: String,
}

type ItemKey = (ProjectId, Category);

/// Lightweight row for project listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub name: String,
    pub last_updated: DateTime<Utc>,
    pub idea_count: usize,
    pub selected_count: usize,
    pub document_count: usize,
}

// ---------------------------------------------------------------------------
// ProjectStore
// ---------------------------------------------------------------------------

pub struct ProjectStore {
    /// Display order, newest-created first.
    order: Vec<ProjectId>,
    projects: HashMap<ProjectId, ProjectRecord>,
    items: HashMap<ItemKey, ItemRecord>,
    ideas: HashMap<IdeaId, Idea>,
    active: Option<ProjectId>,
    clock: Arc<dyn Clock>,
}

impl Default for ProjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            order: Vec::new(),
            projects: HashMap::new(),
            items: HashMap::new(),
            ideas: HashMap::new(),
            active: None,
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: &ProjectId) -> bool {
        self.projects.contains_key(id)
    }

    pub fn active(&self) -> Option<&ProjectId> {
        self.active.as_ref()
    }

    /// Make `id` the active project. Returns `false` if it is unknown.
    pub fn set_active(&mut self, id: &ProjectId) -> bool {
        if self.projects.contains_key(id) {
            self.active = Some(id.clone());
            true
        } else {
            false
        }
    }

    pub fn clear_active(&mut self) {
        self.active = None;
    }

    /// Project ids in display order.
    pub fn ids(&self) -> &[ProjectId] {
        &self.order
    }

    pub fn summaries(&self) -> Vec<ProjectSummary> {
        self.order
            .iter()
            .filter_map(|id| self.projects.get(id))
            .map(|p| {
                let ideas: Vec<&Idea> = Category::all()
                    .filter_map(|c| self.items.get(&(p.id.clone(), c)))
                    .flat_map(|item| item.ideas.iter())
                    .filter_map(|iid| self.ideas.get(iid))
                    .collect();
                ProjectSummary {
                    id: p.id.clone(),
                    name: p.name.clone(),
                    last_updated: p.last_updated,
                    idea_count: ideas.len(),
                    selected_count: ideas.iter().filter(|i| i.selected).count(),
                    document_count: p.documents.len(),
                }
            })
            .collect()
    }

    /// Summaries sorted by `last_updated`, newest first.
    pub fn by_recency(&self) -> Vec<ProjectSummary> {
        let mut rows = self.summaries();
        rows.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        rows
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Create a project from the catalog template, prepend it and make it
    /// active.
    pub fn create_project(&mut self, name: &str) -> Result<ProjectId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StrategyError::EmptyProjectName);
        }

        let id = ProjectId::generate();
        self.projects.insert(
            id.clone(),
            ProjectRecord {
                id: id.clone(),
                name: name.to_string(),
                last_updated: self.clock.now(),
                business_description: String::new(),
                documents: Vec::new(),
            },
        );
        for category in Category::all() {
            self.items
                .insert((id.clone(), category), ItemRecord::default());
        }
        self.order.insert(0, id.clone());
        self.active = Some(id.clone());
        Ok(id)
    }

    /// Apply `updater` to the project `id` and refresh its `last_updated`.
    ///
    /// Returns `Ok(None)` without doing anything when `id` is unknown. When
    /// the updater fails every change it made is undone and the timestamp is
    /// left alone.
    pub fn update_project<R, F>(&mut self, id: &ProjectId, updater: F) -> Result<Option<R>>
    where
        F: FnOnce(&mut ProjectEditor<'_>) -> Result<R>,
    {
        let now = self.clock.now();
        let Self {
            projects,
            items,
            ideas,
            ..
        } = self;
        let Some(record) = projects.get_mut(id) else {
            return Ok(None);
        };

        let mut editor = ProjectEditor {
            record,
            items,
            ideas,
            journal: Journal::default(),
        };
        match updater(&mut editor) {
            Ok(value) => {
                editor.record.last_updated = now.max(editor.record.last_updated);
                Ok(Some(value))
            }
            Err(e) => {
                editor.rollback();
                Err(e)
            }
        }
    }

    /// Swap an idea with its neighbour. `Ok(Some(false))` means it was already
    /// at the boundary.
    pub fn reorder_idea(
        &mut self,
        id: &ProjectId,
        category: Category,
        idea: &IdeaId,
        direction: Direction,
    ) -> Result<Option<bool>> {
        self.update_project(id, |p| p.move_idea(category, idea, direction))
    }

    /// Remove a project and everything it owns. Clears the active selection
    /// only if it pointed at this project.
    pub fn delete_project(&mut self, id: &ProjectId) -> bool {
        if self.projects.remove(id).is_none() {
            return false;
        }
        self.order.retain(|p| p != id);
        for category in Category::all() {
            if let Some(item) = self.items.remove(&(id.clone(), category)) {
                for idea in item.ideas {
                    self.ideas.remove(&idea);
                }
            }
        }
        if self.active.as_ref() == Some(id) {
            self.active = None;
        }
        true
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    /// Materialise the nested document for one project.
    pub fn snapshot(&self, id: &ProjectId) -> Option<ProjectState> {
        let record = self.projects.get(id)?;
        let mut frameworks = FrameworkMap::default();
        for &fw in Framework::all() {
            *frameworks.items_mut(fw) = fw
                .categories()
                .iter()
                .map(|&category| {
                    let mut item = FrameworkItem::empty(category);
                    if let Some(rec) = self.items.get(&(id.clone(), category)) {
                        item.justification = rec.justification.clone();
                        item.ideas = rec
                            .ideas
                            .iter()
                            .filter_map(|iid| self.ideas.get(iid).cloned())
                            .collect();
                    }
                    item
                })
                .collect();
        }
        Some(ProjectState {
            id: record.id.clone(),
            name: record.name.clone(),
            last_updated: record.last_updated,
            business_description: record.business_description.clone(),
            documents: record.documents.clone(),
            frameworks,
        })
    }

    /// Snapshots of every project in display order.
    pub fn snapshots(&self) -> Vec<ProjectState> {
        self.order.iter().filter_map(|id| self.snapshot(id)).collect()
    }

    /// Replace the whole store with `states`, keeping their order. The active
    /// selection survives if the project is still present.
    pub fn replace_all(&mut self, states: Vec<ProjectState>) {
        self.order.clear();
        self.projects.clear();
        self.items.clear();
        self.ideas.clear();
        for state in states {
            if self.projects.contains_key(&state.id) {
                tracing::warn!(project = %state.id, "duplicate project id in load result, skipping");
                continue;
            }
            let id = state.id.clone();
            self.insert_state(state);
            self.order.push(id);
        }
        if let Some(active) = &self.active {
            if !self.projects.contains_key(active) {
                self.active = None;
            }
        }
    }

    fn insert_state(&mut self, state: ProjectState) {
        let state = state.normalize();
        let id = state.id.clone();
        for &fw in Framework::all() {
            for item in state.frameworks.items(fw) {
                let mut rec = ItemRecord {
                    ideas: Vec::with_capacity(item.ideas.len()),
                    justification: item.justification.clone(),
                };
                for idea in &item.ideas {
                    let mut idea = idea.clone();
                    while self.ideas.contains_key(&idea.id) {
                        idea.id = IdeaId::generate();
                    }
                    rec.ideas.push(idea.id.clone());
                    self.ideas.insert(idea.id.clone(), idea);
                }
                self.items.insert((id.clone(), item.id), rec);
            }
        }
        self.projects.insert(
            id.clone(),
            ProjectRecord {
                id,
                name: state.name,
                last_updated: state.last_updated,
                business_description: state.business_description,
                documents: state.documents,
            },
        );
    }
}

// ---------------------------------------------------------------------------
// ProjectEditor
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Journal {
    record: Option<ProjectRecord>,
    items: HashMap<Category, ItemRecord>,
    /// `None` marks an idea that did not exist before the update.
    ideas: HashMap<IdeaId, Option<Idea>>,
}

/// Mutable view of one project handed to an updater.
pub struct ProjectEditor<'a> {
    record: &'a mut ProjectRecord,
    items: &'a mut HashMap<ItemKey, ItemRecord>,
    ideas: &'a mut HashMap<IdeaId, Idea>,
    journal: Journal,
}

impl ProjectEditor<'_> {
    pub fn id(&self) -> &ProjectId {
        &self.record.id
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn business_description(&self) -> &str {
        &self.record.business_description
    }

    pub fn documents(&self) -> &[DocumentRecord] {
        &self.record.documents
    }

    pub fn ideas(&self, category: Category) -> Vec<&Idea> {
        self.items
            .get(&(self.record.id.clone(), category))
            .map(|item| {
                item.ideas
                    .iter()
                    .filter_map(|id| self.ideas.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn justification(&self, category: Category) -> &str {
        self.items
            .get(&(self.record.id.clone(), category))
            .map(|item| item.justification.as_str())
            .unwrap_or("")
    }

    // -----------------------------------------------------------------------
    // Project fields
    // -----------------------------------------------------------------------

    pub fn rename(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StrategyError::EmptyProjectName);
        }
        self.record_mut().name = name.to_string();
        Ok(())
    }

    pub fn set_business_description(&mut self, text: impl Into<String>) {
        self.record_mut().business_description = text.into();
    }

    pub fn add_document(&mut self, name: impl Into<String>, content: &str) -> DocumentId {
        let doc = DocumentRecord::ingest(name, content);
        let id = doc.id.clone();
        self.record_mut().documents.push(doc);
        id
    }

    pub fn rename_document(&mut self, id: &DocumentId, name: impl Into<String>) -> Result<()> {
        let pos = self.document_pos(id)?;
        self.record_mut().documents[pos].name = name.into();
        Ok(())
    }

    pub fn remove_document(&mut self, id: &DocumentId) -> Result<DocumentRecord> {
        let pos = self.document_pos(id)?;
        Ok(self.record_mut().documents.remove(pos))
    }

    // -----------------------------------------------------------------------
    // Ideas
    // -----------------------------------------------------------------------

    /// Append a human-authored idea. New manual ideas start selected.
    pub fn add_idea(&mut self, category: Category, text: &str) -> Result<IdeaId> {
        let text = non_empty(text)?;
        let order = self.item(category).ideas.len() as u32;
        let idea = Idea {
            id: IdeaId::generate(),
            text,
            origin: Origin::Human,
            selected: true,
            order,
        };
        Ok(self.push_idea(category, idea))
    }

    pub fn edit_idea(&mut self, category: Category, id: &IdeaId, text: &str) -> Result<()> {
        let text = non_empty(text)?;
        self.idea_mut(category, id)?.text = text;
        Ok(())
    }

    /// Flip the inclusion flag and return the new value.
    pub fn toggle_idea(&mut self, category: Category, id: &IdeaId) -> Result<bool> {
        let idea = self.idea_mut(category, id)?;
        idea.selected = !idea.selected;
        Ok(idea.selected)
    }

    pub fn set_selected(&mut self, category: Category, id: &IdeaId, selected: bool) -> Result<()> {
        self.idea_mut(category, id)?.selected = selected;
        Ok(())
    }

    pub fn remove_idea(&mut self, category: Category, id: &IdeaId) -> Result<Idea> {
        self.check_owned(category, id)?;
        self.item_mut(category).ideas.retain(|i| i != id);
        self.journal_idea(id);
        let removed = self
            .ideas
            .remove(id)
            .ok_or_else(|| StrategyError::IdeaNotFound(id.to_string()))?;
        self.renumber(category);
        Ok(removed)
    }

    /// Swap the idea with its neighbour in `direction`. Returns `false` and
    /// leaves the list untouched when it is already at that end.
    pub fn move_idea(
        &mut self,
        category: Category,
        id: &IdeaId,
        direction: Direction,
    ) -> Result<bool> {
        let list = &self.item(category).ideas;
        let pos = list
            .iter()
            .position(|i| i == id)
            .ok_or_else(|| StrategyError::IdeaNotFound(id.to_string()))?;
        let target = match direction {
            Direction::Up if pos > 0 => pos - 1,
            Direction::Down if pos + 1 < list.len() => pos + 1,
            _ => return Ok(false),
        };
        self.item_mut(category).ideas.swap(pos, target);
        self.renumber(category);
        Ok(true)
    }

    pub fn set_justification(&mut self, category: Category, text: impl Into<String>) {
        self.item_mut(category).justification = text.into();
    }

    /// Append generated suggestions as unselected AI ideas, in batch order.
    /// Blank entries are skipped.
    pub fn merge_suggestions(&mut self, category: Category, suggestions: &[String]) -> Vec<IdeaId> {
        let base = self.item(category).ideas.len();
        let mut added = Vec::new();
        for text in suggestions.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
            let idea = Idea {
                id: IdeaId::generate(),
                text: with_ai_suffix(text),
                origin: Origin::Ai,
                selected: false,
                order: (base + added.len()) as u32,
            };
            added.push(self.push_idea(category, idea));
        }
        added
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn key(&self, category: Category) -> ItemKey {
        (self.record.id.clone(), category)
    }

    fn record_mut(&mut self) -> &mut ProjectRecord {
        if self.journal.record.is_none() {
            self.journal.record = Some(self.record.clone());
        }
        &mut *self.record
    }

    fn item(&self, category: Category) -> &ItemRecord {
        static EMPTY: ItemRecord = ItemRecord {
            ideas: Vec::new(),
            justification: String::new(),
        };
        self.items.get(&self.key(category)).unwrap_or(&EMPTY)
    }

    fn item_mut(&mut self, category: Category) -> &mut ItemRecord {
        let key = self.key(category);
        if !self.journal.items.contains_key(&category) {
            let before = self.items.get(&key).cloned().unwrap_or_default();
            self.journal.items.insert(category, before);
        }
        self.items.entry(key).or_default()
    }

    fn journal_idea(&mut self, id: &IdeaId) {
        if !self.journal.ideas.contains_key(id) {
            let before = self.ideas.get(id).cloned();
            self.journal.ideas.insert(id.clone(), before);
        }
    }

    fn check_owned(&self, category: Category, id: &IdeaId) -> Result<()> {
        if self.item(category).ideas.contains(id) {
            Ok(())
        } else {
            Err(StrategyError::IdeaNotFound(id.to_string()))
        }
    }

    fn idea_mut(&mut self, category: Category, id: &IdeaId) -> Result<&mut Idea> {
        self.check_owned(category, id)?;
        self.journal_idea(id);
        self.ideas
            .get_mut(id)
            .ok_or_else(|| StrategyError::IdeaNotFound(id.to_string()))
    }

    fn push_idea(&mut self, category: Category, idea: Idea) -> IdeaId {
        let id = idea.id.clone();
        self.journal_idea(&id);
        self.ideas.insert(id.clone(), idea);
        self.item_mut(category).ideas.push(id.clone());
        id
    }

    /// Keep each idea's `order` equal to its list position.
    fn renumber(&mut self, category: Category) {
        let ids = self.item(category).ideas.clone();
        for (pos, id) in ids.iter().enumerate() {
            let pos = pos as u32;
            if self.ideas.get(id).map(|i| i.order) != Some(pos) {
                self.journal_idea(id);
                if let Some(idea) = self.ideas.get_mut(id) {
                    idea.order = pos;
                }
            }
        }
    }

    fn document_pos(&self, id: &DocumentId) -> Result<usize> {
        self.record
            .documents
            .iter()
            .position(|d| &d.id == id)
            .ok_or_else(|| StrategyError::DocumentNotFound(id.to_string()))
    }

    fn rollback(self) {
        let Self {
            record,
            items,
            ideas,
            journal,
        } = self;
        if let Some(before) = journal.record {
            *record = before;
        }
        for (category, before) in journal.items {
            items.insert((record.id.clone(), category), before);
        }
        for (id, before) in journal.ideas {
            match before {
                Some(idea) => {
                    ideas.insert(id, idea);
                }
                None => {
                    ideas.remove(&id);
                }
            }
        }
    }
}

fn non_empty(text: &str) -> Result<String> {
    let text = text.trim();
    if text.is_empty() {
        Err(StrategyError::EmptyIdeaText)
    } else {
        Ok(text.to_string())
    }
}

fn with_ai_suffix(text: &str) -> String {
    if text.ends_with(AI_SUFFIX) {
        text.to_string()
    } else {
        format!("{text}{AI_SUFFIX}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
