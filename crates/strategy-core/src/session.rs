//! Editing session for one user.
//!
//! `Session` is the context object every surface works through: it owns the
//! project store and is handed the persistence and suggestion gateways at
//! construction, so tests can substitute in-memory fakes for both. Every
//! accepted mutation queues a debounced write of the touched project.

use crate::catalog::Category;
use crate::error::{Result, StrategyError};
use crate::model::{IdeaId, ProjectId, ProjectState, UserId};
use crate::persist::{PersistenceGateway, SyncEvent};
use crate::store::{Direction, ProjectEditor, ProjectStore};
use crate::suggest::{business_context, SuggestionGateway, SuggestionRequest};
use std::sync::Arc;
use tokio::sync::broadcast;

pub struct Session {
    user: UserId,
    store: ProjectStore,
    persistence: PersistenceGateway,
    suggestions: Option<Arc<dyn SuggestionGateway>>,
}

impl Session {
    pub fn new(
        user: UserId,
        store: ProjectStore,
        persistence: PersistenceGateway,
        suggestions: Option<Arc<dyn SuggestionGateway>>,
    ) -> Self {
        Self {
            user,
            store,
            persistence,
            suggestions,
        }
    }

    /// Build a session and fill its store from the repository.
    pub async fn open(
        user: UserId,
        persistence: PersistenceGateway,
        suggestions: Option<Arc<dyn SuggestionGateway>>,
    ) -> Self {
        let mut session = Self::new(user, ProjectStore::new(), persistence, suggestions);
        session.reload().await;
        session
    }

    /// Replace the store contents with what the repository holds. Returns
    /// the number of projects loaded.
    pub async fn reload(&mut self) -> usize {
        let projects = self.persistence.load(&self.user).await;
        let count = projects.len();
        self.store.replace_all(projects);
        count
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn store(&self) -> &ProjectStore {
        &self.store
    }

    pub fn persistence(&self) -> &PersistenceGateway {
        &self.persistence
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.persistence.subscribe()
    }

    pub fn set_active(&mut self, id: &ProjectId) -> bool {
        self.store.set_active(id)
    }

    pub fn snapshot(&self, id: &ProjectId) -> Option<ProjectState> {
        self.store.snapshot(id)
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    pub fn create_project(&mut self, name: &str) -> Result<ProjectId> {
        let id = self.store.create_project(name)?;
        tracing::info!(user = %self.user, project = %id, "created project");
        self.schedule(&id);
        Ok(id)
    }

    /// Apply `updater` to project `id` and queue a save. Unknown ids are a
    /// silent no-op (`Ok(None)`); a failed updater queues nothing.
    pub fn update_project<R, F>(&mut self, id: &ProjectId, updater: F) -> Result<Option<R>>
    where
        F: FnOnce(&mut ProjectEditor<'_>) -> Result<R>,
    {
        let outcome = self.store.update_project(id, updater)?;
        if outcome.is_some() {
            self.schedule(id);
        }
        Ok(outcome)
    }

    pub fn reorder_idea(
        &mut self,
        id: &ProjectId,
        category: Category,
        idea: &IdeaId,
        direction: Direction,
    ) -> Result<Option<bool>> {
        self.update_project(id, |p| p.move_idea(category, idea, direction))
    }

    /// Remove the project locally, drop its pending write and delete it from
    /// the repository. A repository failure is returned but the local removal
    /// stands.
    pub async fn delete_project(&mut self, id: &ProjectId) -> Result<bool> {
        if !self.store.delete_project(id) {
            return Ok(false);
        }
        tracing::info!(user = %self.user, project = %id, "deleted project");
        self.persistence.delete(&self.user, id).await?;
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Suggestions
    // -----------------------------------------------------------------------

    pub fn suggestion_gateway(&self) -> Result<Arc<dyn SuggestionGateway>> {
        self.suggestions
            .clone()
            .ok_or(StrategyError::NotConfigured("suggestion service"))
    }

    /// Request built from the project's current description and documents.
    pub fn suggestion_request(
        &self,
        id: &ProjectId,
        category: Category,
        focus: Option<String>,
    ) -> Result<SuggestionRequest> {
        let project = self
            .store
            .snapshot(id)
            .ok_or_else(|| StrategyError::ProjectNotFound(id.to_string()))?;
        let context = business_context(&project.business_description, &project.documents);
        let request = SuggestionRequest::for_category(category, context, focus);
        request.validate()?;
        Ok(request)
    }

    /// Fold a batch of suggestions into the project as one update. Returns
    /// the new idea ids; empty if the project is gone.
    pub fn apply_suggestions(
        &mut self,
        id: &ProjectId,
        category: Category,
        suggestions: &[String],
    ) -> Result<Vec<IdeaId>> {
        if suggestions.iter().all(|s| s.trim().is_empty()) {
            return Ok(Vec::new());
        }
        let added = self
            .update_project(id, |p| Ok(p.merge_suggestions(category, suggestions)))?
            .unwrap_or_default();
        Ok(added)
    }

    /// Ask the suggestion gateway for ideas and merge them. On failure the
    /// store is left untouched.
    pub async fn request_suggestions(
        &mut self,
        id: &ProjectId,
        category: Category,
        focus: Option<String>,
    ) -> Result<Vec<IdeaId>> {
        let gateway = self.suggestion_gateway()?;
        let request = self.suggestion_request(id, category, focus)?;
        let ideas = match gateway.suggest(&request).await {
            Ok(ideas) => ideas,
            Err(e) => {
                tracing::warn!(project = %id, %category, error = %e, "suggestion request failed");
                return Err(e);
            }
        };
        self.apply_suggestions(id, category, &ideas)
    }

    // -----------------------------------------------------------------------
    // Sync
    // -----------------------------------------------------------------------

    pub fn pending_saves(&self) -> usize {
        self.persistence.pending_saves()
    }

    /// Write every queued project now.
    pub async fn flush(&self) -> Result<()> {
        self.persistence.flush().await
    }

    fn schedule(&self, id: &ProjectId) {
        if let Some(snapshot) = self.store.snapshot(id) {
            self.persistence.schedule_save(&self.user, snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::Origin;
    use chrono::{TimeZone, Utc};
    use crate::persist::{MemoryRepository, SyncOptions};
    use std::sync::Mutex;
    use std::time::Duration;

    struct FixedGateway {
        reply: Result<Vec<String>>,
        seen: Mutex<Vec<SuggestionRequest>>,
    }

    impl FixedGateway {
        fn ok(ideas: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(ideas.iter().map(|s| s.to_string()).collect()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err(StrategyError::Suggestion("backend down".into())),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl SuggestionGateway for FixedGateway {
        async fn suggest(&self, request: &SuggestionRequest) -> Result<Vec<String>> {
            self.seen.lock().unwrap().push(request.clone());
            match &self.reply {
                Ok(ideas) => Ok(ideas.clone()),
                Err(e) => Err(StrategyError::Suggestion(e.to_string())),
            }
        }
    }

    fn session(
        repo: Arc<MemoryRepository>,
        gateway: Option<Arc<dyn SuggestionGateway>>,
    ) -> Session {
        let persistence = PersistenceGateway::new(repo, SyncOptions::default());
        Session::new(UserId::from("u1"), ProjectStore::new(), persistence, gateway)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_updates_saves_once_with_final_state() {
        let repo = Arc::new(MemoryRepository::new());
        let mut s = session(repo.clone(), None);
        let id = s.create_project("Acme").unwrap();

        for text in ["Rates rising", "Weak pound", "Energy costs"] {
            s.update_project(&id, |p| p.add_idea(Category::Economic, text))
                .unwrap();
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        tokio::time::sleep(Duration::from_millis(1200)).await;
        tokio::task::yield_now().await;

        assert_eq!(repo.save_count(), 1);
        let saved = repo.saved(s.user(), &id).unwrap();
        assert_eq!(saved, s.snapshot(&id).unwrap());
        assert_eq!(saved.frameworks.item(Category::Economic).unwrap().ideas.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_update_queues_no_save() {
        let repo = Arc::new(MemoryRepository::new());
        let mut s = session(repo.clone(), None);
        let id = s.create_project("Acme").unwrap();
        s.flush().await.unwrap();

        assert!(s
            .update_project(&id, |p| p.add_idea(Category::Legal, "   "))
            .is_err());
        assert_eq!(s.pending_saves(), 0);
        assert_eq!(s.update_project(&ProjectId::from("missing"), |_| Ok(())).unwrap(), None);
        assert_eq!(s.pending_saves(), 0);
    }

    #[tokio::test]
    async fn open_loads_newest_first() {
        let repo = Arc::new(MemoryRepository::new());
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()));
        let persistence = PersistenceGateway::new(repo.clone(), SyncOptions::default());
        let mut first = Session::new(
            UserId::from("u1"),
            ProjectStore::with_clock(clock.clone()),
            persistence,
            None,
        );
        let a = first.create_project("A").unwrap();
        clock.advance(chrono::Duration::minutes(1));
        let b = first.create_project("B").unwrap();
        clock.advance(chrono::Duration::minutes(1));
        first
            .update_project(&a, |p| {
                p.set_business_description("touched last");
                Ok(())
            })
            .unwrap();
        first.flush().await.unwrap();

        let persistence = PersistenceGateway::new(repo, SyncOptions::default());
        let reopened = Session::open(UserId::from("u1"), persistence, None).await;
        assert_eq!(reopened.store().ids(), [a, b]);
    }

    #[tokio::test]
    async fn suggestions_merge_as_unselected_ai_ideas() {
        let repo = Arc::new(MemoryRepository::new());
        let gateway = FixedGateway::ok(&[
            "Expand into EU market",
            "Launch loyalty programme",
            "Reduce packaging waste",
        ]);
        let mut s = session(repo, Some(gateway.clone()));
        let id = s.create_project("Acme").unwrap();
        s.update_project(&id, |p| {
            p.set_business_description("Coffee roaster");
            Ok(())
        })
        .unwrap();

        let added = s
            .request_suggestions(&id, Category::Opportunities, Some("exports".into()))
            .await
            .unwrap();
        assert_eq!(added.len(), 3);

        let snapshot = s.snapshot(&id).unwrap();
        let item = snapshot.frameworks.item(Category::Opportunities).unwrap();
        let orders: Vec<u32> = item.ideas.iter().map(|i| i.order).collect();
        assert_eq!(orders, [0, 1, 2]);
        assert!(item.ideas.iter().all(|i| i.origin == Origin::Ai && !i.selected));
        assert_eq!(item.ideas[0].text, "Expand into EU market (AI)");

        let seen = gateway.seen.lock().unwrap();
        assert_eq!(seen[0].framework_key, "swot");
        assert_eq!(seen[0].item_title, "Opportunities");
        assert_eq!(seen[0].business_context, "Coffee roaster");
        assert_eq!(seen[0].prompt_override.as_deref(), Some("exports"));
    }

    #[tokio::test]
    async fn failed_suggestion_leaves_store_untouched() {
        let repo = Arc::new(MemoryRepository::new());
        let mut s = session(repo, Some(FixedGateway::failing()));
        let id = s.create_project("Acme").unwrap();
        let before = s.snapshot(&id).unwrap();

        assert!(s
            .request_suggestions(&id, Category::Threats, None)
            .await
            .is_err());
        assert_eq!(s.snapshot(&id).unwrap(), before);
    }

    #[tokio::test]
    async fn suggestions_without_gateway_are_not_configured() {
        let repo = Arc::new(MemoryRepository::new());
        let mut s = session(repo, None);
        let id = s.create_project("Acme").unwrap();
        assert!(matches!(
            s.request_suggestions(&id, Category::Threats, None).await,
            Err(StrategyError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn suggestions_for_deleted_project_are_dropped() {
        let repo = Arc::new(MemoryRepository::new());
        let mut s = session(repo, None);
        let id = s.create_project("Acme").unwrap();
        s.delete_project(&id).await.unwrap();
        let added = s
            .apply_suggestions(&id, Category::Price, &["Premium tier".to_string()])
            .unwrap();
        assert!(added.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn delete_cancels_pending_save() {
        let repo = Arc::new(MemoryRepository::new());
        let mut s = session(repo.clone(), None);
        let id = s.create_project("Acme").unwrap();
        assert_eq!(s.pending_saves(), 1);

        assert!(s.delete_project(&id).await.unwrap());
        assert_eq!(s.pending_saves(), 0);
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(repo.save_count(), 0);
        assert!(!s.delete_project(&id).await.unwrap());
    }

    #[tokio::test]
    async fn remote_delete_failure_keeps_local_removal() {
        let repo = Arc::new(MemoryRepository::new());
        let mut s = session(repo.clone(), None);
        let id = s.create_project("Acme").unwrap();
        repo.set_offline(true);

        assert!(s.delete_project(&id).await.is_err());
        assert!(!s.store().contains(&id));
    }
}
