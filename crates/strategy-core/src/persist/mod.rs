//! Persistence gateway.
//!
//! Keeps a per-user project collection in a [`ProjectRepository`] eventually
//! consistent with the in-memory store. Writes triggered by edits go through
//! the [`SaveScheduler`] (trailing-edge debounce per project); loads never
//! fail, they degrade to an empty list.

mod cache;
mod memory;
mod remote;
mod scheduler;

pub use cache::LocalCache;
pub use memory::MemoryRepository;
pub use remote::RemoteRepository;
pub use scheduler::SaveScheduler;

use crate::error::{Result, StrategyError};
use crate::model::{ProjectId, ProjectState, UserId};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;

/// Quiet period after the last edit before a project is written.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Upper bound on a project load before it is treated as failed.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// ProjectRepository
// ---------------------------------------------------------------------------

/// A per-user collection of project documents.
#[async_trait::async_trait]
pub trait ProjectRepository: Send + Sync {
    /// All projects owned by `user`, in no particular order.
    async fn load(&self, user: &UserId) -> Result<Vec<ProjectState>>;

    /// Upsert one project, merging into any existing document.
    async fn save(&self, user: &UserId, project: &ProjectState) -> Result<()>;

    async fn delete(&self, user: &UserId, project: &ProjectId) -> Result<()>;

    /// Short label for log lines.
    fn describe(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// SyncEvent
// ---------------------------------------------------------------------------

/// Outcome notifications for background writes.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Saved { project: ProjectId },
    SaveFailed { project: ProjectId, message: String },
    Deleted { project: ProjectId },
    DeleteFailed { project: ProjectId, message: String },
    Migrated { count: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    pub debounce: Duration,
    pub load_timeout: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            load_timeout: DEFAULT_LOAD_TIMEOUT,
        }
    }
}

// ---------------------------------------------------------------------------
// PersistenceGateway
// ---------------------------------------------------------------------------

pub struct PersistenceGateway {
    repository: Arc<dyn ProjectRepository>,
    legacy: Option<LocalCache>,
    scheduler: SaveScheduler,
    load_timeout: Duration,
    migrated: Mutex<HashSet<UserId>>,
    events: broadcast::Sender<SyncEvent>,
}

impl PersistenceGateway {
    pub fn new(repository: Arc<dyn ProjectRepository>, options: SyncOptions) -> Self {
        let (events, _) = broadcast::channel(64);
        let scheduler = SaveScheduler::new(repository.clone(), options.debounce, events.clone());
        Self {
            repository,
            legacy: None,
            scheduler,
            load_timeout: options.load_timeout,
            migrated: Mutex::new(HashSet::new()),
            events,
        }
    }

    /// Register a legacy local cache to be pushed into `repository` on the
    /// first load for each user.
    pub fn with_legacy_cache(mut self, cache: LocalCache) -> Self {
        self.legacy = Some(cache);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub fn repository(&self) -> &Arc<dyn ProjectRepository> {
        &self.repository
    }

    /// Load `user`'s projects, newest first.
    ///
    /// Never fails: an unreachable store, a failing store or a load that runs
    /// past the timeout all yield an empty list. The timeout covers the
    /// legacy migration as well as the load itself.
    pub async fn load(&self, user: &UserId) -> Vec<ProjectState> {
        let loaded = tokio::time::timeout(self.load_timeout, async {
            self.migrate_legacy(user).await;
            self.repository.load(user).await
        })
        .await;
        let mut projects = match loaded {
            Ok(Ok(projects)) => projects,
            Ok(Err(e)) => {
                tracing::warn!(
                    %user,
                    store = self.repository.describe(),
                    error = %e,
                    "project load failed, continuing with no projects"
                );
                return Vec::new();
            }
            Err(_) => {
                // An interrupted migration keeps its cache; let the next load retry it.
                self.migrated_set().remove(user);
                let e = StrategyError::Timeout(self.load_timeout);
                tracing::warn!(
                    %user,
                    store = self.repository.describe(),
                    error = %e,
                    "project load timed out, continuing with no projects"
                );
                return Vec::new();
            }
        };
        projects.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        tracing::debug!(%user, count = projects.len(), "loaded projects");
        projects
    }

    /// Write one project now, bypassing the debounce.
    pub async fn save(&self, user: &UserId, project: &ProjectState) -> Result<()> {
        scheduler::write(self.repository.as_ref(), &self.events, user, project).await
    }

    /// Queue a debounced write of `project`.
    pub fn schedule_save(&self, user: &UserId, project: ProjectState) {
        self.scheduler.schedule(user, project);
    }

    /// Drop any pending write for the project, wait out a write already in
    /// flight, then delete it remotely.
    pub async fn delete(&self, user: &UserId, project: &ProjectId) -> Result<()> {
        self.scheduler.cancel(project);
        let _turn = self.scheduler.quiesce(project).await;
        match self.repository.delete(user, project).await {
            Ok(()) => {
                let _ = self.events.send(SyncEvent::Deleted {
                    project: project.clone(),
                });
                Ok(())
            }
            Err(e) => {
                tracing::warn!(%user, %project, error = %e, "project delete failed");
                let _ = self.events.send(SyncEvent::DeleteFailed {
                    project: project.clone(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Write every pending project immediately.
    pub async fn flush(&self) -> Result<()> {
        self.scheduler.flush().await
    }

    pub fn pending_saves(&self) -> usize {
        self.scheduler.pending()
    }

    /// Push a non-empty legacy cache to the repository once per user, then
    /// clear it. A cache that could not be fully pushed is kept so the next
    /// session retries.
    async fn migrate_legacy(&self, user: &UserId) {
        let Some(cache) = &self.legacy else {
            return;
        };
        if !self.migrated_set().insert(user.clone()) {
            return;
        }

        let projects = match cache::blocking({
            let (cache, user) = (cache.clone(), user.clone());
            move || cache.read(&user)
        })
        .await
        {
            Ok(projects) => projects,
            Err(e) => {
                tracing::warn!(%user, error = %e, "could not read legacy project cache");
                return;
            }
        };
        if projects.is_empty() {
            return;
        }

        tracing::info!(%user, count = projects.len(), "migrating local projects to remote store");
        let mut failed = 0usize;
        for project in &projects {
            if let Err(e) = self.repository.save(user, project).await {
                tracing::warn!(%user, project = %project.id, error = %e, "migration write failed");
                failed += 1;
            }
        }
        if failed > 0 {
            tracing::warn!(%user, failed, "keeping legacy cache for a later migration attempt");
            return;
        }
        let cleared = cache::blocking({
            let (cache, user) = (cache.clone(), user.clone());
            move || cache.clear(&user)
        })
        .await;
        if let Err(e) = cleared {
            tracing::warn!(%user, error = %e, "migrated, but could not clear legacy cache");
        }
        let _ = self.events.send(SyncEvent::Migrated {
            count: projects.len(),
        });
    }

    fn migrated_set(&self) -> MutexGuard<'_, HashSet<UserId>> {
        self.migrated.lock().unwrap_or_else(|e| e.into_inner())
    }
}
