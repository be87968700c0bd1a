use super::ProjectRepository;
use crate::error::{Result, StrategyError};
use crate::model::{merge_fields, ProjectId, ProjectState, UserId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// In-process repository with the same merge-on-save semantics as the
/// document server. Can be switched offline to exercise failure paths.
#[derive(Default)]
pub struct MemoryRepository {
    docs: Mutex<HashMap<UserId, Vec<serde_json::Value>>>,
    saves: AtomicUsize,
    offline: AtomicBool,
    load_delay: Option<Duration>,
    save_delay: Option<Duration>,
    first_save_delay: Option<Duration>,
    first_save_taken: AtomicBool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `load` take `delay` before answering.
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = Some(delay);
        self
    }

    /// Make every `save` take `delay` before writing.
    pub fn with_save_delay(mut self, delay: Duration) -> Self {
        self.save_delay = Some(delay);
        self
    }

    /// Make only the first `save` take `delay`; later saves answer at once.
    pub fn with_first_save_delay(mut self, delay: Duration) -> Self {
        self.first_save_delay = Some(delay);
        self
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn seed(&self, user: &UserId, projects: Vec<ProjectState>) {
        let values = projects
            .iter()
            .filter_map(|p| serde_json::to_value(p).ok())
            .collect();
        self.docs().insert(user.clone(), values);
    }

    pub fn saved(&self, user: &UserId, id: &ProjectId) -> Option<ProjectState> {
        self.docs()
            .get(user)?
            .iter()
            .find(|v| v["id"] == id.as_str())
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    fn docs(&self) -> MutexGuard<'_, HashMap<UserId, Vec<serde_json::Value>>> {
        self.docs.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StrategyError::Transport("store unreachable".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl ProjectRepository for MemoryRepository {
    async fn load(&self, user: &UserId) -> Result<Vec<ProjectState>> {
        if let Some(delay) = self.load_delay {
            tokio::time::sleep(delay).await;
        }
        self.check_online()?;
        let values = self.docs().get(user).cloned().unwrap_or_default();
        values
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(StrategyError::from))
            .collect()
    }

    async fn save(&self, user: &UserId, project: &ProjectState) -> Result<()> {
        let delay = match self.first_save_delay {
            Some(d) if !self.first_save_taken.swap(true, Ordering::SeqCst) => Some(d),
            _ => self.save_delay,
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_online()?;
        let incoming = serde_json::to_value(project)?;
        let mut docs = self.docs();
        let list = docs.entry(user.clone()).or_default();
        match list.iter_mut().find(|v| v["id"] == project.id.as_str()) {
            Some(existing) => merge_fields(existing, incoming),
            None => list.push(incoming),
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, user: &UserId, project: &ProjectId) -> Result<()> {
        self.check_online()?;
        if let Some(list) = self.docs().get_mut(user) {
            list.retain(|v| v["id"] != project.as_str());
        }
        Ok(())
    }

    fn describe(&self) -> &'static str {
        "memory"
    }
}
