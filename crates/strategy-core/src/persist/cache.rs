use super::ProjectRepository;
use crate::error::{Result, StrategyError};
use crate::io::{atomic_write, remove_if_exists};
use crate::model::{merge_fields, ProjectId, ProjectState, UserId};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Per-user JSON array of projects on local disk.
///
/// Serves as the primary repository when no server is configured, and as
/// the legacy cache migrated into the remote store once one is.
#[derive(Debug, Clone)]
pub struct LocalCache {
    dir: PathBuf,
}

impl LocalCache {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, user: &UserId) -> PathBuf {
        static UNSAFE: OnceLock<Regex> = OnceLock::new();
        let re = UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_-]").expect("static regex"));
        let name = re.replace_all(user.as_str(), "_");
        self.dir.join(format!("projects-{name}.json"))
    }

    /// Projects in the cache. An absent file reads as empty; entries that no
    /// longer parse are skipped with a warning.
    pub fn read(&self, user: &UserId) -> Result<Vec<ProjectState>> {
        Ok(self
            .read_values(user)?
            .into_iter()
            .filter_map(|v| match serde_json::from_value::<ProjectState>(v) {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::warn!(%user, error = %e, "skipping unreadable cached project");
                    None
                }
            })
            .collect())
    }

    pub fn write(&self, user: &UserId, projects: &[ProjectState]) -> Result<()> {
        let values = projects
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.write_values(user, &values)
    }

    /// Delete the cache file. Returns `false` if there was none.
    pub fn clear(&self, user: &UserId) -> Result<bool> {
        remove_if_exists(&self.path_for(user))
    }

    fn read_values(&self, user: &UserId) -> Result<Vec<serde_json::Value>> {
        let path = self.path_for(user);
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&data)?)
    }

    fn write_values(&self, user: &UserId, values: &[serde_json::Value]) -> Result<()> {
        let data = serde_json::to_vec_pretty(values)?;
        atomic_write(&self.path_for(user), &data)
    }

    fn upsert(&self, user: &UserId, project: &ProjectState) -> Result<()> {
        let incoming = serde_json::to_value(project)?;
        let mut values = self.read_values(user)?;
        match values.iter_mut().find(|v| v["id"] == project.id.as_str()) {
            Some(existing) => merge_fields(existing, incoming),
            None => values.insert(0, incoming),
        }
        self.write_values(user, &values)
    }

    fn remove(&self, user: &UserId, project: &ProjectId) -> Result<()> {
        let mut values = self.read_values(user)?;
        let before = values.len();
        values.retain(|v| v["id"] != project.as_str());
        if values.len() != before {
            self.write_values(user, &values)?;
        }
        Ok(())
    }
}

pub(super) async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StrategyError::Io(std::io::Error::other(format!("task join error: {e}"))))?
}

#[async_trait::async_trait]
impl ProjectRepository for LocalCache {
    async fn load(&self, user: &UserId) -> Result<Vec<ProjectState>> {
        let cache = self.clone();
        let user = user.clone();
        blocking(move || cache.read(&user)).await
    }

    async fn save(&self, user: &UserId, project: &ProjectState) -> Result<()> {
        let cache = self.clone();
        let user = user.clone();
        let project = project.clone();
        blocking(move || cache.upsert(&user, &project)).await
    }

    async fn delete(&self, user: &UserId, project: &ProjectId) -> Result<()> {
        let cache = self.clone();
        let user = user.clone();
        let project = project.clone();
        blocking(move || cache.remove(&user, &project)).await
    }

    fn describe(&self) -> &'static str {
        "local cache"
    }
}
