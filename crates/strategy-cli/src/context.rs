//! Resolve where projects live and who owns them, then open a session.

use anyhow::Context as _;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use strategy_core::catalog::Category;
use strategy_core::config::ClientConfig;
use strategy_core::model::{IdeaId, ProjectId, ProjectState, UserId};
use strategy_core::persist::{LocalCache, PersistenceGateway, RemoteRepository};
use strategy_core::session::Session;
use strategy_core::suggest::{HttpSuggestionGateway, SuggestionGateway, DEFAULT_SUGGEST_TIMEOUT};

/// User id when none is configured.
pub const DEFAULT_USER: &str = "local";

/// Settings after flags and environment have been applied over the config
/// file.
pub struct Context {
    pub config_path: PathBuf,
    pub config: ClientConfig,
    pub user: UserId,
    pub server: Option<String>,
    pub cache_dir: PathBuf,
}

pub struct Overrides {
    pub config: Option<PathBuf>,
    pub server: Option<String>,
    pub user: Option<String>,
    pub cache_dir: Option<PathBuf>,
}

impl Context {
    pub fn resolve(overrides: Overrides) -> anyhow::Result<Self> {
        let config_path = match overrides.config {
            Some(path) => path,
            None => ClientConfig::default_path()?,
        };
        let config = ClientConfig::load(&config_path)
            .with_context(|| format!("reading {}", config_path.display()))?;

        let server = overrides
            .server
            .or_else(|| config.server_url.clone())
            .filter(|s| !s.trim().is_empty());
        let user = overrides
            .user
            .or_else(|| config.user.clone())
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USER.to_string());
        let cache_dir = match overrides.cache_dir {
            Some(dir) => dir,
            None => config.resolved_cache_dir()?,
        };

        Ok(Self {
            config_path,
            config,
            user: UserId::from(user),
            server,
            cache_dir,
        })
    }

    /// Run `fut` to completion on a fresh runtime.
    pub fn block_on<F, T>(&self, fut: F) -> anyhow::Result<T>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(fut)
    }

    /// Load the user's projects. With a server configured, projects live
    /// remotely and the local cache is migrated once; without one, the local
    /// cache is the store.
    pub async fn open_session(&self) -> anyhow::Result<Session> {
        let cache = LocalCache::new(&self.cache_dir);
        let options = self.config.sync_options();

        let (persistence, suggestions) = match &self.server {
            Some(url) => {
                let remote = RemoteRepository::new(url, options.load_timeout)
                    .with_context(|| format!("invalid server url '{url}'"))?;
                let gateway: Arc<dyn SuggestionGateway> =
                    Arc::new(HttpSuggestionGateway::new(url, DEFAULT_SUGGEST_TIMEOUT)?);
                let persistence =
                    PersistenceGateway::new(Arc::new(remote), options).with_legacy_cache(cache);
                (persistence, Some(gateway))
            }
            None => (PersistenceGateway::new(Arc::new(cache), options), None),
        };
        tracing::debug!(
            user = %self.user,
            store = persistence.repository().describe(),
            "opening session"
        );
        Ok(Session::open(self.user.clone(), persistence, suggestions).await)
    }

    /// Write every queued save before the process exits.
    pub async fn close_session(&self, session: &Session) -> anyhow::Result<()> {
        session
            .flush()
            .await
            .context("some changes could not be saved")
    }
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

/// A project by exact id, or by unique case-insensitive name.
pub fn find_project(session: &Session, key: &str) -> anyhow::Result<ProjectId> {
    let key = key.trim();
    let id = ProjectId::from(key);
    if session.store().contains(&id) {
        return Ok(id);
    }
    let matches: Vec<_> = session
        .store()
        .summaries()
        .into_iter()
        .filter(|s| s.name.eq_ignore_ascii_case(key))
        .collect();
    match matches.as_slice() {
        [one] => Ok(one.id.clone()),
        [] => anyhow::bail!("project '{key}' not found"),
        _ => anyhow::bail!("project name '{key}' is ambiguous, use the project id"),
    }
}

pub fn parse_category(s: &str) -> anyhow::Result<Category> {
    s.parse::<Category>()
        .with_context(|| format!("unknown category '{s}'; run `strategy categories` for the list"))
}

/// An idea by 1-based position within the category, or by id.
pub fn find_idea(project: &ProjectState, category: Category, key: &str) -> anyhow::Result<IdeaId> {
    let ideas = project
        .frameworks
        .item(category)
        .map(|item| item.ideas.as_slice())
        .unwrap_or_default();
    if let Ok(pos) = key.trim().parse::<usize>() {
        return match pos.checked_sub(1).and_then(|i| ideas.get(i)) {
            Some(idea) => Ok(idea.id.clone()),
            None => anyhow::bail!("{category} has no idea #{pos}"),
        };
    }
    ideas
        .iter()
        .find(|i| i.id.as_str() == key.trim())
        .map(|i| i.id.clone())
        .with_context(|| format!("idea '{key}' not found in {category}"))
}
