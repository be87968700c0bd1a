use super::ProjectRepository;
use crate::error::Result;
use crate::http::{self, check};
use crate::model::{ProjectId, ProjectState, UserId};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;

/// Project documents held by the proxy server's `/projects` endpoints.
pub struct RemoteRepository {
    client: reqwest::Client,
    base: Url,
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    projects: Vec<serde_json::Value>,
}

impl RemoteRepository {
    /// `base_url` is the server root, e.g. `http://localhost:3001`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http::client(timeout)?,
            base: http::parse_base(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, segments: &[&str]) -> Url {
        http::join(&self.base, segments)
    }
}

#[async_trait::async_trait]
impl ProjectRepository for RemoteRepository {
    async fn load(&self, user: &UserId) -> Result<Vec<ProjectState>> {
        let url = self.url(&["projects", user.as_str()]);
        let response = check(self.client.get(url).send().await?).await?;
        let body: ListResponse = response.json().await?;
        Ok(body
            .projects
            .into_iter()
            .filter_map(|v| match serde_json::from_value::<ProjectState>(v) {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::warn!(%user, error = %e, "skipping malformed project from server");
                    None
                }
            })
            .collect())
    }

    async fn save(&self, user: &UserId, project: &ProjectState) -> Result<()> {
        let url = self.url(&["projects", user.as_str()]);
        check(self.client.post(url).json(project).send().await?).await?;
        Ok(())
    }

    async fn delete(&self, user: &UserId, project: &ProjectId) -> Result<()> {
        let url = self.url(&["projects", user.as_str(), project.as_str()]);
        let response = self.client.delete(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(%user, %project, "project already absent on server");
            return Ok(());
        }
        check(response).await?;
        Ok(())
    }

    fn describe(&self) -> &'static str {
        "remote"
    }
}
