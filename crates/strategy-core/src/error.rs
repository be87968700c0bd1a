use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("project name must not be empty")]
    EmptyProjectName,

    #[error("idea text must not be empty")]
    EmptyIdeaText,

    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("idea not found: {0}")]
    IdeaNotFound(String),

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("unknown framework '{0}': expected pestle, porter, marketing4p or swot")]
    UnknownFramework(String),

    #[error("unknown category '{category}' for framework '{framework}'")]
    UnknownCategory { framework: String, category: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("remote store returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("suggestion request failed: {0}")]
    Suggestion(String),

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for StrategyError {
    fn from(err: reqwest::Error) -> Self {
        StrategyError::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StrategyError>;
