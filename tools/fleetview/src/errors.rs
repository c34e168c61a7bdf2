use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FleetviewError {
    #[error("io error: {0}")]
    Io(String),
    #[error("config parse error: {0}")]
    ConfigParse(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("cli error: {0}")]
    Cli(String),
    #[error("fetch failed for {endpoint}: {message}")]
    Fetch { endpoint: String, message: String },
    #[error("render error: {0}")]
    Render(String),
}

impl FleetviewError {
    pub fn fetch(endpoint: &str, message: impl Into<String>) -> Self {
        Self::Fetch {
            endpoint: endpoint.to_string(),
            message: message.into(),
        }
    }
}
