use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InsightsError {
    #[error("The insights client is not configured (pass a client, or disable it explicitly)")]
    MissingInsightsClient,

    #[error("Could not extract search client credentials: {0}")]
    MissingCredentials(String),

    #[error("Search helper is not available on the search instance")]
    HelperNotReady,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(String),
}

pub type Result<T> = std::result::Result<T, InsightsError>;

impl From<serde_json::Error> for InsightsError {
    fn from(e: serde_json::Error) -> Self {
        InsightsError::Json(e.to_string())
    }
}

impl InsightsError {
    /// Whether middleware setup must abort. Dropped events are never errors,
    /// so every variant here is a setup failure.
    pub fn is_fatal(&self) -> bool {
        match self {
            InsightsError::MissingInsightsClient => true,
            InsightsError::MissingCredentials(_) => true,
            InsightsError::HelperNotReady => true,
            InsightsError::Config(_) => true,
            InsightsError::Json(_) => true,
        }
    }

    /// Short machine-readable code, printed by the CLI next to the message.
    pub fn code(&self) -> &'static str {
        match self {
            InsightsError::MissingInsightsClient => "missing_insights_client",
            InsightsError::MissingCredentials(_) => "missing_credentials",
            InsightsError::HelperNotReady => "helper_not_ready",
            InsightsError::Config(_) => "config_error",
            InsightsError::Json(_) => "json_error",
        }
    }
}
