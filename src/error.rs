use thiserror::Error;

#[derive(Error, Debug)]
pub enum IonixError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Upstream(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IonixError {
    pub fn validation(message: impl Into<String>) -> Self {
        IonixError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        IonixError::NotFound(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        IonixError::Auth(message.into())
    }

    /// True for the user-facing taxonomy, false for infrastructure failures.
    pub fn is_client_facing(&self) -> bool {
        matches!(
            self,
            IonixError::Validation(_)
                | IonixError::Conflict(_)
                | IonixError::Auth(_)
                | IonixError::Authorization(_)
                | IonixError::NotFound(_)
                | IonixError::Upstream(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, IonixError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy_messages_are_bare() {
        let err = IonixError::validation("Please add a title");
        assert_eq!(err.to_string(), "Please add a title");
        assert!(err.is_client_facing());
    }

    #[test]
    fn test_infrastructure_errors_are_not_client_facing() {
        let err = IonixError::Config("missing secret".to_string());
        assert!(!err.is_client_facing());
        assert!(err.to_string().contains("missing secret"));
    }
}
