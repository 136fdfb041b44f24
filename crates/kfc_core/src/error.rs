use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response. `message` is the server `detail` when it could be read.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid data: {0}")]
    Validation(String),

    #[error("{0}")]
    Domain(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    /// Message suitable for a container `*_error` field, falling back when
    /// the underlying error renders empty.
    pub fn user_message(&self, fallback: &str) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            fallback.to_string()
        } else {
            message
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_falls_back_on_empty() {
        let err = Error::Api { status: 500, message: String::new() };
        assert_eq!(err.user_message("Failed to load"), "Failed to load");

        let err = Error::Domain("The shelf is empty".to_string());
        assert_eq!(err.user_message("Failed to load"), "The shelf is empty");
    }

    #[test]
    fn test_status_only_for_http_failures() {
        let err = Error::Api { status: 404, message: "missing".to_string() };
        assert_eq!(err.status(), Some(404));
        assert_eq!(Error::Storage("x".to_string()).status(), None);
    }
}
