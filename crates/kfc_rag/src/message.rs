use kfc_core::{Article, SourceCitation};
use serde::{Deserialize, Serialize};

/// Event emitted while an answer streams in.
///
/// `Token` always carries the whole answer so far. Receivers replace the
/// assistant text with it instead of appending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamMessage {
    Token {
        #[serde(default)]
        content: String,
    },
    Sources {
        #[serde(default)]
        sources: Vec<SourceCitation>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
    Error {
        #[serde(default)]
        error: String,
    },
    End,
}

impl StreamMessage {
    pub fn token(content: impl Into<String>) -> Self {
        StreamMessage::Token {
            content: content.into(),
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        StreamMessage::Error {
            error: error.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamMessage::End | StreamMessage::Error { .. })
    }
}

/// One question asked against a set of shelf articles.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub query: String,
    pub articles: Vec<Article>,
    pub dataset_id: Option<String>,
}

impl StreamRequest {
    pub fn new(query: impl Into<String>, articles: Vec<Article>) -> Self {
        Self {
            query: query.into(),
            articles,
            dataset_id: None,
        }
    }

    pub fn with_dataset(mut self, dataset_id: Option<String>) -> Self {
        self.dataset_id = dataset_id;
        self
    }
}
