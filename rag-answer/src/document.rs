//! Data types for documents, fragments, and retrieval hits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A source document that owns zero or more [`Fragment`]s.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// Human-readable title, cited in answers.
    pub title: String,
    /// Optional link to the original publication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Free-form metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// When the document was published or first stored.
    pub published_at: DateTime<Utc>,
}

impl Document {
    /// Create a document with a fresh identifier, published now.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            link: None,
            metadata: None,
            published_at: Utc::now(),
        }
    }

    /// Set the document identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the link to the original publication.
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// Attach free-form metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// The citation reference for this document.
    pub fn source_ref(&self) -> SourceRef {
        SourceRef { id: self.id.clone(), title: self.title.clone(), link: self.link.clone() }
    }
}

/// A chunk of document text with its vector embedding.
///
/// The owning [`Document`] is not referenced from here; ownership lives in
/// the document graph's fragment → document index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fragment {
    /// Unique identifier for the fragment.
    pub id: String,
    /// The text content of the fragment.
    pub text: String,
    /// The vector embedding for this fragment's text.
    pub embedding: Vec<f32>,
    /// Free-form metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// When the fragment was created.
    pub created_at: DateTime<Utc>,
}

impl Fragment {
    /// Create a fragment with a fresh identifier, created now.
    pub fn new(text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            embedding,
            metadata: None,
            created_at: Utc::now(),
        }
    }

    /// Set the fragment identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Attach free-form metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A fragment returned by a nearest-neighbour query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalHit {
    /// Identifier of the matched fragment.
    pub fragment_id: String,
    /// Text of the matched fragment.
    pub text: String,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}

/// The document an answer cites.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceRef {
    /// Identifier of the document.
    #[serde(rename = "identity")]
    pub id: String,
    /// Title of the document.
    pub title: String,
    /// Link to the document, if it has one.
    pub link: Option<String>,
}
