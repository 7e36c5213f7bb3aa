use crate::error::DiffError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Separator placed between page texts when a document is flattened.
///
/// A blank line, so page boundaries are also paragraph boundaries for the chunker.
pub const PAGE_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub document_id: String,
    pub source_path: Option<String>,
    pub pages: Vec<String>,
}

impl Document {
    pub fn new(document_id: impl Into<String>, pages: Vec<String>) -> Self {
        Self {
            document_id: document_id.into(),
            source_path: None,
            pages,
        }
    }

    /// Single-page document whose id is the SHA-256 of its text.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(content_id(text.as_bytes()), vec![text])
    }

    pub fn text(&self) -> String {
        self.pages.join(PAGE_SEPARATOR)
    }
}

pub fn content_id(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub document_id: String,
    /// Ordinal among the chunks that survived length filtering.
    pub position: usize,
    /// Byte range of `text` inside the flattened document text.
    pub start: usize,
    pub end: usize,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    /// Binds the embedding once; a chunk that already carries one keeps it.
    pub fn attach_embedding(&mut self, embedding: Vec<f32>) {
        if self.embedding.is_none() {
            self.embedding = Some(embedding);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeRecord {
    pub position: usize,
    pub text: String,
    pub similarity: f64,
    pub nearest_old_position: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub old_document_id: String,
    pub new_document_id: String,
    pub old_chunk_count: usize,
    pub new_chunk_count: usize,
    pub similarity_threshold: f64,
    pub changes: Vec<ChangeRecord>,
    pub compared_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiffOptions {
    pub min_chunk_chars: usize,
    pub similarity_threshold: f64,
    pub embed_timeout_secs: u64,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            min_chunk_chars: 30,
            similarity_threshold: 0.85,
            embed_timeout_secs: 120,
        }
    }
}

impl DiffOptions {
    pub fn validate(&self) -> Result<(), DiffError> {
        let threshold = self.similarity_threshold;
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(DiffError::InvalidConfiguration(format!(
                "similarity threshold must be within [0, 1], got {threshold}"
            )));
        }

        if self.embed_timeout_secs == 0 {
            return Err(DiffError::InvalidConfiguration(
                "embedding timeout must be at least one second".to_string(),
            ));
        }

        Ok(())
    }

    pub fn embed_timeout(&self) -> Duration {
        Duration::from_secs(self.embed_timeout_secs)
    }
}
