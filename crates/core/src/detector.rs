use crate::chunking::split_into_chunks;
use crate::embeddings::Embedder;
use crate::index::{BestMatch, SimilarityIndex};
use crate::models::{ChangeRecord, Chunk, ComparisonReport, DiffOptions, Document};
use crate::DiffError;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Reports the chunks of a new revision that have no close counterpart in the old one.
///
/// The embedder is constructed once by the caller and shared across every
/// comparison this detector runs.
pub struct ChangeDetector<E> {
    embedder: Arc<E>,
}

struct Comparison {
    old_chunk_count: usize,
    new_chunk_count: usize,
    changes: Vec<ChangeRecord>,
}

impl<E> ChangeDetector<E>
where
    E: Embedder + Send + Sync + 'static,
{
    pub fn new(embedder: E) -> Self {
        Self::from_shared(Arc::new(embedder))
    }

    pub fn from_shared(embedder: Arc<E>) -> Self {
        Self { embedder }
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    /// Change records for `new_text` against `old_text`, in new-document order.
    pub async fn detect_changes(
        &self,
        old_text: &str,
        new_text: &str,
        options: &DiffOptions,
    ) -> Result<Vec<ChangeRecord>, DiffError> {
        let comparison = self.compare("old", old_text, "new", new_text, options).await?;
        Ok(comparison.changes)
    }

    pub async fn compare_documents(
        &self,
        old: &Document,
        new: &Document,
        options: &DiffOptions,
    ) -> Result<ComparisonReport, DiffError> {
        let comparison = self
            .compare(
                &old.document_id,
                &old.text(),
                &new.document_id,
                &new.text(),
                options,
            )
            .await?;

        Ok(ComparisonReport {
            old_document_id: old.document_id.clone(),
            new_document_id: new.document_id.clone(),
            old_chunk_count: comparison.old_chunk_count,
            new_chunk_count: comparison.new_chunk_count,
            similarity_threshold: options.similarity_threshold,
            changes: comparison.changes,
            compared_at: Utc::now(),
        })
    }

    async fn compare(
        &self,
        old_id: &str,
        old_text: &str,
        new_id: &str,
        new_text: &str,
        options: &DiffOptions,
    ) -> Result<Comparison, DiffError> {
        options.validate()?;

        let old_chunks = split_into_chunks(old_id, old_text, options.min_chunk_chars);
        let mut new_chunks = split_into_chunks(new_id, new_text, options.min_chunk_chars);
        debug!(
            old_chunks = old_chunks.len(),
            new_chunks = new_chunks.len(),
            min_chunk_chars = options.min_chunk_chars,
            "documents chunked"
        );

        let mut comparison = Comparison {
            old_chunk_count: old_chunks.len(),
            new_chunk_count: new_chunks.len(),
            changes: Vec::new(),
        };

        if new_chunks.is_empty() {
            return Ok(comparison);
        }

        if old_chunks.is_empty() {
            comparison.changes = new_chunks
                .into_iter()
                .map(|chunk| change_record(chunk, BestMatch::NONE))
                .collect();
            return Ok(comparison);
        }

        let timeout = options.embed_timeout();
        let (old_vectors, new_vectors) = tokio::try_join!(
            self.embed_chunks(&old_chunks, timeout),
            self.embed_chunks(&new_chunks, timeout)
        )?;

        let index = SimilarityIndex::build(old_vectors)?;

        for (chunk, vector) in new_chunks.iter_mut().zip(new_vectors) {
            chunk.attach_embedding(vector);
        }

        let threshold = options.similarity_threshold;
        for chunk in new_chunks {
            let best = match &chunk.embedding {
                Some(embedding) => index.best_match(embedding)?,
                None => BestMatch::NONE,
            };
            if best.score < threshold {
                comparison.changes.push(change_record(chunk, best));
            }
        }

        debug!(
            changes = comparison.changes.len(),
            threshold, "comparison finished"
        );

        Ok(comparison)
    }

    /// One embedder call for the whole chunk list, run on the blocking pool.
    async fn embed_chunks(
        &self,
        chunks: &[Chunk],
        limit: Duration,
    ) -> Result<Vec<Vec<f32>>, DiffError> {
        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let expected = texts.len();
        let embedder = Arc::clone(&self.embedder);

        debug!(batch = expected, "embedding batch");
        let task = tokio::task::spawn_blocking(move || embedder.embed_batch(&texts));

        let vectors = match tokio::time::timeout(limit, task).await {
            Ok(Ok(result)) => result?,
            Ok(Err(join_error)) => {
                return Err(DiffError::ModelUnavailable(format!(
                    "embedding worker failed: {join_error}"
                )))
            }
            Err(_) => {
                return Err(DiffError::ModelUnavailable(format!(
                    "embedding did not finish within {}s",
                    limit.as_secs()
                )))
            }
        };

        if vectors.len() != expected {
            return Err(DiffError::EmbeddingShape {
                expected: format!("{expected} vectors"),
                actual: format!("{} vectors", vectors.len()),
            });
        }

        Ok(vectors)
    }
}

fn change_record(chunk: Chunk, best: BestMatch) -> ChangeRecord {
    ChangeRecord {
        position: chunk.position,
        text: chunk.text,
        similarity: best.score,
        nearest_old_position: best.position,
    }
}
