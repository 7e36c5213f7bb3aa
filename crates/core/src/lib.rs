pub mod chunking;
pub mod detector;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod index;
pub mod models;

pub use chunking::{normalize_whitespace, paragraph_spans, split_into_chunks};
pub use detector::ChangeDetector;
pub use embeddings::{
    CharacterNgramEmbedder, Embedder, EmbeddingEndpointConfig, HttpEmbedder,
    DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL,
};
pub use error::{DiffError, ExtractError};
pub use extractor::{load_document, load_document_with, LopdfExtractor, PageText, PdfExtractor};
pub use index::{cosine_similarity, BestMatch, SimilarityIndex, NO_MATCH_SCORE};
pub use models::{ChangeRecord, Chunk, ComparisonReport, DiffOptions, Document, PAGE_SEPARATOR};
