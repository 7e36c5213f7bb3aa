use crate::error::DiffError;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

const DEFAULT: usize = 128;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;

/// Maps texts to fixed-length vectors.
///
/// Implementations must return one vector per input, in input order, all of
/// `dimensions()` length, and identical vectors for identical text.
pub trait Embedder {
    fn dimensions(&self) -> usize;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DiffError>;

    fn embed(&self, text: &str) -> Result<Vec<f32>, DiffError> {
        self.embed_batch(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| DiffError::EmbeddingShape {
                expected: "1 vector".to_string(),
                actual: "0 vectors".to_string(),
            })
    }
}

/// Hashed character-trigram vectors. Deterministic and offline; closeness
/// tracks shared spelling rather than meaning.
#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let chars: Vec<char> = text.to_lowercase().chars().collect();

        if chars.is_empty() {
            return vector;
        }

        // texts shorter than a trigram still get a non-zero vector
        let grams: Vec<&[char]> = if chars.len() < 3 {
            vec![chars.as_slice()]
        } else {
            chars.windows(3).collect()
        };

        for gram in grams {
            let bucket = (fnv1a(gram) % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

fn fnv1a(gram: &[char]) -> u64 {
    let mut hash = 1469598103934665603u64;
    for byte in gram.iter().collect::<String>().bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(1099511628211);
    }
    hash
}

impl Embedder for CharacterNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions.max(1)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DiffError> {
        Ok(texts.iter().map(|text| self.vector_for(text)).collect())
    }
}

#[derive(Debug, Clone)]
pub struct EmbeddingEndpointConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub request_timeout: Duration,
}

pub const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

/// Client for an OpenAI-compatible `POST /embeddings` service.
///
/// Uses the blocking reqwest client; call it from a blocking context.
pub struct HttpEmbedder {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
    model: String,
    dimensions: usize,
}

impl HttpEmbedder {
    /// Builds the client and probes the service once to learn the vector size.
    /// Any failure here means the model cannot be used for this process.
    pub fn connect(config: EmbeddingEndpointConfig) -> Result<Self, DiffError> {
        let endpoint = Url::parse(&config.endpoint)?;
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|error| DiffError::ModelUnavailable(error.to_string()))?;

        let mut embedder = Self {
            client,
            endpoint,
            api_key: config.api_key,
            model: config.model,
            dimensions: 0,
        };

        let probe = embedder.request(&["dimension probe".to_string()])?;
        embedder.dimensions = probe
            .first()
            .map(Vec::len)
            .filter(|length| *length > 0)
            .ok_or_else(|| {
                DiffError::ModelUnavailable(format!(
                    "{} returned no vector for the probe request",
                    embedder.endpoint
                ))
            })?;

        debug!(
            endpoint = %embedder.endpoint,
            model = %embedder.model,
            dimensions = embedder.dimensions,
            "embedding endpoint ready"
        );

        Ok(embedder)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DiffError> {
        let payload = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header("content-type", "application/json")
            .json(&payload);

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send()?;

        if !response.status().is_success() {
            return Err(DiffError::ModelUnavailable(format!(
                "embedding request to {} returned {}",
                self.endpoint,
                response.status()
            )));
        }

        let payload: EmbeddingResponse = response.json()?;
        vectors_from_response(payload, texts.len())
    }
}

impl Embedder for HttpEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DiffError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts)
    }
}

/// Orders response items by their `index` field when every item has one.
fn vectors_from_response(
    payload: EmbeddingResponse,
    expected: usize,
) -> Result<Vec<Vec<f32>>, DiffError> {
    let mut items = payload.data;

    if items.len() != expected {
        return Err(DiffError::EmbeddingShape {
            expected: format!("{expected} vectors"),
            actual: format!("{} vectors", items.len()),
        });
    }

    if items.iter().all(|item| item.index.is_some()) {
        items.sort_by_key(|item| item.index);
    }

    Ok(items.into_iter().map(|item| item.embedding).collect())
}
