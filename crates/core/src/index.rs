//! Exact nearest-neighbour lookup under cosine similarity.
//!
//! The index is a read-only snapshot of one document's chunk embeddings. It is
//! built once per comparison and never mutated afterwards, so it can be queried
//! from several threads at once.

use crate::error::DiffError;

/// Score reported when the index has nothing to compare against.
pub const NO_MATCH_SCORE: f64 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestMatch {
    pub score: f64,
    /// Ordinal of the closest indexed vector; `None` for an empty index.
    pub position: Option<usize>,
}

impl BestMatch {
    pub const NONE: BestMatch = BestMatch {
        score: NO_MATCH_SCORE,
        position: None,
    };
}

#[derive(Debug, Clone)]
struct IndexedVector {
    values: Vec<f32>,
    norm: f64,
}

#[derive(Debug, Clone, Default)]
pub struct SimilarityIndex {
    dimensions: usize,
    entries: Vec<IndexedVector>,
}

impl SimilarityIndex {
    /// Snapshots `embeddings`; all vectors must share one dimensionality.
    pub fn build(embeddings: Vec<Vec<f32>>) -> Result<Self, DiffError> {
        let dimensions = embeddings.first().map(Vec::len).unwrap_or_default();

        let entries = embeddings
            .into_iter()
            .map(|values| {
                if values.len() != dimensions {
                    return Err(DiffError::EmbeddingShape {
                        expected: format!("{dimensions} dimensions"),
                        actual: format!("{} dimensions", values.len()),
                    });
                }
                ensure_finite(&values)?;
                let norm = l2_norm(&values);
                Ok(IndexedVector { values, norm })
            })
            .collect::<Result<Vec<_>, DiffError>>()?;

        Ok(Self {
            dimensions,
            entries,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest cosine similarity between `candidate` and any indexed vector.
    ///
    /// Ties resolve to the earliest indexed vector.
    pub fn best_match(&self, candidate: &[f32]) -> Result<BestMatch, DiffError> {
        ensure_finite(candidate)?;

        if self.entries.is_empty() {
            return Ok(BestMatch::NONE);
        }

        if candidate.len() != self.dimensions {
            return Err(DiffError::EmbeddingShape {
                expected: format!("{} dimensions", self.dimensions),
                actual: format!("{} dimensions", candidate.len()),
            });
        }

        let candidate_norm = l2_norm(candidate);
        let mut best = BestMatch::NONE;

        for (position, entry) in self.entries.iter().enumerate() {
            let score = cosine_with_norms(candidate, candidate_norm, &entry.values, entry.norm);
            if best.position.is_none() || score > best.score {
                best = BestMatch {
                    score,
                    position: Some(position),
                };
            }
        }

        Ok(best)
    }
}

/// Rejects NaN and infinite components.
fn ensure_finite(values: &[f32]) -> Result<(), DiffError> {
    match values.iter().position(|value| !value.is_finite()) {
        Some(component) => Err(DiffError::EmbeddingShape {
            expected: "finite vector components".to_string(),
            actual: format!("{} at component {component}", values[component]),
        }),
        None => Ok(()),
    }
}

/// Cosine similarity in `[-1, 1]`. A zero vector is orthogonal to everything.
pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f64 {
    cosine_with_norms(left, l2_norm(left), right, l2_norm(right))
}

fn cosine_with_norms(left: &[f32], left_norm: f64, right: &[f32], right_norm: f64) -> f64 {
    let denominator = left_norm * right_norm;
    if denominator <= f64::EPSILON {
        return 0.0;
    }

    let dot: f64 = left
        .iter()
        .zip(right.iter())
        .map(|(&a, &b)| f64::from(a) * f64::from(b))
        .sum();

    (dot / denominator).clamp(-1.0, 1.0)
}

fn l2_norm(values: &[f32]) -> f64 {
    values
        .iter()
        .map(|&value| f64::from(value) * f64::from(value))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_index_returns_no_match() {
        let index = SimilarityIndex::build(Vec::new()).unwrap();
        assert!(index.is_empty());

        let best = index.best_match(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(best, BestMatch::NONE);
        assert_eq!(best.score, NO_MATCH_SCORE);
    }

    #[test]
    fn best_match_is_the_maximum_cosine() {
        let index = SimilarityIndex::build(vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 1.0],
        ])
        .unwrap();

        let best = index.best_match(&[2.0, 1.9]).unwrap();
        assert_eq!(best.position, Some(2));
        assert!(best.score > 0.99);
    }

    #[test]
    fn magnitude_does_not_matter() {
        let index = SimilarityIndex::build(vec![vec![0.5, 0.5, 0.0]]).unwrap();
        let best = index.best_match(&[40.0, 40.0, 0.0]).unwrap();
        assert!((best.score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn opposite_vectors_score_minus_one() {
        let index = SimilarityIndex::build(vec![vec![1.0, 0.0]]).unwrap();
        let best = index.best_match(&[-3.0, 0.0]).unwrap();
        assert!((best.score + 1.0).abs() < 1e-9);
        assert_eq!(best.position, Some(0));
    }

    #[test]
    fn ties_resolve_to_first_entry() {
        let index = SimilarityIndex::build(vec![vec![1.0, 0.0], vec![2.0, 0.0]]).unwrap();
        let best = index.best_match(&[1.0, 0.0]).unwrap();
        assert_eq!(best.position, Some(0));
    }

    #[test]
    fn mixed_dimensions_are_rejected() {
        let result = SimilarityIndex::build(vec![vec![1.0, 0.0], vec![1.0]]);
        assert!(matches!(result, Err(DiffError::EmbeddingShape { .. })));
    }

    #[test]
    fn query_with_wrong_dimensions_is_rejected() {
        let index = SimilarityIndex::build(vec![vec![1.0, 0.0]]).unwrap();
        assert!(matches!(
            index.best_match(&[1.0, 0.0, 0.0]),
            Err(DiffError::EmbeddingShape { .. })
        ));
    }

    #[test]
    fn non_finite_vectors_are_rejected_at_build() {
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let result = SimilarityIndex::build(vec![vec![1.0, 0.0], vec![bad, 1.0]]);
            assert!(matches!(result, Err(DiffError::EmbeddingShape { .. })));
        }
    }

    #[test]
    fn non_finite_candidates_are_rejected() {
        let index = SimilarityIndex::build(vec![vec![1.0, 0.0]]).unwrap();
        assert!(matches!(
            index.best_match(&[f32::NAN, 1.0]),
            Err(DiffError::EmbeddingShape { .. })
        ));

        let empty = SimilarityIndex::build(Vec::new()).unwrap();
        assert!(matches!(
            empty.best_match(&[f32::INFINITY, 1.0]),
            Err(DiffError::EmbeddingShape { .. })
        ));
    }

    #[test]
    fn zero_vectors_are_orthogonal() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
