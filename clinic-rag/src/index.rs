//! Flat (brute-force) vector index with exact Euclidean search.
//!
//! The index holds one vector per chunk, addressed by the chunk's ordinal.
//! Search scans every vector, so results are exact; the collections it is
//! built for are a single user's uploaded documents.

use crate::error::{RagError, Result};
use crate::similarity::squared_euclidean;

/// A search hit: the ordinal of a stored vector and its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Ordinal of the vector in insertion order.
    pub position: usize,
    /// Euclidean distance to the query.
    pub distance: f32,
}

/// An exact nearest-neighbour index over fixed-dimension vectors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatIndex {
    dimensions: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    /// Build an index over `vectors`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexError`] if the vectors do not all share one
    /// non-zero dimension.
    pub fn build(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let dimensions = vectors.first().map(Vec::len).unwrap_or(0);
        if !vectors.is_empty() && dimensions == 0 {
            return Err(RagError::IndexError("vectors must not be empty".to_string()));
        }
        if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dimensions) {
            return Err(RagError::IndexError(format!(
                "vector {i} has {} dimensions, expected {dimensions}",
                v.len()
            )));
        }
        Ok(Self { dimensions, vectors })
    }

    /// Dimensionality of the stored vectors (0 for an empty index).
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// The vector stored at `position`.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        self.vectors.get(position).map(Vec::as_slice)
    }

    /// All stored vectors in insertion order.
    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    /// Return the `k` nearest vectors to `query` by ascending Euclidean
    /// distance. The result has `min(k, len)` entries; equal distances keep
    /// insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexError`] if the query dimension does not match.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions {
            return Err(RagError::IndexError(format!(
                "query has {} dimensions, index has {}",
                query.len(),
                self.dimensions
            )));
        }

        let mut scored: Vec<Neighbor> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, v)| Neighbor {
                position,
                distance: squared_euclidean(v, query).sqrt(),
            })
            .collect();

        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_returns_nearest_first() {
        let index = FlatIndex::build(vec![vec![0.0, 0.0], vec![5.0, 5.0], vec![1.0, 0.0]]).unwrap();
        let hits = index.search(&[0.9, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].position, 2);
        assert_eq!(hits[1].position, 0);
        assert!((hits[0].distance - 0.1).abs() < 1e-6);
    }

    #[test]
    fn k_larger_than_index_is_bounded() {
        let index = FlatIndex::build(vec![vec![1.0], vec![2.0]]).unwrap();
        assert_eq!(index.search(&[0.0], 10).unwrap().len(), 2);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let index = FlatIndex::build(vec![vec![1.0, 0.0], vec![-1.0, 0.0]]).unwrap();
        let hits = index.search(&[0.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].position, 0);
        assert_eq!(hits[1].position, 1);
    }

    #[test]
    fn mixed_dimensions_are_rejected() {
        let err = FlatIndex::build(vec![vec![1.0, 2.0], vec![1.0]]).unwrap_err();
        assert!(matches!(err, RagError::IndexError(_)));
    }

    #[test]
    fn query_dimension_mismatch_is_an_error() {
        let index = FlatIndex::build(vec![vec![1.0, 2.0]]).unwrap();
        assert!(index.search(&[1.0], 1).is_err());
    }
}
