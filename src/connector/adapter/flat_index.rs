use std::cmp::Ordering;

use crate::domain::{DistanceMetric, DomainError};

/// Exact nearest-neighbor index over row-major vectors.
///
/// Position `i` in the index is the `i`-th vector added. An empty index is valid
/// and searchable.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    metric: DistanceMetric,
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dimension: usize, metric: DistanceMetric) -> Result<Self, DomainError> {
        if dimension == 0 {
            return Err(DomainError::configuration(
                "embedding dimension must be positive",
            ));
        }
        Ok(Self {
            dimension,
            metric,
            data: Vec::new(),
        })
    }

    /// Rebuilds an index from vectors laid out back to back.
    pub fn from_flat(
        dimension: usize,
        metric: DistanceMetric,
        data: Vec<f32>,
    ) -> Result<Self, DomainError> {
        let mut index = Self::new(dimension, metric)?;
        if data.len() % dimension != 0 {
            return Err(DomainError::corrupted(format!(
                "{} values do not divide into vectors of dimension {}",
                data.len(),
                dimension
            )));
        }
        index.data = data;
        Ok(index)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }

    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    pub fn validate(&self, vector: &[f32]) -> Result<(), DomainError> {
        if vector.len() != self.dimension {
            return Err(DomainError::dimension_mismatch(self.dimension, vector.len()));
        }
        Ok(())
    }

    /// Appends a vector and returns its position.
    pub fn add(&mut self, vector: &[f32]) -> Result<usize, DomainError> {
        self.validate(vector)?;
        let position = self.len();
        self.data.extend_from_slice(vector);
        Ok(position)
    }

    /// Returns up to `k` `(position, score)` pairs, highest score first.
    ///
    /// Equal scores keep insertion order, so earlier vectors win ties.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, DomainError> {
        self.validate(query)?;

        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, vector)| {
                let score = self.metric.score(query, vector);
                let score = if score.is_nan() { f32::NEG_INFINITY } else { score };
                (position, score)
            })
            .collect();

        // sort_by is stable
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        Ok(scored)
    }
}
