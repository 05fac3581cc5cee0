//! Dataset contract and in-memory implementations.
//!
//! The simulator never downloads data; anything exposing an ordered,
//! indexable sequence of (features, integer label) pairs can feed it.

use rand::Rng;

use crate::core::{Error, Result};

/// An ordered, indexable collection of labeled samples.
///
/// Immutable during training; owned by the caller.
pub trait Dataset {
    /// Number of samples.
    fn len(&self) -> usize;

    /// Whether the dataset holds no samples.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Feature dimensionality of every sample.
    fn feature_dim(&self) -> usize;

    /// Feature vector of the sample at `index`.
    fn features(&self, index: usize) -> &[f32];

    /// Integer class label of the sample at `index`.
    fn label(&self, index: usize) -> usize;
}

/// A dataset held fully in memory as a flat feature buffer.
#[derive(Clone, Debug)]
pub struct InMemoryDataset {
    features: Vec<f32>,
    labels: Vec<usize>,
    feature_dim: usize,
}

impl InMemoryDataset {
    /// Create from per-sample feature rows and labels.
    pub fn new(rows: Vec<Vec<f32>>, labels: Vec<usize>) -> Result<Self> {
        if rows.len() != labels.len() {
            return Err(Error::LengthMismatch {
                features: rows.len(),
                labels: labels.len(),
            });
        }
        let feature_dim = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut features = Vec::with_capacity(rows.len() * feature_dim);
        for row in rows {
            features.extend_from_slice(&row);
        }
        Ok(Self {
            features,
            labels,
            feature_dim,
        })
    }

    /// Generate a synthetic clustered dataset.
    ///
    /// Samples of class `c` center on the `c`-th feature axis with small
    /// uniform noise, so classes are linearly separable. Labels cycle
    /// through `0..num_classes` in order.
    pub fn synthetic<R: Rng>(
        samples: usize,
        feature_dim: usize,
        num_classes: usize,
        rng: &mut R,
    ) -> Self {
        let mut features = Vec::with_capacity(samples * feature_dim);
        let mut labels = Vec::with_capacity(samples);
        for i in 0..samples {
            let label = i % num_classes;
            let center = label % feature_dim;
            for j in 0..feature_dim {
                let noise = rng.gen::<f32>() * 0.2 - 0.1;
                let base = if j == center { 1.0 } else { 0.0 };
                features.push(base + noise);
            }
            labels.push(label);
        }
        Self {
            features,
            labels,
            feature_dim,
        }
    }
}

impl Dataset for InMemoryDataset {
    fn len(&self) -> usize {
        self.labels.len()
    }

    fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    fn features(&self, index: usize) -> &[f32] {
        let start = index * self.feature_dim;
        &self.features[start..start + self.feature_dim]
    }

    fn label(&self, index: usize) -> usize {
        self.labels[index]
    }
}

/// A read-only view of a dataset restricted to an arbitrary index set.
///
/// Local position `i` maps to `indices[i]` in the underlying dataset.
#[derive(Debug)]
pub struct DatasetView<'a, D: Dataset + ?Sized> {
    base: &'a D,
    indices: Vec<usize>,
}

impl<'a, D: Dataset + ?Sized> DatasetView<'a, D> {
    /// Create a view over the given indices, validating bounds.
    pub fn new(base: &'a D, indices: Vec<usize>) -> Result<Self> {
        let dataset_size = base.len();
        for &index in &indices {
            if index >= dataset_size {
                return Err(Error::IndexOutOfRange {
                    index,
                    dataset_size,
                });
            }
        }
        Ok(Self { base, indices })
    }

    /// The underlying dataset index of local position `i`.
    pub fn global_index(&self, i: usize) -> usize {
        self.indices[i]
    }
}

impl<'a, D: Dataset + ?Sized> Dataset for DatasetView<'a, D> {
    fn len(&self) -> usize {
        self.indices.len()
    }

    fn feature_dim(&self) -> usize {
        self.base.feature_dim()
    }

    fn features(&self, index: usize) -> &[f32] {
        self.base.features(self.indices[index])
    }

    fn label(&self, index: usize) -> usize {
        self.base.label(self.indices[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_in_memory_dataset() {
        let dataset = InMemoryDataset::new(
            vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]],
            vec![0, 1, 0],
        )
        .unwrap();

        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.feature_dim(), 2);
        assert_eq!(dataset.features(1), &[3.0, 4.0]);
        assert_eq!(dataset.label(2), 0);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let result = InMemoryDataset::new(vec![vec![1.0]], vec![0, 1]);
        assert!(matches!(result, Err(Error::LengthMismatch { .. })));
    }

    #[test]
    fn test_synthetic_labels_cycle() {
        let mut rng = StdRng::seed_from_u64(1);
        let dataset = InMemoryDataset::synthetic(20, 4, 5, &mut rng);
        assert_eq!(dataset.len(), 20);
        for i in 0..20 {
            assert_eq!(dataset.label(i), i % 5);
            assert!(dataset.label(i) < 5);
        }
    }

    #[test]
    fn test_synthetic_clusters_separable() {
        let mut rng = StdRng::seed_from_u64(2);
        let dataset = InMemoryDataset::synthetic(10, 10, 10, &mut rng);
        // The center axis dominates every other coordinate.
        for i in 0..10 {
            let features = dataset.features(i);
            let center = dataset.label(i);
            for (j, &value) in features.iter().enumerate() {
                if j != center {
                    assert!(value < features[center]);
                }
            }
        }
    }

    #[test]
    fn test_view_maps_indices() {
        let dataset = InMemoryDataset::new(
            vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0]],
            vec![0, 1, 2, 3],
        )
        .unwrap();
        let view = DatasetView::new(&dataset, vec![3, 1]).unwrap();

        assert_eq!(view.len(), 2);
        assert_eq!(view.features(0), &[3.0]);
        assert_eq!(view.label(1), 1);
        assert_eq!(view.global_index(0), 3);
    }

    #[test]
    fn test_view_rejects_out_of_range() {
        let dataset = InMemoryDataset::new(vec![vec![0.0]], vec![0]).unwrap();
        let result = DatasetView::new(&dataset, vec![0, 5]);
        assert!(matches!(
            result,
            Err(Error::IndexOutOfRange {
                index: 5,
                dataset_size: 1
            })
        ));
    }
}
