//! Parameter tensors and full-model snapshots.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::{Error, Result};

/// A dense floating-point tensor with an explicit shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    /// Create a zero-filled tensor.
    pub fn zeros(shape: &[usize]) -> Self {
        let len = shape.iter().product();
        Self {
            shape: shape.to_vec(),
            data: vec![0.0; len],
        }
    }

    /// Create from a flat buffer, validating the element count.
    pub fn from_vec(shape: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(Error::TensorShape {
                shape,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Tensor shape.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the tensor holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat element buffer.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Mutable flat element buffer.
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Elementwise accumulate `other` into `self`.
    ///
    /// Caller guarantees matching shapes.
    pub fn add_assign(&mut self, other: &Tensor) {
        debug_assert_eq!(self.shape, other.shape);
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a += b;
        }
    }

    /// Multiply every element by `factor`.
    pub fn scale(&mut self, factor: f32) {
        for value in &mut self.data {
            *value *= factor;
        }
    }

    /// Elementwise comparison within `eps`.
    pub fn approx_eq(&self, other: &Tensor, eps: f32) -> bool {
        self.shape == other.shape
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(a, b)| (a - b).abs() <= eps)
    }
}

/// A full capture of a model's learnable state: parameter name to tensor.
///
/// Snapshots are value types; cloning one is the deep copy every local
/// update must operate on.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ParameterSnapshot {
    params: BTreeMap<String, Tensor>,
}

impl ParameterSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a named tensor, replacing any previous value.
    pub fn insert(&mut self, name: &str, tensor: Tensor) {
        self.params.insert(name.to_string(), tensor);
    }

    /// Look up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.params.get(name)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether the snapshot holds no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Parameter names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(|k| k.as_str())
    }

    /// Iterate over `(name, tensor)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tensor)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Elementwise accumulate `other` into `self` over shared names.
    ///
    /// Caller guarantees matching structure.
    pub fn accumulate(&mut self, other: &ParameterSnapshot) {
        for (name, tensor) in self.params.iter_mut() {
            if let Some(addend) = other.params.get(name) {
                tensor.add_assign(addend);
            }
        }
    }

    /// Multiply every element of every tensor by `factor`.
    pub fn scale(&mut self, factor: f32) {
        for tensor in self.params.values_mut() {
            tensor.scale(factor);
        }
    }

    /// Check that `other` carries exactly this snapshot's parameter names
    /// with identical shapes.
    pub fn ensure_same_structure(&self, other: &ParameterSnapshot) -> Result<()> {
        for (name, tensor) in &self.params {
            match other.params.get(name) {
                None => return Err(Error::MissingParameter(name.clone())),
                Some(candidate) => {
                    if candidate.shape() != tensor.shape() {
                        return Err(Error::ShapeMismatch {
                            name: name.clone(),
                            expected: tensor.shape().to_vec(),
                            actual: candidate.shape().to_vec(),
                        });
                    }
                }
            }
        }
        for name in other.params.keys() {
            if !self.params.contains_key(name) {
                return Err(Error::UnexpectedParameter(name.clone()));
            }
        }
        Ok(())
    }

    /// Elementwise comparison of two snapshots within `eps`.
    pub fn approx_eq(&self, other: &ParameterSnapshot, eps: f32) -> bool {
        self.params.len() == other.params.len()
            && self.params.iter().all(|(name, tensor)| {
                other
                    .params
                    .get(name)
                    .map(|candidate| tensor.approx_eq(candidate, eps))
                    .unwrap_or(false)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_zeros() {
        let tensor = Tensor::zeros(&[2, 3]);
        assert_eq!(tensor.len(), 6);
        assert_eq!(tensor.shape(), &[2, 3]);
        assert!(tensor.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_tensor_from_vec_validates() {
        assert!(Tensor::from_vec(vec![2, 2], vec![1.0; 4]).is_ok());
        let result = Tensor::from_vec(vec![2, 2], vec![1.0; 3]);
        assert!(matches!(result, Err(Error::TensorShape { actual: 3, .. })));
    }

    #[test]
    fn test_tensor_arithmetic() {
        let mut a = Tensor::from_vec(vec![3], vec![1.0, 2.0, 3.0]).unwrap();
        let b = Tensor::from_vec(vec![3], vec![1.0, 1.0, 1.0]).unwrap();
        a.add_assign(&b);
        a.scale(0.5);
        assert!(a.approx_eq(
            &Tensor::from_vec(vec![3], vec![1.0, 1.5, 2.0]).unwrap(),
            1e-6
        ));
    }

    fn snapshot(names: &[(&str, &[usize])]) -> ParameterSnapshot {
        let mut snap = ParameterSnapshot::new();
        for (name, shape) in names {
            snap.insert(name, Tensor::zeros(shape));
        }
        snap
    }

    #[test]
    fn test_structure_check_accepts_identical() {
        let a = snapshot(&[("weight", &[4, 2]), ("bias", &[4])]);
        let b = snapshot(&[("weight", &[4, 2]), ("bias", &[4])]);
        assert!(a.ensure_same_structure(&b).is_ok());
    }

    #[test]
    fn test_structure_check_missing_parameter() {
        let a = snapshot(&[("weight", &[4, 2]), ("bias", &[4])]);
        let b = snapshot(&[("weight", &[4, 2])]);
        assert!(matches!(
            a.ensure_same_structure(&b),
            Err(Error::MissingParameter(name)) if name == "bias"
        ));
    }

    #[test]
    fn test_structure_check_unexpected_parameter() {
        let a = snapshot(&[("weight", &[4, 2])]);
        let b = snapshot(&[("weight", &[4, 2]), ("extra", &[1])]);
        assert!(matches!(
            a.ensure_same_structure(&b),
            Err(Error::UnexpectedParameter(name)) if name == "extra"
        ));
    }

    #[test]
    fn test_structure_check_shape_mismatch() {
        let a = snapshot(&[("weight", &[4, 2])]);
        let b = snapshot(&[("weight", &[2, 4])]);
        assert!(matches!(
            a.ensure_same_structure(&b),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_snapshot_clone_is_independent() {
        let mut a = ParameterSnapshot::new();
        a.insert("weight", Tensor::from_vec(vec![2], vec![1.0, 2.0]).unwrap());
        let mut b = a.clone();
        b.params.get_mut("weight").unwrap().data_mut()[0] = 9.0;
        assert_eq!(a.get("weight").unwrap().data()[0], 1.0);
    }
}
