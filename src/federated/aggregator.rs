//! Federated averaging of parameter snapshots.

use crate::core::{Error, Result};
use crate::model::tensor::ParameterSnapshot;

/// Elementwise arithmetic mean of a non-empty sequence of snapshots.
///
/// Every snapshot must carry the identical parameter-name set and shapes;
/// structure is validated up front so a mismatch never yields a partial
/// result. Averaging is unweighted: each client contributes equally
/// regardless of its local dataset size, trading aggregation fairness for
/// simplicity. Means are computed in native `f32`; NaN and infinity
/// propagate so local divergence surfaces downstream.
pub fn average(snapshots: &[ParameterSnapshot]) -> Result<ParameterSnapshot> {
    let first = snapshots.first().ok_or(Error::EmptyAggregation)?;
    for other in &snapshots[1..] {
        first.ensure_same_structure(other)?;
    }

    let mut mean = first.clone();
    for other in &snapshots[1..] {
        mean.accumulate(other);
    }
    mean.scale(1.0 / snapshots.len() as f32);
    Ok(mean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tensor::Tensor;

    fn snapshot(values: &[(&str, Vec<f32>)]) -> ParameterSnapshot {
        let mut snap = ParameterSnapshot::new();
        for (name, data) in values {
            let len = data.len();
            snap.insert(name, Tensor::from_vec(vec![len], data.clone()).unwrap());
        }
        snap
    }

    #[test]
    fn test_singleton_average_is_identity() {
        let single = snapshot(&[("weight", vec![1.5, -2.0, 0.25])]);
        let mean = average(std::slice::from_ref(&single)).unwrap();
        assert!(mean.approx_eq(&single, 1e-6));
    }

    #[test]
    fn test_average_is_elementwise_mean() {
        let a = snapshot(&[("weight", vec![1.0, 2.0]), ("bias", vec![0.0])]);
        let b = snapshot(&[("weight", vec![3.0, 4.0]), ("bias", vec![1.0])]);
        let mean = average(&[a, b]).unwrap();

        let expected = snapshot(&[("weight", vec![2.0, 3.0]), ("bias", vec![0.5])]);
        assert!(mean.approx_eq(&expected, 1e-6));
    }

    #[test]
    fn test_average_is_order_independent() {
        let a = snapshot(&[("weight", vec![1.0, -1.0, 0.5])]);
        let b = snapshot(&[("weight", vec![2.0, 3.0, -0.5])]);

        let ab = average(&[a.clone(), b.clone()]).unwrap();
        let ba = average(&[b, a]).unwrap();
        assert!(ab.approx_eq(&ba, 1e-6));
    }

    #[test]
    fn test_empty_input_rejected() {
        let err = average(&[]).unwrap_err();
        assert!(matches!(err, Error::EmptyAggregation));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_name_mismatch_rejected() {
        let a = snapshot(&[("weight", vec![1.0])]);
        let b = snapshot(&[("kernel", vec![1.0])]);
        let err = average(&[a, b]).unwrap_err();
        assert!(err.is_model_mismatch());
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let a = snapshot(&[("weight", vec![1.0, 2.0])]);
        let b = snapshot(&[("weight", vec![1.0, 2.0, 3.0])]);
        let err = average(&[a, b]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_nan_propagates() {
        let a = snapshot(&[("weight", vec![f32::NAN, 1.0])]);
        let b = snapshot(&[("weight", vec![1.0, 1.0])]);
        let mean = average(&[a, b]).unwrap();
        assert!(mean.get("weight").unwrap().data()[0].is_nan());
        assert!((mean.get("weight").unwrap().data()[1] - 1.0).abs() < 1e-6);
    }
}
