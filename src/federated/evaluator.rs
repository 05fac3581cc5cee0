//! Read-only model evaluation.

use serde::{Deserialize, Serialize};

use crate::core::{ClientId, Error, Result};
use crate::data::dataset::{Dataset, DatasetView};
use crate::data::partition::ClientPartition;
use crate::model::net::{Mode, Model};

/// Outcome of one evaluation pass.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Evaluation {
    /// Top-1 correct predictions
    pub correct: usize,
    /// Samples evaluated
    pub total: usize,
    /// `correct / total`
    pub accuracy: f32,
    /// Mean negative-log-likelihood loss
    pub loss: f32,
}

fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Forward-only pass over `dataset`, in evaluation mode.
///
/// No gradient updates occur; the model's learnable state is untouched.
pub fn evaluate<D: Dataset + ?Sized>(model: &mut dyn Model, dataset: &D) -> Result<Evaluation> {
    if dataset.is_empty() {
        return Err(Error::EmptyDataset);
    }
    model.set_mode(Mode::Eval);

    let total = dataset.len();
    let mut correct = 0;
    let mut loss_sum = 0.0;
    for i in 0..total {
        let log_probs = model.forward(dataset.features(i));
        let label = dataset.label(i);
        loss_sum += -log_probs[label];
        if argmax(&log_probs) == label {
            correct += 1;
        }
    }

    Ok(Evaluation {
        correct,
        total,
        accuracy: correct as f32 / total as f32,
        loss: loss_sum / total as f32,
    })
}

/// Evaluate the model on every client's private split.
pub fn evaluate_clients<D: Dataset + ?Sized>(
    model: &mut dyn Model,
    dataset: &D,
    partition: &ClientPartition,
) -> Result<Vec<(ClientId, Evaluation)>> {
    let mut results = Vec::with_capacity(partition.num_clients());
    for (client, indices) in partition.iter() {
        let view = DatasetView::new(dataset, indices.to_vec())?;
        results.push((client, evaluate(model, &view)?));
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::InMemoryDataset;
    use crate::data::partition::Partitioner;
    use crate::model::net::Linear;
    use crate::model::tensor::{ParameterSnapshot, Tensor};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    // A linear model whose weight matrix is a scaled identity classifies
    // the synthetic axis-centered clusters perfectly.
    fn oracle_model(classes: usize) -> Linear {
        let mut rng = StdRng::seed_from_u64(0);
        let mut model = Linear::new(classes, classes, &mut rng);
        let mut weight = vec![0.0; classes * classes];
        for c in 0..classes {
            weight[c * classes + c] = 5.0;
        }
        let mut snapshot = ParameterSnapshot::new();
        snapshot.insert(
            "weight",
            Tensor::from_vec(vec![classes, classes], weight).unwrap(),
        );
        snapshot.insert("bias", Tensor::zeros(&[classes]));
        model.load_state_dict(&snapshot).unwrap();
        model
    }

    #[test]
    fn test_oracle_model_scores_perfectly() {
        let mut rng = StdRng::seed_from_u64(3);
        let dataset = InMemoryDataset::synthetic(40, 4, 4, &mut rng);
        let mut model = oracle_model(4);

        let eval = evaluate(&mut model, &dataset).unwrap();
        assert_eq!(eval.total, 40);
        assert_eq!(eval.correct, 40);
        assert!((eval.accuracy - 1.0).abs() < 1e-6);
        assert!(eval.loss < 0.5);
        assert_eq!(model.mode(), Mode::Eval);
    }

    #[test]
    fn test_empty_dataset_rejected() {
        let dataset = InMemoryDataset::new(vec![], vec![]).unwrap();
        let mut model = oracle_model(2);
        let err = evaluate(&mut model, &dataset).unwrap_err();
        assert!(matches!(err, Error::EmptyDataset));
        assert!(err.is_data());
    }

    #[test]
    fn test_per_client_sweep_covers_all_clients() {
        let mut rng = StdRng::seed_from_u64(4);
        let dataset = InMemoryDataset::synthetic(60, 4, 4, &mut rng);
        let partition = Partitioner::new().iid(60, 6, &mut rng).unwrap();
        let mut model = oracle_model(4);

        let results = evaluate_clients(&mut model, &dataset, &partition).unwrap();
        assert_eq!(results.len(), 6);
        for (_, eval) in &results {
            assert_eq!(eval.total, 10);
            assert!((eval.accuracy - 1.0).abs() < 1e-6);
        }
    }
}
