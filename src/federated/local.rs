//! Local training on one client's private data split.
//!
//! A local update never touches the global model: it receives a snapshot,
//! trains a private copy, and hands the result back to the coordinator.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::RunConfig;
use crate::core::{ClientId, Error, Result};
use crate::data::dataset::{Dataset, DatasetView};
use crate::federated::evaluator::{self, Evaluation};
use crate::model::net::{Mode, Model};
use crate::model::tensor::ParameterSnapshot;

/// Result of one client's local optimization.
#[derive(Clone, Debug)]
pub struct LocalOutcome {
    /// Final parameter state of the private model copy
    pub snapshot: ParameterSnapshot,
    /// Mean loss over all optimization steps
    pub loss: f32,
    /// Optimization steps taken
    pub steps: usize,
}

/// Runs local epochs of minibatch SGD over one client's index subset.
#[derive(Debug)]
pub struct LocalUpdate<'a, D: Dataset + ?Sized> {
    client: ClientId,
    view: DatasetView<'a, D>,
    local_epochs: usize,
    batch_size: usize,
    lr: f32,
    momentum: f32,
}

impl<'a, D: Dataset + ?Sized> LocalUpdate<'a, D> {
    /// Bind a client's index subset to the shared dataset.
    ///
    /// Fails before any model state is involved when the subset is empty.
    pub fn new(
        dataset: &'a D,
        client: ClientId,
        indices: &[usize],
        config: &RunConfig,
    ) -> Result<Self> {
        if indices.is_empty() {
            return Err(Error::EmptyPartition(client));
        }
        let view = DatasetView::new(dataset, indices.to_vec())?;
        Ok(Self {
            client,
            view,
            local_epochs: config.local_epochs,
            batch_size: config.local_batch_size,
            lr: config.lr,
            momentum: config.momentum,
        })
    }

    /// The client this update trains for.
    pub fn client(&self) -> ClientId {
        self.client
    }

    /// Samples visible to this client.
    pub fn sample_count(&self) -> usize {
        self.view.len()
    }

    /// Train a private model copy from `global` and return its final
    /// snapshot plus the mean loss over all steps.
    pub async fn train<R: Rng>(
        &self,
        model: &mut dyn Model,
        global: &ParameterSnapshot,
        rng: &mut R,
    ) -> Result<LocalOutcome> {
        model.load_state_dict(global)?;
        model.set_mode(Mode::Train);

        let mut order: Vec<usize> = (0..self.view.len()).collect();
        let mut loss_sum = 0.0;
        let mut steps = 0;

        for _epoch in 0..self.local_epochs {
            order.shuffle(rng);
            for batch in order.chunks(self.batch_size) {
                model.zero_grad();
                let mut batch_loss = 0.0;
                for &i in batch {
                    batch_loss += model.backward(self.view.features(i), self.view.label(i));
                }
                model.scale_gradients(1.0 / batch.len() as f32);
                model.step(self.lr, self.momentum);

                loss_sum += batch_loss / batch.len() as f32;
                steps += 1;
            }
        }

        tracing::debug!(
            client = self.client,
            steps,
            loss = loss_sum / steps as f32,
            "local update complete"
        );

        Ok(LocalOutcome {
            snapshot: model.state_dict(),
            loss: loss_sum / steps as f32,
            steps,
        })
    }

    /// Forward-only evaluation over this client's held data.
    pub fn evaluate(&self, model: &mut dyn Model) -> Result<Evaluation> {
        evaluator::evaluate(model, &self.view)
    }
}
