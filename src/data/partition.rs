//! Splitting a dataset across simulated clients.
//!
//! IID mode hands every client a uniformly random slice of the data;
//! label-skewed mode deals contiguous label-sorted shards so each client
//! sees only one or two classes.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::{ClientId, Error, Result};
use crate::data::dataset::Dataset;

/// Partitioning policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartitionMode {
    /// Uniform random split, matching the population label distribution
    Iid,
    /// Label-sorted shard assignment inducing per-client label skew
    LabelSkewed,
}

impl PartitionMode {
    /// Mode matching a resolved `iid` flag.
    pub fn from_flag(iid: bool) -> Self {
        if iid {
            Self::Iid
        } else {
            Self::LabelSkewed
        }
    }
}

/// Immutable mapping from client id to its private dataset indices.
///
/// Built once per experiment run and read-only thereafter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientPartition {
    assignments: BTreeMap<ClientId, Vec<usize>>,
}

impl ClientPartition {
    /// Build from explicit assignments.
    pub fn from_assignments(assignments: BTreeMap<ClientId, Vec<usize>>) -> Self {
        Self { assignments }
    }

    /// Number of clients.
    pub fn num_clients(&self) -> usize {
        self.assignments.len()
    }

    /// Indices held by a client.
    pub fn indices(&self, client: ClientId) -> Option<&[usize]> {
        self.assignments.get(&client).map(|v| v.as_slice())
    }

    /// Iterate over `(client, indices)` pairs in client order.
    pub fn iter(&self) -> impl Iterator<Item = (ClientId, &[usize])> {
        self.assignments.iter().map(|(&c, v)| (c, v.as_slice()))
    }

    /// Total number of assigned indices across all clients.
    pub fn total_assigned(&self) -> usize {
        self.assignments.values().map(|v| v.len()).sum()
    }
}

/// Splits a dataset index range into per-client subsets.
///
/// Never seeds randomness itself; reproducibility is the caller's
/// responsibility through the shared `Rng`.
#[derive(Clone, Debug)]
pub struct Partitioner {
    /// Shards dealt to each client in label-skewed mode
    shards_per_client: usize,
}

impl Partitioner {
    /// Create a partitioner with the conventional 2 shards per client.
    pub fn new() -> Self {
        Self {
            shards_per_client: 2,
        }
    }

    /// Override the shards-per-client count, floored at one.
    pub fn with_shards_per_client(mut self, shards_per_client: usize) -> Self {
        self.shards_per_client = shards_per_client.max(1);
        self
    }

    /// Partition under the given mode.
    pub fn partition<D: Dataset + ?Sized, R: Rng>(
        &self,
        dataset: &D,
        num_clients: usize,
        mode: PartitionMode,
        rng: &mut R,
    ) -> Result<ClientPartition> {
        match mode {
            PartitionMode::Iid => self.iid(dataset.len(), num_clients, rng),
            PartitionMode::LabelSkewed => self.label_skewed(dataset, num_clients, rng),
        }
    }

    /// Uniform random split into equal-sized disjoint chunks.
    ///
    /// The remainder `dataset_size % num_clients` is dropped from every
    /// partition - an accepted precision loss, not an error.
    pub fn iid<R: Rng>(
        &self,
        dataset_size: usize,
        num_clients: usize,
        rng: &mut R,
    ) -> Result<ClientPartition> {
        if num_clients == 0 {
            return Err(Error::InvalidClientCount(num_clients));
        }
        let chunk = dataset_size / num_clients;
        if chunk == 0 {
            return Err(Error::DatasetTooSmall {
                dataset_size,
                required: num_clients,
            });
        }

        let mut indices: Vec<usize> = (0..dataset_size).collect();
        indices.shuffle(rng);

        let mut assignments = BTreeMap::new();
        for (client, slice) in indices.chunks_exact(chunk).take(num_clients).enumerate() {
            assignments.insert(client, slice.to_vec());
        }
        Ok(ClientPartition::from_assignments(assignments))
    }

    /// Label-sorted shard assignment.
    ///
    /// Indices are sorted by label, cut into `shards_per_client *
    /// num_clients` equal shards, and each client draws its shards from a
    /// shuffled permutation - no shard is assigned twice.
    pub fn label_skewed<D: Dataset + ?Sized, R: Rng>(
        &self,
        dataset: &D,
        num_clients: usize,
        rng: &mut R,
    ) -> Result<ClientPartition> {
        if num_clients == 0 {
            return Err(Error::InvalidClientCount(num_clients));
        }
        let dataset_size = dataset.len();
        let num_shards = self.shards_per_client * num_clients;
        let shard_size = dataset_size / num_shards;
        if shard_size == 0 {
            return Err(Error::DatasetTooSmall {
                dataset_size,
                required: num_shards,
            });
        }

        // Stable sort keeps the original order within each label group.
        let mut sorted: Vec<usize> = (0..dataset_size).collect();
        sorted.sort_by_key(|&i| dataset.label(i));

        let mut shard_ids: Vec<usize> = (0..num_shards).collect();
        shard_ids.shuffle(rng);

        let mut assignments = BTreeMap::new();
        for (client, shards) in shard_ids.chunks(self.shards_per_client).enumerate() {
            let mut indices = Vec::with_capacity(self.shards_per_client * shard_size);
            for &shard in shards {
                let start = shard * shard_size;
                indices.extend_from_slice(&sorted[start..start + shard_size]);
            }
            assignments.insert(client, indices);
        }
        Ok(ClientPartition::from_assignments(assignments))
    }
}

impl Default for Partitioner {
    fn default() -> Self {
        Self::new()
    }
}
