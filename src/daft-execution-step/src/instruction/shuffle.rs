use std::sync::Arc;

use common_daft_config::DaftExecutionConfig;
use common_error::{DaftError, DaftResult};
use rand::{
    distributions::{Distribution, Uniform},
    rngs::StdRng,
    SeedableRng,
};
use tracing::instrument;

use super::{at_least_one, single};
use crate::partition::Partition;

/// Splits `input` into `num_partitions` partitions, sending row `i` to `targets[i]`.
///
/// Always yields exactly `num_partitions` outputs, some possibly empty. Rows keep their
/// relative order within each output.
pub(crate) fn partition_by_index<P: Partition>(
    input: &P,
    targets: &[u64],
    num_partitions: usize,
) -> DaftResult<Vec<Arc<P>>> {
    if num_partitions == 0 {
        return Err(DaftError::ValueError(
            "Can not partition into 0 partitions".to_string(),
        ));
    }
    if targets.len() != input.len() {
        return Err(DaftError::ValueError(format!(
            "Partition targets must match partition length: {} vs {}",
            targets.len(),
            input.len()
        )));
    }
    let mut buckets = vec![Vec::with_capacity(input.len() / num_partitions); num_partitions];
    for (row, &target) in targets.iter().enumerate() {
        let bucket = buckets.get_mut(target as usize).ok_or_else(|| {
            DaftError::ComputeError(format!(
                "Row {row} has partition target {target}, out of range for {num_partitions} partitions"
            ))
        })?;
        bucket.push(row as u64);
    }
    buckets
        .iter()
        .map(|indices| Ok(Arc::new(input.take(indices)?)))
        .collect()
}

/// Concatenates any number of partitions, in input order, into one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReduceMerge;

impl ReduceMerge {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip_all, name = "ReduceMerge::run")]
    pub fn run<P: Partition>(&self, inputs: &[Arc<P>]) -> DaftResult<Vec<Arc<P>>> {
        at_least_one("ReduceMerge", inputs)?;
        let parts = inputs.iter().map(|p| p.as_ref()).collect::<Vec<&P>>();
        Ok(vec![Arc::new(P::merge_partitions(&parts, false)?)])
    }
}

/// Assigns every row to a uniformly random output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanoutRandom {
    num_outputs: usize,
    seed: Option<u64>,
}

impl FanoutRandom {
    pub fn new(num_outputs: usize) -> Self {
        Self {
            num_outputs,
            seed: None,
        }
    }

    pub fn from_config(num_outputs: usize, config: &DaftExecutionConfig) -> Self {
        Self {
            num_outputs,
            seed: config.fanout_random_seed,
        }
    }

    /// Fixes the row assignment so reruns of the same task produce the same split.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    #[instrument(skip_all, name = "FanoutRandom::run", fields(num_outputs = self.num_outputs))]
    pub fn run<P: Partition>(&self, inputs: &[Arc<P>]) -> DaftResult<Vec<Arc<P>>> {
        let input = single("FanoutRandom", inputs)?;
        if self.num_outputs == 1 {
            return Ok(vec![input.clone()]);
        }
        if self.num_outputs == 0 {
            return Err(DaftError::ValueError(
                "Can not partition into 0 partitions".to_string(),
            ));
        }
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let range = Uniform::from(0..self.num_outputs as u64);
        let targets = (0..input.len())
            .map(|_| range.sample(&mut rng))
            .collect::<Vec<_>>();
        partition_by_index(input.as_ref(), &targets, self.num_outputs)
    }
}

/// Assigns every row to `hash(partition_by) % num_outputs`.
#[derive(Debug)]
pub struct FanoutHash<P: Partition> {
    num_outputs: usize,
    partition_by: Vec<P::Expr>,
}

impl<P: Partition> FanoutHash<P> {
    pub fn new(num_outputs: usize, partition_by: Vec<P::Expr>) -> Self {
        Self {
            num_outputs,
            partition_by,
        }
    }

    pub fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    pub fn partition_by(&self) -> &[P::Expr] {
        &self.partition_by
    }

    #[instrument(skip_all, name = "FanoutHash::run", fields(num_outputs = self.num_outputs))]
    pub fn run(&self, inputs: &[Arc<P>]) -> DaftResult<Vec<Arc<P>>> {
        let input = single("FanoutHash", inputs)?;
        if self.num_outputs == 0 {
            return Err(DaftError::ValueError(
                "Can not partition into 0 partitions".to_string(),
            ));
        }
        // Hash even for a single output so bad partition-by expressions still surface.
        let hashes = input.hash_rows(&self.partition_by)?;
        if self.num_outputs == 1 {
            return Ok(vec![input.clone()]);
        }
        let num_outputs = self.num_outputs as u64;
        let targets = hashes
            .into_iter()
            .map(|hash| hash % num_outputs)
            .collect::<Vec<_>>();
        partition_by_index(input.as_ref(), &targets, self.num_outputs)
    }
}
