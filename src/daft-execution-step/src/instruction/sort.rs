//! The pieces of the sample-based distributed sort.
//!
//! Each input partition is [`Sample`]d, the samples are reduced to `q - 1` boundaries with
//! [`ReduceToQuantiles`], every input partition is split by those boundaries with
//! [`FanoutRange`], and the `i`-th outputs of all fanouts are combined with
//! [`ReduceMergeAndSort`]. Reading the reduced partitions in order yields the sorted data.

use std::sync::Arc;

use common_daft_config::DaftExecutionConfig;
use common_error::DaftResult;
use tracing::instrument;

use super::{at_least_one, pair, shuffle::partition_by_index, single};
use crate::partition::{Partition, PartitionExpr};

fn merge_all<P: Partition>(inputs: &[Arc<P>]) -> DaftResult<P> {
    let parts = inputs.iter().map(|p| p.as_ref()).collect::<Vec<&P>>();
    P::merge_partitions(&parts, false)
}

/// Draws up to `num_samples` rows and keeps only the evaluated sort columns, minus nulls.
#[derive(Debug)]
pub struct Sample<P: Partition> {
    sort_by: Vec<P::Expr>,
    num_samples: usize,
}

impl<P: Partition> Sample<P> {
    pub fn new(sort_by: Vec<P::Expr>, num_samples: usize) -> Self {
        Self {
            sort_by,
            num_samples,
        }
    }

    pub fn from_config(sort_by: Vec<P::Expr>, config: &DaftExecutionConfig) -> Self {
        Self::new(sort_by, config.sample_size_for_sort)
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    #[instrument(skip_all, name = "Sample::run", fields(num_samples = self.num_samples))]
    pub fn run(&self, inputs: &[Arc<P>]) -> DaftResult<Vec<Arc<P>>> {
        let input = single("Sample", inputs)?;
        let sampled = input
            .sample(self.num_samples)?
            .eval_expression_list(&self.sort_by)?;
        // Nulls would otherwise become boundaries and skew the ranges.
        let not_null = self
            .sort_by
            .iter()
            .map(|e| e.to_column_expr().not_null())
            .collect::<Vec<_>>();
        Ok(vec![Arc::new(sampled.filter(&not_null)?)])
    }
}

/// Merges sampled partitions and picks `num_quantiles - 1` boundaries from them.
#[derive(Debug)]
pub struct ReduceToQuantiles<P: Partition> {
    num_quantiles: usize,
    sort_by: Vec<P::Expr>,
    descending: Vec<bool>,
}

impl<P: Partition> ReduceToQuantiles<P> {
    pub fn new(num_quantiles: usize, sort_by: Vec<P::Expr>, descending: Vec<bool>) -> Self {
        Self {
            num_quantiles,
            sort_by,
            descending,
        }
    }

    pub fn num_quantiles(&self) -> usize {
        self.num_quantiles
    }

    #[instrument(skip_all, name = "ReduceToQuantiles::run", fields(num_quantiles = self.num_quantiles))]
    pub fn run(&self, inputs: &[Arc<P>]) -> DaftResult<Vec<Arc<P>>> {
        at_least_one("ReduceToQuantiles", inputs)?;
        let merged = merge_all(inputs)?;
        // Samples hold the already evaluated sort columns.
        let sort_by = self
            .sort_by
            .iter()
            .map(PartitionExpr::to_column_expr)
            .collect::<Vec<_>>();
        let sorted = merged.sort(&sort_by, &self.descending)?;
        Ok(vec![Arc::new(sorted.quantiles(self.num_quantiles)?)])
    }
}

/// Splits a partition into `num_outputs` ranges given a boundaries partition.
///
/// Takes two inputs: the boundaries produced by [`ReduceToQuantiles`], then the data.
#[derive(Debug)]
pub struct FanoutRange<P: Partition> {
    num_outputs: usize,
    sort_by: Vec<P::Expr>,
    descending: Vec<bool>,
}

impl<P: Partition> FanoutRange<P> {
    pub fn new(num_outputs: usize, sort_by: Vec<P::Expr>, descending: Vec<bool>) -> Self {
        Self {
            num_outputs,
            sort_by,
            descending,
        }
    }

    pub fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    #[instrument(skip_all, name = "FanoutRange::run", fields(num_outputs = self.num_outputs))]
    pub fn run(&self, inputs: &[Arc<P>]) -> DaftResult<Vec<Arc<P>>> {
        let (boundaries, input) = pair("FanoutRange", inputs)?;
        let targets = input.search_sorted(&self.sort_by, boundaries, &self.descending)?;
        if self.num_outputs == 1 {
            return Ok(vec![input.clone()]);
        }
        partition_by_index(input.as_ref(), &targets, self.num_outputs)
    }
}

/// Merges the partitions of one range and sorts the result.
#[derive(Debug)]
pub struct ReduceMergeAndSort<P: Partition> {
    sort_by: Vec<P::Expr>,
    descending: Vec<bool>,
}

impl<P: Partition> ReduceMergeAndSort<P> {
    pub fn new(sort_by: Vec<P::Expr>, descending: Vec<bool>) -> Self {
        Self {
            sort_by,
            descending,
        }
    }

    #[instrument(skip_all, name = "ReduceMergeAndSort::run")]
    pub fn run(&self, inputs: &[Arc<P>]) -> DaftResult<Vec<Arc<P>>> {
        at_least_one("ReduceMergeAndSort", inputs)?;
        let merged = merge_all(inputs)?;
        Ok(vec![Arc::new(merged.sort(&self.sort_by, &self.descending)?)])
    }
}
