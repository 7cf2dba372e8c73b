use std::{fmt::Debug, sync::Arc};

use common_error::DaftResult;
use tracing::instrument;

use super::single;
use crate::partition::Partition;

/// An arbitrary partition-to-partition operator supplied by the plan.
pub trait MapPartitionOp<P: Partition>: Debug + Send + Sync {
    fn run(&self, input: &P) -> DaftResult<P>;

    fn name(&self) -> &str;
}

#[derive(Debug)]
pub struct Filter<P: Partition> {
    predicate: Vec<P::Expr>,
}

impl<P: Partition> Filter<P> {
    pub fn new(predicate: Vec<P::Expr>) -> Self {
        Self { predicate }
    }

    pub fn predicate(&self) -> &[P::Expr] {
        &self.predicate
    }

    #[instrument(skip_all, name = "Filter::run")]
    pub fn run(&self, inputs: &[Arc<P>]) -> DaftResult<Vec<Arc<P>>> {
        let input = single("Filter", inputs)?;
        Ok(vec![Arc::new(input.filter(&self.predicate)?)])
    }
}

#[derive(Debug)]
pub struct Project<P: Partition> {
    projection: Vec<P::Expr>,
}

impl<P: Partition> Project<P> {
    pub fn new(projection: Vec<P::Expr>) -> Self {
        Self { projection }
    }

    pub fn projection(&self) -> &[P::Expr] {
        &self.projection
    }

    #[instrument(skip_all, name = "Project::run")]
    pub fn run(&self, inputs: &[Arc<P>]) -> DaftResult<Vec<Arc<P>>> {
        let input = single("Project", inputs)?;
        Ok(vec![Arc::new(input.eval_expression_list(&self.projection)?)])
    }
}

/// Truncates a partition to its first `limit` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalLimit {
    limit: usize,
}

impl LocalLimit {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    #[instrument(skip_all, name = "LocalLimit::run")]
    pub fn run<P: Partition>(&self, inputs: &[Arc<P>]) -> DaftResult<Vec<Arc<P>>> {
        let input = single("LocalLimit", inputs)?;
        if input.len() <= self.limit {
            return Ok(vec![input.clone()]);
        }
        Ok(vec![Arc::new(input.head(self.limit)?)])
    }
}

#[derive(Debug)]
pub struct MapPartition<P: Partition> {
    map_op: Arc<dyn MapPartitionOp<P>>,
}

impl<P: Partition> MapPartition<P> {
    pub fn new(map_op: Arc<dyn MapPartitionOp<P>>) -> Self {
        Self { map_op }
    }

    #[instrument(skip_all, name = "MapPartition::run", fields(op = self.map_op.name()))]
    pub fn run(&self, inputs: &[Arc<P>]) -> DaftResult<Vec<Arc<P>>> {
        let input = single("MapPartition", inputs)?;
        Ok(vec![Arc::new(self.map_op.run(input)?)])
    }
}

/// Aggregations over one partition, optionally grouped.
#[derive(Debug)]
pub struct Aggregate<P: Partition> {
    to_agg: Vec<P::Expr>,
    group_by: Option<Vec<P::Expr>>,
}

impl<P: Partition> Aggregate<P> {
    pub fn new(to_agg: Vec<P::Expr>, group_by: Option<Vec<P::Expr>>) -> Self {
        Self { to_agg, group_by }
    }

    #[instrument(skip_all, name = "Aggregate::run")]
    pub fn run(&self, inputs: &[Arc<P>]) -> DaftResult<Vec<Arc<P>>> {
        let input = single("Aggregate", inputs)?;
        let agged = input.agg(&self.to_agg, self.group_by.as_deref())?;
        Ok(vec![Arc::new(agged)])
    }
}
