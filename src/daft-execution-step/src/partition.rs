use std::{fmt::Debug, sync::Arc};

use common_error::DaftResult;

/// An expression understood by a [`Partition`] implementation.
///
/// Instructions treat expressions as opaque values; the only rewrites they need are the
/// two below, both used by the sampling side of the distributed sort.
pub trait PartitionExpr: Clone + Debug + Send + Sync + 'static {
    /// A reference to the column this expression produces, for use after the expression
    /// has already been evaluated into a partition.
    fn to_column_expr(&self) -> Self;

    /// A predicate that is true where this expression is not null.
    fn not_null(&self) -> Self;
}

/// The physical partition container that instructions operate on.
///
/// Implemented by the data layer (e.g. a micropartition); instructions call into these
/// operations but never implement them.
pub trait Partition: Debug + Send + Sync + Sized + 'static {
    type Expr: PartitionExpr;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn size_bytes(&self) -> DaftResult<Option<usize>>;

    /// Keeps rows where every predicate evaluates to true.
    fn filter(&self, predicate: &[Self::Expr]) -> DaftResult<Self>;

    fn eval_expression_list(&self, exprs: &[Self::Expr]) -> DaftResult<Self>;

    fn head(&self, num: usize) -> DaftResult<Self>;

    /// Draws up to `num` rows.
    fn sample(&self, num: usize) -> DaftResult<Self>;

    fn agg(&self, to_agg: &[Self::Expr], group_by: Option<&[Self::Expr]>) -> DaftResult<Self>;

    fn join(
        &self,
        right: &Self,
        left_on: &[Self::Expr],
        right_on: &[Self::Expr],
        output_projection: &[Self::Expr],
        how: JoinType,
    ) -> DaftResult<Self>;

    fn sort(&self, sort_by: &[Self::Expr], descending: &[bool]) -> DaftResult<Self>;

    /// Returns the `num - 1` rows at evenly spaced positions of an already sorted partition.
    fn quantiles(&self, num: usize) -> DaftResult<Self>;

    /// Concatenates `parts` in order.
    fn merge_partitions(parts: &[&Self], verify_partition_id: bool) -> DaftResult<Self>;

    /// Hashes the evaluated `exprs` of every row. Must be deterministic for equal rows.
    fn hash_rows(&self, exprs: &[Self::Expr]) -> DaftResult<Vec<u64>>;

    /// For each row, the index of the range it falls in, given sorted `boundaries`
    /// (already evaluated sort columns) and the per-column sort direction.
    fn search_sorted(
        &self,
        sort_by: &[Self::Expr],
        boundaries: &Self,
        descending: &[bool],
    ) -> DaftResult<Vec<u64>>;

    fn take(&self, indices: &[u64]) -> DaftResult<Self>;
}

/// A runner's handle to a partition: the partition itself, a reference to remote memory,
/// or a future. Steps only move and clone handles, they never look inside.
pub trait PartitionRef: Clone + Debug + Send + Sync + 'static {
    type Partition: Partition;
}

impl<P: Partition> PartitionRef for Arc<P> {
    type Partition = P;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Outer,
}

impl std::fmt::Display for JoinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Inner => "inner",
            Self::Left => "left",
            Self::Right => "right",
            Self::Outer => "outer",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionMetadata {
    pub num_rows: Option<usize>,
    pub size_bytes: Option<usize>,
}

impl PartitionMetadata {
    pub fn new(num_rows: Option<usize>, size_bytes: Option<usize>) -> Self {
        Self {
            num_rows,
            size_bytes,
        }
    }

    pub fn from_partition<P: Partition>(partition: &P) -> DaftResult<Self> {
        Ok(Self::new(Some(partition.len()), partition.size_bytes()?))
    }
}
