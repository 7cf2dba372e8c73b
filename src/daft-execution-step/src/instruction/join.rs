use std::sync::Arc;

use common_error::DaftResult;
use tracing::instrument;

use super::pair;
use crate::partition::{JoinType, Partition};

/// Joins exactly two co-partitioned inputs, left then right.
#[derive(Debug)]
pub struct Join<P: Partition> {
    left_on: Vec<P::Expr>,
    right_on: Vec<P::Expr>,
    output_projection: Vec<P::Expr>,
    how: JoinType,
}

impl<P: Partition> Join<P> {
    pub fn new(
        left_on: Vec<P::Expr>,
        right_on: Vec<P::Expr>,
        output_projection: Vec<P::Expr>,
        how: JoinType,
    ) -> Self {
        Self {
            left_on,
            right_on,
            output_projection,
            how,
        }
    }

    pub fn how(&self) -> JoinType {
        self.how
    }

    #[instrument(skip_all, name = "Join::run", fields(how = %self.how))]
    pub fn run(&self, inputs: &[Arc<P>]) -> DaftResult<Vec<Arc<P>>> {
        let (left, right) = pair("Join", inputs)?;
        let joined = left.join(
            right,
            &self.left_on,
            &self.right_on,
            &self.output_projection,
            self.how,
        )?;
        Ok(vec![Arc::new(joined)])
    }
}
