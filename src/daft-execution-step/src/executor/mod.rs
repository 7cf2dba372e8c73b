pub mod local;

use common_error::DaftResult;

use crate::{
    partition::PartitionRef,
    step::{MaterializationRequestBase, RequestResult},
};

/// Runs frozen requests and completes them with result handles.
pub trait Executor<T: PartitionRef> {
    fn execute<R: RequestResult<T>>(
        &self,
        request: &MaterializationRequestBase<T, R>,
    ) -> DaftResult<()>;
}
