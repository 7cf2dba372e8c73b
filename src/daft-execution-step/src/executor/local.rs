use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use common_error::DaftResult;

use super::Executor;
use crate::{
    partition::{Partition, PartitionMetadata},
    result::{MaterializationResult, MaterializationResultRef, ResultState},
    step::{MaterializationRequestBase, RequestResult},
    ResultAlreadySetSnafu,
};

/// A partition that has already been computed in this process.
#[derive(Debug)]
pub struct LocalMaterializationResult<P: Partition> {
    partition: Arc<P>,
    metadata: PartitionMetadata,
    cancelled: AtomicBool,
}

impl<P: Partition> LocalMaterializationResult<P> {
    pub fn try_new(partition: Arc<P>) -> DaftResult<Self> {
        let metadata = PartitionMetadata::from_partition(partition.as_ref())?;
        Ok(Self {
            partition,
            metadata,
            cancelled: AtomicBool::new(false),
        })
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl<P: Partition> MaterializationResult<Arc<P>> for LocalMaterializationResult<P> {
    fn partition(&self) -> Arc<P> {
        self.partition.clone()
    }

    fn metadata(&self) -> PartitionMetadata {
        self.metadata.clone()
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

/// Executes requests one at a time on the calling thread.
#[derive(Debug, Default)]
pub struct SerialExecutor;

impl SerialExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl<P: Partition> Executor<Arc<P>> for SerialExecutor {
    fn execute<R: RequestResult<Arc<P>>>(
        &self,
        request: &MaterializationRequestBase<Arc<P>, R>,
    ) -> DaftResult<()> {
        let task = request.id();
        let _span = tracing::info_span!("SerialExecutor::execute", task = %task).entered();
        match request.result_state() {
            ResultState::Cancelled => {
                log::debug!("Skipping {task}, it was cancelled before it ran");
                return Ok(());
            }
            // Rerunning would repeat the pipeline's writes only to have the result refused.
            ResultState::Ready => return Err(ResultAlreadySetSnafu { task }.build().into()),
            ResultState::Pending => {}
        }
        let outputs = request.run_local(|input| Ok(input.clone()))?;
        let results = outputs
            .into_iter()
            .map(|partition| {
                Ok(Arc::new(LocalMaterializationResult::try_new(partition)?)
                    as MaterializationResultRef<Arc<P>>)
            })
            .collect::<DaftResult<Vec<_>>>()?;
        request.complete(results)?;
        log::debug!("Executed {task}");
        Ok(())
    }
}
