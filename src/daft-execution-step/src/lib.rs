//! Execution steps: the unit of work handed from the physical plan to a runner.
//!
//! An [`OpenExecutionQueue`] accumulates a pipeline of [`Instruction`]s over a set of
//! input partitions. Once the pipeline is complete it is frozen into a
//! [`MaterializationRequest`] (one output partition) or a [`MaterializationRequestMulti`]
//! (a fanout producing `num_results` partitions), which a runner executes and then
//! completes with [`MaterializationResult`] handles.
//!
//! The partition container itself is abstract (see [`Partition`]); this crate only
//! composes its operations into the narrow, fanout and reduce instructions that make up
//! shuffles and the sample-based distributed sort.

pub mod executor;
pub mod instruction;
pub mod partition;
pub mod result;
pub mod step;

#[cfg(test)]
pub(crate) mod test;

use common_error::DaftError;
pub use executor::local::{LocalMaterializationResult, SerialExecutor};
pub use instruction::{run_instructions, Instruction, InstructionRef};
pub use partition::{JoinType, Partition, PartitionExpr, PartitionMetadata, PartitionRef};
pub use result::{MaterializationResult, MaterializationResultRef, ResultSlot, ResultState};
use snafu::Snafu;
pub use step::{
    MaterializationRequest, MaterializationRequestBase, MaterializationRequestMulti,
    OpenExecutionQueue, RequestResult, TaskId, TaskIdGenerator,
};

/// Contract violations between the plan translator, this crate and the runner.
///
/// Every variant is a programming error: runners must surface it and must not retry the task.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display(
        "{instruction} expects {expected} input partition(s) but received {actual}"
    ))]
    InputArity {
        instruction: &'static str,
        expected: usize,
        actual: usize,
    },
    #[snafu(display(
        "{task} expects {expected} result partition(s) but its pipeline produced {actual}"
    ))]
    ResultCardinality {
        task: String,
        expected: usize,
        actual: usize,
    },
    #[snafu(display("Result of {task} has already been set"))]
    ResultAlreadySet { task: String },
}

impl Error {
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::InputArity { .. }
            | Self::ResultCardinality { .. }
            | Self::ResultAlreadySet { .. } => true,
        }
    }
}

impl From<Error> for DaftError {
    fn from(err: Error) -> Self {
        log::error!("Execution step contract violation: {err}");
        Self::External(err.into())
    }
}

type Result<T, E = Error> = std::result::Result<T, E>;
