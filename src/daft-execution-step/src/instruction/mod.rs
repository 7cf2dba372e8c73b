//! Instructions: pure functions from a list of input partitions to a list of output partitions.
//!
//! Most instructions are narrow (one partition in, one out). Fanouts split one partition
//! into `num_outputs` partitions (shuffle write) and reduces merge many partitions into one
//! (shuffle read). All of them share the `&[Arc<P>] -> Vec<Arc<P>>` shape so a pipeline of
//! any composition can be folded left to right.

mod io;
mod join;
mod map;
mod shuffle;
mod sort;

use std::sync::Arc;

use common_error::DaftResult;
pub use io::{FileWrite, ReadFile, TabularFilesScan, WriteFile};
pub use join::Join;
pub use map::{Aggregate, Filter, LocalLimit, MapPartition, MapPartitionOp, Project};
pub use shuffle::{FanoutHash, FanoutRandom, ReduceMerge};
use snafu::ensure;
pub use sort::{FanoutRange, ReduceMergeAndSort, ReduceToQuantiles, Sample};

use crate::{partition::Partition, InputAritySnafu};

pub type InstructionRef<P> = Arc<Instruction<P>>;

#[derive(Debug)]
pub enum Instruction<P: Partition> {
    ReadFile(ReadFile<P>),
    WriteFile(WriteFile<P>),
    Filter(Filter<P>),
    Project(Project<P>),
    LocalLimit(LocalLimit),
    MapPartition(MapPartition<P>),
    Sample(Sample<P>),
    Aggregate(Aggregate<P>),
    Join(Join<P>),
    ReduceMerge(ReduceMerge),
    ReduceMergeAndSort(ReduceMergeAndSort<P>),
    ReduceToQuantiles(ReduceToQuantiles<P>),
    FanoutRandom(FanoutRandom),
    FanoutHash(FanoutHash<P>),
    FanoutRange(FanoutRange<P>),
}

impl<P: Partition> Instruction<P> {
    pub fn run(&self, inputs: &[Arc<P>]) -> DaftResult<Vec<Arc<P>>> {
        match self {
            Self::ReadFile(op) => op.run(inputs),
            Self::WriteFile(op) => op.run(inputs),
            Self::Filter(op) => op.run(inputs),
            Self::Project(op) => op.run(inputs),
            Self::LocalLimit(op) => op.run(inputs),
            Self::MapPartition(op) => op.run(inputs),
            Self::Sample(op) => op.run(inputs),
            Self::Aggregate(op) => op.run(inputs),
            Self::Join(op) => op.run(inputs),
            Self::ReduceMerge(op) => op.run(inputs),
            Self::ReduceMergeAndSort(op) => op.run(inputs),
            Self::ReduceToQuantiles(op) => op.run(inputs),
            Self::FanoutRandom(op) => op.run(inputs),
            Self::FanoutHash(op) => op.run(inputs),
            Self::FanoutRange(op) => op.run(inputs),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ReadFile(_) => "ReadFile",
            Self::WriteFile(_) => "WriteFile",
            Self::Filter(_) => "Filter",
            Self::Project(_) => "Project",
            Self::LocalLimit(_) => "LocalLimit",
            Self::MapPartition(_) => "MapPartition",
            Self::Sample(_) => "Sample",
            Self::Aggregate(_) => "Aggregate",
            Self::Join(_) => "Join",
            Self::ReduceMerge(_) => "ReduceMerge",
            Self::ReduceMergeAndSort(_) => "ReduceMergeAndSort",
            Self::ReduceToQuantiles(_) => "ReduceToQuantiles",
            Self::FanoutRandom(_) => "FanoutRandom",
            Self::FanoutHash(_) => "FanoutHash",
            Self::FanoutRange(_) => "FanoutRange",
        }
    }

    /// Number of partitions this instruction produces per run.
    pub fn num_outputs(&self) -> usize {
        match self {
            Self::FanoutRandom(op) => op.num_outputs(),
            Self::FanoutHash(op) => op.num_outputs(),
            Self::FanoutRange(op) => op.num_outputs(),
            _ => 1,
        }
    }

    pub fn is_fanout(&self) -> bool {
        matches!(
            self,
            Self::FanoutRandom(_) | Self::FanoutHash(_) | Self::FanoutRange(_)
        )
    }
}

macro_rules! impl_from_op {
    ($($variant:ident),* $(,)?) => {
        $(
            impl<P: Partition> From<$variant<P>> for Instruction<P> {
                fn from(op: $variant<P>) -> Self {
                    Self::$variant(op)
                }
            }
        )*
    };
}

impl_from_op!(
    ReadFile,
    WriteFile,
    Filter,
    Project,
    MapPartition,
    Sample,
    Aggregate,
    Join,
    ReduceMergeAndSort,
    ReduceToQuantiles,
    FanoutHash,
    FanoutRange,
);

impl<P: Partition> From<LocalLimit> for Instruction<P> {
    fn from(op: LocalLimit) -> Self {
        Self::LocalLimit(op)
    }
}

impl<P: Partition> From<ReduceMerge> for Instruction<P> {
    fn from(op: ReduceMerge) -> Self {
        Self::ReduceMerge(op)
    }
}

impl<P: Partition> From<FanoutRandom> for Instruction<P> {
    fn from(op: FanoutRandom) -> Self {
        Self::FanoutRandom(op)
    }
}

/// Runs `instructions` in order, feeding each instruction's outputs to the next.
pub fn run_instructions<P: Partition>(
    instructions: &[InstructionRef<P>],
    inputs: Vec<Arc<P>>,
) -> DaftResult<Vec<Arc<P>>> {
    instructions
        .iter()
        .try_fold(inputs, |partitions, instruction| instruction.run(&partitions))
}

fn single<'a, P>(instruction: &'static str, inputs: &'a [Arc<P>]) -> crate::Result<&'a Arc<P>> {
    match inputs {
        [input] => Ok(input),
        _ => InputAritySnafu {
            instruction,
            expected: 1_usize,
            actual: inputs.len(),
        }
        .fail(),
    }
}

fn pair<'a, P>(
    instruction: &'static str,
    inputs: &'a [Arc<P>],
) -> crate::Result<(&'a Arc<P>, &'a Arc<P>)> {
    match inputs {
        [first, second] => Ok((first, second)),
        _ => InputAritySnafu {
            instruction,
            expected: 2_usize,
            actual: inputs.len(),
        }
        .fail(),
    }
}

fn at_least_one<P>(instruction: &'static str, inputs: &[Arc<P>]) -> crate::Result<()> {
    ensure!(
        !inputs.is_empty(),
        InputAritySnafu {
            instruction,
            expected: 1_usize,
            actual: 0_usize,
        }
    );
    Ok(())
}
