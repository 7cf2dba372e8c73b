use std::{
    fmt::{Debug, Display, Formatter},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use common_error::DaftResult;
use itertools::Itertools;
use snafu::ensure;

use crate::{
    instruction::{run_instructions, InstructionRef},
    partition::PartitionRef,
    result::{MaterializationResultRef, ResultSlot, ResultState},
    ResultAlreadySetSnafu, ResultCardinalitySnafu,
};

pub type TaskId = usize;

/// Hands out task ids that are unique for as long as any clone of the generator lives.
#[derive(Debug, Clone, Default)]
pub struct TaskIdGenerator {
    next: Arc<AtomicUsize>,
}

impl TaskIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> TaskId {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}

fn instruction_names<P: crate::Partition>(instructions: &[InstructionRef<P>]) -> String {
    instructions.iter().map(|i| i.name()).join(", ")
}

/// An execution step that is still being built.
///
/// Cloning yields an independent step: the instruction list is copied and input handles
/// are cloned, so the two can diverge. Freezing consumes the step.
#[derive(Debug, Clone)]
pub struct OpenExecutionQueue<T: PartitionRef> {
    inputs: Vec<T>,
    instructions: Vec<InstructionRef<T::Partition>>,
}

impl<T: PartitionRef> OpenExecutionQueue<T> {
    pub fn new(inputs: Vec<T>) -> Self {
        Self {
            inputs,
            instructions: vec![],
        }
    }

    pub fn inputs(&self) -> &[T] {
        &self.inputs
    }

    pub fn instructions(&self) -> &[InstructionRef<T::Partition>] {
        &self.instructions
    }

    /// Appends an instruction. Compatibility with the previous instruction is only checked
    /// when the pipeline runs.
    pub fn add_instruction(
        &mut self,
        instruction: impl Into<InstructionRef<T::Partition>>,
    ) -> &mut Self {
        self.instructions.push(instruction.into());
        self
    }

    pub fn as_materialization_request(
        self,
        id_generator: &TaskIdGenerator,
    ) -> MaterializationRequest<T> {
        MaterializationRequestBase::freeze(self, 1, id_generator)
    }

    /// Freezes a step whose last instruction fans out into `num_results` partitions.
    pub fn as_materialization_request_multi(
        self,
        num_results: usize,
        id_generator: &TaskIdGenerator,
    ) -> MaterializationRequestMulti<T> {
        MaterializationRequestBase::freeze(self, num_results, id_generator)
    }
}

impl<T: PartitionRef> Display for OpenExecutionQueue<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "OpenExecutionQueue\n  Inputs: {}\n  Instructions: [{}]",
            self.inputs.len(),
            instruction_names(&self.instructions)
        )
    }
}

/// The shape of a frozen request's result: a single handle or an ordered list of them.
pub trait RequestResult<T>: Clone + Debug + Send + Sync + Sized {
    const KIND: &'static str;

    /// Builds the result from handles whose count already matches the request.
    fn from_results(results: Vec<MaterializationResultRef<T>>) -> Option<Self>;

    fn handles(&self) -> &[MaterializationResultRef<T>];
}

impl<T> RequestResult<T> for MaterializationResultRef<T> {
    const KIND: &'static str = "MaterializationRequest";

    fn from_results(mut results: Vec<MaterializationResultRef<T>>) -> Option<Self> {
        results.pop()
    }

    fn handles(&self) -> &[MaterializationResultRef<T>] {
        std::slice::from_ref(self)
    }
}

impl<T> RequestResult<T> for Vec<MaterializationResultRef<T>> {
    const KIND: &'static str = "MaterializationRequestMulti";

    fn from_results(results: Vec<MaterializationResultRef<T>>) -> Option<Self> {
        Some(results)
    }

    fn handles(&self) -> &[MaterializationResultRef<T>] {
        self
    }
}

/// A frozen execution step: fixed inputs and instructions, a unique id and a result slot.
#[derive(Debug)]
pub struct MaterializationRequestBase<T: PartitionRef, R> {
    task_id: TaskId,
    inputs: Vec<T>,
    instructions: Vec<InstructionRef<T::Partition>>,
    num_results: usize,
    result: ResultSlot<R>,
}

/// Request producing exactly one partition.
pub type MaterializationRequest<T> = MaterializationRequestBase<T, MaterializationResultRef<T>>;

/// Request producing `num_results` partitions, in output index order.
pub type MaterializationRequestMulti<T> =
    MaterializationRequestBase<T, Vec<MaterializationResultRef<T>>>;

impl<T: PartitionRef, R: RequestResult<T>> MaterializationRequestBase<T, R> {
    fn freeze(
        step: OpenExecutionQueue<T>,
        num_results: usize,
        id_generator: &TaskIdGenerator,
    ) -> Self {
        let request = Self {
            task_id: id_generator.next_id(),
            inputs: step.inputs,
            instructions: step.instructions,
            num_results,
            result: ResultSlot::new(),
        };
        log::debug!(
            "Froze {} with {} input(s) and {} instruction(s)",
            request.id(),
            request.inputs.len(),
            request.instructions.len()
        );
        request
    }

    pub fn id(&self) -> String {
        format!("{}_{}", R::KIND, self.task_id)
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn inputs(&self) -> &[T] {
        &self.inputs
    }

    pub fn instructions(&self) -> &[InstructionRef<T::Partition>] {
        &self.instructions
    }

    pub fn num_results(&self) -> usize {
        self.num_results
    }

    /// The result, once a runner has completed the request.
    pub fn result(&self) -> Option<R> {
        self.result.get()
    }

    pub fn result_state(&self) -> ResultState {
        self.result.state()
    }

    pub fn is_cancelled(&self) -> bool {
        self.result_state() == ResultState::Cancelled
    }

    /// Stores the runner's result handles. Must be called once per request.
    pub fn complete(&self, results: Vec<MaterializationResultRef<T>>) -> DaftResult<()> {
        let produced = results.len();
        ensure!(
            produced == self.num_results,
            ResultCardinalitySnafu {
                task: self.id(),
                expected: self.num_results,
                actual: produced,
            }
        );
        let Some(value) = R::from_results(results) else {
            return Err(ResultCardinalitySnafu {
                task: self.id(),
                expected: self.num_results,
                actual: produced,
            }
            .build()
            .into());
        };
        match self.result.set(value) {
            Ok(ResultState::Cancelled) => {
                log::warn!("{} completed after it was cancelled", self.id());
                Ok(())
            }
            Ok(_) => {
                log::debug!("{} completed with {produced} result(s)", self.id());
                Ok(())
            }
            Err(_) => Err(ResultAlreadySetSnafu { task: self.id() }.build().into()),
        }
    }

    /// Requests cancellation. Any handles already stored are asked to cancel as well.
    pub fn cancel(&self) {
        if let Some(value) = self.result.cancel() {
            for handle in value.handles() {
                handle.cancel();
            }
        }
        log::debug!("Cancelled {}", self.id());
    }

    /// Resolves the inputs with `resolve` and runs the pipeline in this process, checking
    /// that it produced `num_results` partitions. Does not touch the result slot.
    pub fn run_local(
        &self,
        resolve: impl Fn(&T) -> DaftResult<Arc<T::Partition>>,
    ) -> DaftResult<Vec<Arc<T::Partition>>> {
        let inputs = self
            .inputs
            .iter()
            .map(resolve)
            .collect::<DaftResult<Vec<_>>>()?;
        let outputs = run_instructions(&self.instructions, inputs)?;
        ensure!(
            outputs.len() == self.num_results,
            ResultCardinalitySnafu {
                task: self.id(),
                expected: self.num_results,
                actual: outputs.len(),
            }
        );
        Ok(outputs)
    }
}

impl<T: PartitionRef, R: RequestResult<T>> Display for MaterializationRequestBase<T, R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}\n  Inputs: {}\n  Instructions: [{}]",
            self.id(),
            self.inputs.len(),
            instruction_names(&self.instructions)
        )
    }
}
