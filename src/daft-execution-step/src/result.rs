use std::{fmt::Debug, sync::Arc};

use parking_lot::Mutex;

use crate::partition::PartitionMetadata;

/// A runner-owned handle to one materialized output partition.
///
/// `partition()` yields whatever handle the runner uses for `T` (a local partition, an
/// object reference, a future). Metadata must be available without fetching the partition.
pub trait MaterializationResult<T>: Debug + Send + Sync {
    fn partition(&self) -> T;

    fn metadata(&self) -> PartitionMetadata;

    /// Advisory: asks the runner to stop computing or drop the partition.
    fn cancel(&self);
}

pub type MaterializationResultRef<T> = Arc<dyn MaterializationResult<T>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultState {
    Pending,
    Ready,
    Cancelled,
}

#[derive(Debug)]
enum SlotState<R> {
    Pending,
    Ready(R),
    Cancelled,
}

/// Write-once cell holding the outcome of a frozen request.
///
/// A slot may be filled once. Filling a cancelled slot is allowed, since a runner can finish
/// a task after cancellation was requested; filling a slot twice is not.
#[derive(Debug)]
pub struct ResultSlot<R> {
    state: Mutex<SlotState<R>>,
}

impl<R> Default for ResultSlot<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> ResultSlot<R> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Pending),
        }
    }

    pub fn state(&self) -> ResultState {
        match &*self.state.lock() {
            SlotState::Pending => ResultState::Pending,
            SlotState::Ready(_) => ResultState::Ready,
            SlotState::Cancelled => ResultState::Cancelled,
        }
    }

    /// Stores `value`, returning the state it replaced. Gives `value` back if already set.
    pub fn set(&self, value: R) -> Result<ResultState, R> {
        let mut state = self.state.lock();
        let previous = match &*state {
            SlotState::Ready(_) => return Err(value),
            SlotState::Pending => ResultState::Pending,
            SlotState::Cancelled => ResultState::Cancelled,
        };
        *state = SlotState::Ready(value);
        Ok(previous)
    }
}

impl<R: Clone> ResultSlot<R> {
    pub fn get(&self) -> Option<R> {
        match &*self.state.lock() {
            SlotState::Ready(value) => Some(value.clone()),
            SlotState::Pending | SlotState::Cancelled => None,
        }
    }

    /// Marks a pending slot cancelled. Returns the stored value if one was already set, so
    /// the caller can release it.
    pub fn cancel(&self) -> Option<R> {
        let mut state = self.state.lock();
        match &*state {
            SlotState::Ready(value) => Some(value.clone()),
            SlotState::Pending => {
                *state = SlotState::Cancelled;
                None
            }
            SlotState::Cancelled => None,
        }
    }
}
