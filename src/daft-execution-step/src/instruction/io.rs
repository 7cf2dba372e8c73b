use std::{fmt::Debug, sync::Arc};

use common_error::DaftResult;
use tracing::instrument;

use super::single;
use crate::partition::Partition;

/// Reads the files listed in a partition of file paths into a data partition.
pub trait TabularFilesScan<P: Partition>: Debug + Send + Sync {
    fn read(&self, filepaths: &P, partition_id: usize) -> DaftResult<P>;
}

/// Writes a partition out and returns a partition describing the written files.
pub trait FileWrite<P: Partition>: Debug + Send + Sync {
    fn write(&self, input: &P, partition_id: usize) -> DaftResult<P>;
}

#[derive(Debug)]
pub struct ReadFile<P: Partition> {
    partition_id: usize,
    scan: Arc<dyn TabularFilesScan<P>>,
}

impl<P: Partition> ReadFile<P> {
    pub fn new(partition_id: usize, scan: Arc<dyn TabularFilesScan<P>>) -> Self {
        Self { partition_id, scan }
    }

    pub fn partition_id(&self) -> usize {
        self.partition_id
    }

    #[instrument(skip_all, name = "ReadFile::run", fields(partition_id = self.partition_id))]
    pub fn run(&self, inputs: &[Arc<P>]) -> DaftResult<Vec<Arc<P>>> {
        let filepaths = single("ReadFile", inputs)?;
        Ok(vec![Arc::new(
            self.scan.read(filepaths, self.partition_id)?,
        )])
    }
}

#[derive(Debug)]
pub struct WriteFile<P: Partition> {
    partition_id: usize,
    sink: Arc<dyn FileWrite<P>>,
}

impl<P: Partition> WriteFile<P> {
    pub fn new(partition_id: usize, sink: Arc<dyn FileWrite<P>>) -> Self {
        Self { partition_id, sink }
    }

    pub fn partition_id(&self) -> usize {
        self.partition_id
    }

    #[instrument(skip_all, name = "WriteFile::run", fields(partition_id = self.partition_id))]
    pub fn run(&self, inputs: &[Arc<P>]) -> DaftResult<Vec<Arc<P>>> {
        let input = single("WriteFile", inputs)?;
        Ok(vec![Arc::new(self.sink.write(input, self.partition_id)?)])
    }
}
