mod error;

pub use error::{DaftError, DaftResult, GenericError};
