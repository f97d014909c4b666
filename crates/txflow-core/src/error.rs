// txflow-core/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
	#[error("Invalid operation: {0}")]
	InvalidOperation(String),
}
