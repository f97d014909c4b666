use serde::{Deserialize, Serialize};

use crate::{Receipt, TxFailure, TxStreamPhase};

/// Lifecycle notification dispatched to registry subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationEvent {
	Started { kind: String },
	PhaseChanged { phase: TxStreamPhase },
	Succeeded { receipts: Vec<Receipt> },
	Failed { failure: TxFailure },
}

impl OperationEvent {
	/// Phase this event reports, if any.
	pub fn phase(&self) -> Option<TxStreamPhase> {
		match self {
			Self::Started { .. } => None,
			Self::PhaseChanged { phase } => Some(*phase),
			Self::Succeeded { .. } => Some(TxStreamPhase::Succeed),
			Self::Failed { .. } => Some(TxStreamPhase::Fail),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationStatus {
	InProgress,
	Done,
	Fault,
	Aborted,
}

/// Progress record stored next to each rendering in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
	pub status: OperationStatus,
	pub completed_stages: usize,
	pub total_stages: usize,
}

impl OperationResult {
	pub fn in_progress(completed_stages: usize, total_stages: usize) -> Self {
		Self {
			status: OperationStatus::InProgress,
			completed_stages,
			total_stages,
		}
	}

	pub fn finished(status: OperationStatus, completed_stages: usize, total_stages: usize) -> Self {
		Self {
			status,
			completed_stages,
			total_stages,
		}
	}
}
