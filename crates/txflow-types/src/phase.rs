//! Transaction lifecycle phases.

use serde::{Deserialize, Serialize};

/// Phase of a transaction stream.
///
/// Phases are ordered: a stream only ever moves forward through
/// `Broadcast -> Polling -> {Succeed | Fail}`. `Succeed` and `Fail` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TxStreamPhase {
	/// Submitted, awaiting inclusion.
	Broadcast,
	/// Awaiting confirmation.
	Polling,
	/// Terminal success.
	Succeed,
	/// Terminal failure.
	Fail,
}

impl TxStreamPhase {
	pub fn is_terminal(self) -> bool {
		matches!(self, Self::Succeed | Self::Fail)
	}

	/// Whether moving from `self` to `next` is a forward transition.
	///
	/// Staying in the same phase is not a transition.
	pub fn can_transition_to(self, next: TxStreamPhase) -> bool {
		use TxStreamPhase::*;

		match (self, next) {
			(Broadcast, Polling) => true,
			(Broadcast, Succeed) | (Broadcast, Fail) => true,
			(Polling, Succeed) | (Polling, Fail) => true,
			_ => false,
		}
	}
}

impl std::fmt::Display for TxStreamPhase {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Broadcast => write!(f, "BROADCAST"),
			Self::Polling => write!(f, "POLLING"),
			Self::Succeed => write!(f, "SUCCEED"),
			Self::Fail => write!(f, "FAIL"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_forward_transitions() {
		use TxStreamPhase::*;

		assert!(Broadcast.can_transition_to(Polling));
		assert!(Broadcast.can_transition_to(Fail));
		assert!(Polling.can_transition_to(Succeed));
		assert!(Polling.can_transition_to(Fail));
	}

	#[test]
	fn test_no_backward_or_terminal_transitions() {
		use TxStreamPhase::*;

		assert!(!Polling.can_transition_to(Broadcast));
		assert!(!Polling.can_transition_to(Polling));
		assert!(!Succeed.can_transition_to(Fail));
		assert!(!Fail.can_transition_to(Succeed));
		assert!(!Fail.can_transition_to(Broadcast));
	}

	#[test]
	fn test_terminal_and_ordering() {
		assert!(TxStreamPhase::Succeed.is_terminal());
		assert!(TxStreamPhase::Fail.is_terminal());
		assert!(!TxStreamPhase::Polling.is_terminal());
		assert!(TxStreamPhase::Broadcast < TxStreamPhase::Polling);
		assert_eq!(TxStreamPhase::Polling.to_string(), "POLLING");
	}
}
