// txflow-core/src/lifecycle.rs

use tracing::debug;
use txflow_types::TxStreamPhase;

/// Per-operation record of the last reported phase.
///
/// `advance` answers whether a phase should be reported: the first phase
/// always is, later ones only on a forward transition out of a non-terminal
/// phase. Each phase is therefore reported at most once and in order.
#[derive(Debug, Default, Clone, Copy)]
pub struct PhaseCursor {
	last: Option<TxStreamPhase>,
}

impl PhaseCursor {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn last(&self) -> Option<TxStreamPhase> {
		self.last
	}

	pub fn is_terminal(&self) -> bool {
		self.last.is_some_and(TxStreamPhase::is_terminal)
	}

	pub fn advance(&mut self, phase: TxStreamPhase) -> bool {
		let accepted = match self.last {
			None => true,
			Some(last) => last.can_transition_to(phase),
		};

		if accepted {
			self.last = Some(phase);
		} else {
			debug!("Suppressing phase {} after {:?}", phase, self.last);
		}
		accepted
	}
}
