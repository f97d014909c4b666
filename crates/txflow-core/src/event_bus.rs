//! Broadcast channel carrying operation lifecycle notices.
//!
//! Registry callbacks run synchronously inside `dispatch`; the event bus is
//! the asynchronous counterpart for observers that live in their own task.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use txflow_types::OperationEvent;

/// One lifecycle event tagged with its operation id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationNotice {
	pub id: String,
	pub event: OperationEvent,
}

/// Cloneable handle to a shared broadcast channel of [`OperationNotice`]s.
///
/// Receivers that fall more than `capacity` notices behind observe
/// `RecvError::Lagged` and skip ahead.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<OperationNotice>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Receives every notice published after this call.
	pub fn subscribe(&self) -> broadcast::Receiver<OperationNotice> {
		self.sender.subscribe()
	}

	/// Fails only when nobody is listening, which callers may ignore.
	pub fn publish(
		&self,
		notice: OperationNotice,
	) -> Result<(), broadcast::error::SendError<OperationNotice>> {
		self.sender.send(notice)?;
		Ok(())
	}

	pub fn receiver_count(&self) -> usize {
		self.sender.receiver_count()
	}
}
