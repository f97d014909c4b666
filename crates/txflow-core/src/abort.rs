//! Cancellation handles for in-flight operations.

use crate::registry::OperationBroadcaster;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use txflow_delivery::AbortSignal;

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Cancellation handle for one run of an operation.
///
/// Clones share the same token. Two controllers compare equal only when
/// they are clones of each other, so the registry can tell a run's own
/// handle from the handle of a newer run with the same id.
#[derive(Debug, Clone)]
pub struct AbortController {
	token: CancellationToken,
	generation: u64,
	superseded: Arc<AtomicBool>,
}

impl AbortController {
	pub fn new() -> Self {
		Self {
			token: CancellationToken::new(),
			generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
			superseded: Arc::new(AtomicBool::new(false)),
		}
	}

	pub fn abort(&self) {
		self.token.cancel();
	}

	/// Aborts because another controller took over the same id.
	pub(crate) fn supersede(&self) {
		self.superseded.store(true, Ordering::Release);
		self.token.cancel();
	}

	/// Whether this controller was replaced in the registry.
	pub fn is_superseded(&self) -> bool {
		self.superseded.load(Ordering::Acquire)
	}

	pub fn is_aborted(&self) -> bool {
		self.token.is_cancelled()
	}

	pub fn token(&self) -> CancellationToken {
		self.token.clone()
	}

	pub fn generation(&self) -> u64 {
		self.generation
	}
}

impl Default for AbortController {
	fn default() -> Self {
		Self::new()
	}
}

impl PartialEq for AbortController {
	fn eq(&self, other: &Self) -> bool {
		self.generation == other.generation
	}
}

impl Eq for AbortController {}

impl AbortSignal for AbortController {
	fn is_aborted(&self) -> bool {
		AbortController::is_aborted(self)
	}

	fn token(&self) -> CancellationToken {
		AbortController::token(self)
	}
}

/// Abort signal bound to the registry's cancellation table.
///
/// Reports aborted once its own controller is signaled, or once the table no
/// longer holds that controller for `id` (removed or replaced).
pub struct RegisteredAbort {
	registry: OperationBroadcaster,
	id: String,
	controller: AbortController,
}

impl RegisteredAbort {
	pub fn new(registry: OperationBroadcaster, id: impl Into<String>, controller: AbortController) -> Self {
		Self {
			registry,
			id: id.into(),
			controller,
		}
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	pub fn controller(&self) -> &AbortController {
		&self.controller
	}

	/// Whether the table still holds this run's controller.
	pub fn is_current(&self) -> bool {
		self.registry.get_abort_controller(&self.id).as_ref() == Some(&self.controller)
	}
}

impl AbortSignal for RegisteredAbort {
	fn is_aborted(&self) -> bool {
		self.controller.is_aborted() || !self.is_current()
	}

	fn token(&self) -> CancellationToken {
		self.controller.token()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_clones_are_equal() {
		let controller = AbortController::new();
		let clone = controller.clone();
		assert_eq!(controller, clone);
		assert_ne!(controller, AbortController::new());

		clone.abort();
		assert!(controller.is_aborted());
		assert!(!controller.is_superseded());
	}

	#[test]
	fn test_registered_abort_follows_table() {
		let registry = OperationBroadcaster::new();
		let controller = AbortController::new();
		registry.set_abort_controller("op-1", controller.clone());

		let signal = RegisteredAbort::new(registry.clone(), "op-1", controller.clone());
		assert!(!AbortSignal::is_aborted(&signal));

		registry.remove_abort_controller("op-1");
		assert!(AbortSignal::is_aborted(&signal));
		assert!(!controller.is_aborted());
	}

	#[test]
	fn test_registered_abort_sees_replacement() {
		let registry = OperationBroadcaster::new();
		let first = AbortController::new();
		registry.set_abort_controller("op-1", first.clone());
		let signal = RegisteredAbort::new(registry.clone(), "op-1", first.clone());

		registry.set_abort_controller("op-1", AbortController::new());
		assert!(first.is_aborted());
		assert!(first.is_superseded());
		assert!(AbortSignal::is_aborted(&signal));
		assert!(!signal.is_current());
	}
}
