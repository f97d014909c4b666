//! Process-wide registry of in-flight operations.
//!
//! [`OperationBroadcaster`] owns three independent pieces of shared state:
//!
//! - the ordered list of broadcasting entries, one per operation id;
//! - the subscriber list, notified synchronously on every dispatch;
//! - the cancellation table, one [`AbortController`] per operation id.
//!
//! Entries and subscribers live behind `ArcSwap` snapshots, so readers and
//! dispatch never observe a partially applied write and never block writers.
//! The cancellation table is a `DashMap`. Every dispatched event is also
//! published on the registry's [`EventBus`].

use crate::abort::AbortController;
use crate::event_bus::{EventBus, OperationNotice};
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tracing::{debug, error};
use txflow_types::{OperationEvent, OperationResult, TxResultRendering};

/// Callback invoked with `(operation_id, event)` for every dispatch.
pub type Subscriber = Arc<dyn Fn(&str, &OperationEvent) + Send + Sync>;

const EVENT_BUS_CAPACITY: usize = 1024;

/// Latest state of one operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Broadcasting {
	pub id: String,
	pub result: OperationResult,
	pub rendering: TxResultRendering,
	pub updated_at: DateTime<Utc>,
}

struct RegistryState {
	entries: ArcSwap<Vec<Broadcasting>>,
	subscribers: ArcSwap<Vec<(u64, Subscriber)>>,
	next_subscriber: AtomicU64,
	abort_controllers: DashMap<String, AbortController>,
	events: EventBus,
}

/// Cheaply cloneable handle to the shared registry.
#[derive(Clone)]
pub struct OperationBroadcaster {
	state: Arc<RegistryState>,
}

impl Default for OperationBroadcaster {
	fn default() -> Self {
		Self::new()
	}
}

impl OperationBroadcaster {
	pub fn new() -> Self {
		Self {
			state: Arc::new(RegistryState {
				entries: ArcSwap::from_pointee(Vec::new()),
				subscribers: ArcSwap::from_pointee(Vec::new()),
				next_subscriber: AtomicU64::new(0),
				abort_controllers: DashMap::new(),
				events: EventBus::new(EVENT_BUS_CAPACITY),
			}),
		}
	}

	/// Upserts the entry for `id`.
	///
	/// An existing entry is replaced in place, keeping its position; a new id
	/// is appended. Concurrent writers are serialized by the compare-and-swap
	/// loop, so the last completed write wins.
	pub fn broadcast(&self, id: &str, result: OperationResult, rendering: TxResultRendering) {
		let entry = Broadcasting {
			id: id.to_string(),
			result,
			rendering,
			updated_at: Utc::now(),
		};

		self.state.entries.rcu(|entries| {
			let mut next = Vec::clone(entries);
			match next.iter_mut().find(|existing| existing.id == entry.id) {
				Some(existing) => *existing = entry.clone(),
				None => next.push(entry.clone()),
			}
			next
		});

		debug!(
			"Broadcasting {} in phase {}",
			entry.id,
			entry.rendering.phase()
		);
	}

	/// Upserts the entry for `id` only while `controller` speaks for it.
	///
	/// The controller's table slot stays locked for the write, so a newer run
	/// cannot install its controller between the check and the write. With
	/// `allow_released`, a run whose controller was already removed still
	/// writes as long as no other controller took the slot.
	pub fn broadcast_as(
		&self,
		id: &str,
		controller: &AbortController,
		allow_released: bool,
		result: OperationResult,
		rendering: TxResultRendering,
	) -> bool {
		if controller.is_superseded() {
			return false;
		}

		match self.state.abort_controllers.entry(id.to_string()) {
			Entry::Occupied(slot) if slot.get() == controller => {
				self.broadcast(id, result, rendering);
				drop(slot);
				true
			}
			Entry::Vacant(slot) if allow_released => {
				self.broadcast(id, result, rendering);
				drop(slot);
				true
			}
			_ => false,
		}
	}

	/// Removes the entry for `id`. No-op when absent.
	///
	/// Does not touch the cancellation table: use [`cancel`](Self::cancel)
	/// first to stop a run that is still in flight.
	pub fn stop_broadcast(&self, id: &str) {
		let previous = self.state.entries.rcu(|entries| {
			entries
				.iter()
				.filter(|entry| entry.id != id)
				.cloned()
				.collect::<Vec<_>>()
		});

		if previous.iter().any(|entry| entry.id == id) {
			debug!("Stopped broadcasting {}", id);
		}
	}

	/// Snapshot of all entries in insertion order.
	pub fn broadcasting(&self) -> Arc<Vec<Broadcasting>> {
		self.state.entries.load_full()
	}

	pub fn get(&self, id: &str) -> Option<Broadcasting> {
		self.state
			.entries
			.load()
			.iter()
			.find(|entry| entry.id == id)
			.cloned()
	}

	/// Invokes every subscriber registered when the dispatch started, in
	/// registration order, then publishes the event on the event bus.
	///
	/// A panicking subscriber is logged and skipped.
	pub fn dispatch(&self, id: &str, event: &OperationEvent) {
		let subscribers = self.state.subscribers.load_full();

		for (key, subscriber) in subscribers.iter() {
			if let Err(payload) = catch_unwind(AssertUnwindSafe(|| subscriber(id, event))) {
				error!(
					"Subscriber #{} panicked while handling event for {}: {}",
					key,
					id,
					panic_message(&*payload)
				);
			}
		}

		// Nobody listening on the bus is not an error.
		let _ = self.state.events.publish(OperationNotice {
			id: id.to_string(),
			event: event.clone(),
		});
	}

	pub fn subscribe<F>(&self, subscriber: F) -> Unsubscribe
	where
		F: Fn(&str, &OperationEvent) + Send + Sync + 'static,
	{
		let key = self.state.next_subscriber.fetch_add(1, Ordering::Relaxed);
		let subscriber: Subscriber = Arc::new(subscriber);

		self.state.subscribers.rcu(|subscribers| {
			let mut next = Vec::clone(subscribers);
			next.push((key, subscriber.clone()));
			next
		});
		debug!("Registered subscriber #{}", key);

		Unsubscribe {
			state: Arc::downgrade(&self.state),
			key,
			done: AtomicBool::new(false),
		}
	}

	pub fn subscriber_count(&self) -> usize {
		self.state.subscribers.load().len()
	}

	/// Receiver for every event dispatched after this call.
	pub fn events(&self) -> broadcast::Receiver<OperationNotice> {
		self.state.events.subscribe()
	}

	pub fn get_abort_controller(&self, id: &str) -> Option<AbortController> {
		self.state
			.abort_controllers
			.get(id)
			.map(|controller| controller.value().clone())
	}

	/// Installs `controller` for `id`. A different controller previously
	/// installed for the same id is aborted and marked superseded.
	pub fn set_abort_controller(&self, id: &str, controller: AbortController) {
		let previous = self
			.state
			.abort_controllers
			.insert(id.to_string(), controller.clone());

		if let Some(previous) = previous {
			if previous != controller {
				debug!("Replacing abort controller for {}", id);
				previous.supersede();
			}
		}
	}

	/// Removes the handle without signaling it.
	pub fn remove_abort_controller(&self, id: &str) -> Option<AbortController> {
		self.state
			.abort_controllers
			.remove(id)
			.map(|(_, controller)| controller)
	}

	/// Removes the handle for `id` only when it is `controller`.
	pub fn remove_abort_controller_if(&self, id: &str, controller: &AbortController) -> bool {
		self.state
			.abort_controllers
			.remove_if(id, |_, current| current == controller)
			.is_some()
	}

	/// Removes and signals the handle for `id`. Returns whether one existed.
	pub fn cancel(&self, id: &str) -> bool {
		match self.remove_abort_controller(id) {
			Some(controller) => {
				debug!("Cancelling operation {}", id);
				controller.abort();
				true
			}
			None => false,
		}
	}

	pub fn active_controllers(&self) -> usize {
		self.state.abort_controllers.len()
	}
}

/// Handle returned by [`OperationBroadcaster::subscribe`].
///
/// Removing is idempotent and safe from inside a subscriber. Dropping the
/// handle keeps the subscription.
pub struct Unsubscribe {
	state: Weak<RegistryState>,
	key: u64,
	done: AtomicBool,
}

impl Unsubscribe {
	pub fn unsubscribe(&self) {
		if self.done.swap(true, Ordering::AcqRel) {
			return;
		}

		if let Some(state) = self.state.upgrade() {
			state.subscribers.rcu(|subscribers| {
				subscribers
					.iter()
					.filter(|(key, _)| *key != self.key)
					.cloned()
					.collect::<Vec<_>>()
			});
			debug!("Removed subscriber #{}", self.key);
		}
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		message.to_string()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		"unknown panic".to_string()
	}
}
