// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::state::{UnitSnapshot, UnitState, UnitTicket};
use crate::error::LoadFailure;
use crate::module::{ModuleSpecifier, Renderable};
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};
use tokio::sync::watch;

/// Shared storage behind every clone of a [`DeferredUnit`].
struct UnitCell<R> {
    specifier: ModuleSpecifier,
    ticket: UnitTicket,
    /// Set exactly once by the completer. Its emptiness *is* the `Pending` state.
    outcome: OnceLock<Result<Arc<R>, LoadFailure>>,
    /// Broadcasts the state after `outcome` has been written.
    state: watch::Sender<UnitState>,
}

/// A thread-safe, reference-counted handle to a unit that may still be loading.
///
/// Cloning a unit is cheap and every clone observes the same state. The unit
/// is released when the last clone is dropped; a load that completes after
/// that point has nowhere to deliver its result and is discarded.
pub struct DeferredUnit<R: Renderable> {
    cell: Arc<UnitCell<R>>,
}

impl<R: Renderable> DeferredUnit<R> {
    /// Creates a pending unit together with the completer that will settle it.
    ///
    /// The completer is the unit's only producer. It only holds a weak
    /// reference, so it never keeps the unit alive on its own.
    pub fn new(specifier: impl Into<ModuleSpecifier>) -> (Self, UnitCompleter<R>) {
        let specifier = specifier.into();
        let ticket = UnitTicket::new();
        let (state, _) = watch::channel(UnitState::Pending);

        let cell = Arc::new(UnitCell {
            specifier: specifier.clone(),
            ticket,
            outcome: OnceLock::new(),
            state,
        });

        let completer = UnitCompleter {
            specifier,
            ticket,
            cell: Some(Arc::downgrade(&cell)),
        };

        (Self { cell }, completer)
    }

    /// The specifier this unit was requested with.
    pub fn identifier(&self) -> &ModuleSpecifier {
        &self.cell.specifier
    }

    /// The ticket correlating this unit with log lines and events.
    pub fn ticket(&self) -> UnitTicket {
        self.cell.ticket
    }

    /// The current lifecycle state.
    pub fn state(&self) -> UnitState {
        match self.cell.outcome.get() {
            None => UnitState::Pending,
            Some(Ok(_)) => UnitState::Resolved,
            Some(Err(_)) => UnitState::Rejected,
        }
    }

    /// Returns `true` once the unit is `Resolved` or `Rejected`.
    pub fn is_settled(&self) -> bool {
        self.state().is_settled()
    }

    /// The loaded value. Only present once the unit is `Resolved`.
    pub fn result(&self) -> Option<Arc<R>> {
        match self.cell.outcome.get() {
            Some(Ok(value)) => Some(value.clone()),
            _ => None,
        }
    }

    /// The load failure. Only present once the unit is `Rejected`.
    pub fn error(&self) -> Option<&LoadFailure> {
        match self.cell.outcome.get() {
            Some(Err(failure)) => Some(failure),
            _ => None,
        }
    }

    /// Captures the state and its payload in one read.
    pub fn snapshot(&self) -> UnitSnapshot<R> {
        match self.cell.outcome.get() {
            None => UnitSnapshot::Pending,
            Some(Ok(value)) => UnitSnapshot::Resolved(value.clone()),
            Some(Err(failure)) => UnitSnapshot::Rejected(failure.clone()),
        }
    }

    /// Subscribes to state transitions.
    ///
    /// The receiver starts out holding the current state and is notified
    /// once, when the unit settles.
    pub fn subscribe(&self) -> watch::Receiver<UnitState> {
        self.cell.state.subscribe()
    }

    /// Waits until the unit has settled and returns the final state.
    ///
    /// Returns immediately if the unit is already settled. If the unit is
    /// never settled (its completer is leaked), this never returns.
    pub async fn settled(&self) -> UnitState {
        let mut receiver = self.subscribe();
        // The borrowed `Ref` must be released before `receiver` goes out of scope.
        let settled = match receiver.wait_for(|state| state.is_settled()).await {
            Ok(state) => *state,
            // The sender lives in the cell we are holding, so this is unreachable
            // in practice. Fall back to the authoritative outcome.
            Err(_) => self.state(),
        };
        settled
    }

    /// Returns `true` if both handles point at the same unit.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    /// The number of live handles to this unit.
    pub fn observer_count(&self) -> usize {
        Arc::strong_count(&self.cell)
    }

    /// Creates a handle that does not keep the unit alive.
    pub fn downgrade(&self) -> WeakUnit<R> {
        WeakUnit {
            ticket: self.cell.ticket,
            cell: Arc::downgrade(&self.cell),
        }
    }
}

/// A non-owning reference to a [`DeferredUnit`].
///
/// Lookup tables hold these so that a unit is still released once its last
/// observer is gone.
pub struct WeakUnit<R: Renderable> {
    ticket: UnitTicket,
    cell: Weak<UnitCell<R>>,
}

impl<R: Renderable> WeakUnit<R> {
    /// The ticket of the referenced unit, readable even after it was released.
    pub fn ticket(&self) -> UnitTicket {
        self.ticket
    }

    /// Returns the unit if at least one handle to it is still alive.
    pub fn upgrade(&self) -> Option<DeferredUnit<R>> {
        self.cell.upgrade().map(|cell| DeferredUnit { cell })
    }

    /// Returns `true` once every handle to the unit has been dropped.
    pub fn is_released(&self) -> bool {
        self.cell.strong_count() == 0
    }
}

impl<R: Renderable> Clone for WeakUnit<R> {
    fn clone(&self) -> Self {
        Self {
            ticket: self.ticket,
            cell: self.cell.clone(),
        }
    }
}

impl<R: Renderable> fmt::Debug for WeakUnit<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakUnit")
            .field("ticket", &self.ticket)
            .field("released", &self.is_released())
            .finish()
    }
}

impl<R: Renderable> Clone for DeferredUnit<R> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<R: Renderable> fmt::Debug for DeferredUnit<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredUnit")
            .field("identifier", &self.cell.specifier)
            .field("ticket", &self.cell.ticket)
            .field("state", &self.state())
            .finish()
    }
}

/// The one-shot producer side of a [`DeferredUnit`].
///
/// `resolve` and `reject` consume the completer, so a unit can be settled at
/// most once. Dropping a completer without settling it rejects the unit with
/// [`LoadFailure::Abandoned`], which keeps units from staying `Pending`
/// forever when their load task panics or is aborted.
pub struct UnitCompleter<R: Renderable> {
    specifier: ModuleSpecifier,
    ticket: UnitTicket,
    cell: Option<Weak<UnitCell<R>>>,
}

impl<R: Renderable> UnitCompleter<R> {
    /// The specifier of the unit this completer settles.
    pub fn identifier(&self) -> &ModuleSpecifier {
        &self.specifier
    }

    /// The ticket of the unit this completer settles.
    pub fn ticket(&self) -> UnitTicket {
        self.ticket
    }

    /// Returns `true` while at least one handle to the unit is alive.
    pub fn is_observed(&self) -> bool {
        self.cell
            .as_ref()
            .is_some_and(|weak| weak.strong_count() > 0)
    }

    /// Moves the unit to `Resolved`.
    ///
    /// Returns `false` if nobody observes the unit anymore, in which case the
    /// value is dropped.
    pub fn resolve(mut self, value: R) -> bool {
        self.settle(Ok(Arc::new(value)))
    }

    /// Moves the unit to `Rejected`.
    ///
    /// Returns `false` if nobody observes the unit anymore.
    pub fn reject(mut self, failure: LoadFailure) -> bool {
        self.settle(Err(failure))
    }

    fn settle(&mut self, outcome: Result<Arc<R>, LoadFailure>) -> bool {
        let Some(weak) = self.cell.take() else {
            return false;
        };

        let Some(cell) = weak.upgrade() else {
            log::trace!(
                "Unit '{}' ({}) settled after every observer was dropped; discarding.",
                self.specifier,
                self.ticket
            );
            return false;
        };

        let next = match &outcome {
            Ok(_) => UnitState::Resolved,
            Err(_) => UnitState::Rejected,
        };

        if cell.outcome.set(outcome).is_err() {
            log::error!(
                "Unit '{}' ({}) was already settled; ignoring second transition.",
                self.specifier,
                self.ticket
            );
            return false;
        }

        // The outcome is written before the broadcast so that anyone woken by
        // the notification reads the settled value.
        cell.state.send_replace(next);
        true
    }
}

impl<R: Renderable> Drop for UnitCompleter<R> {
    fn drop(&mut self) {
        if self.cell.is_some() {
            let failure = LoadFailure::Abandoned {
                module: self.specifier.module().to_string(),
            };
            self.settle(Err(failure));
        }
    }
}

impl<R: Renderable> fmt::Debug for UnitCompleter<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitCompleter")
            .field("identifier", &self.specifier)
            .field("ticket", &self.ticket)
            .field("observed", &self.is_observed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(id: &str) -> (DeferredUnit<String>, UnitCompleter<String>) {
        DeferredUnit::new(id)
    }

    #[test]
    fn new_unit_is_pending() {
        let (unit, _completer) = pending("unit-a");
        assert_eq!(unit.state(), UnitState::Pending);
        assert!(unit.result().is_none());
        assert!(unit.error().is_none());
        assert_eq!(unit.identifier().module(), "unit-a");
    }

    #[test]
    fn resolve_sets_result_once() {
        let (unit, completer) = pending("unit-a");
        assert!(completer.resolve("<div>a</div>".to_string()));

        assert_eq!(unit.state(), UnitState::Resolved);
        assert_eq!(unit.result().as_deref().map(String::as_str), Some("<div>a</div>"));
        assert!(unit.error().is_none());
    }

    #[test]
    fn reject_sets_error_once() {
        let (unit, completer) = pending("unit-missing");
        completer.reject(LoadFailure::NotFound {
            module: "unit-missing".into(),
        });

        assert_eq!(unit.state(), UnitState::Rejected);
        assert!(unit.result().is_none());
        assert!(!unit.error().unwrap().cause().is_empty());
    }

    #[test]
    fn clones_share_state() {
        let (unit, completer) = pending("shared");
        let other = unit.clone();
        assert!(unit.ptr_eq(&other));
        assert_eq!(unit.observer_count(), 2);

        completer.resolve("x".to_string());
        assert_eq!(other.state(), UnitState::Resolved);
    }

    #[test]
    fn dropped_completer_rejects_as_abandoned() {
        let (unit, completer) = pending("panicky");
        drop(completer);

        assert_eq!(unit.state(), UnitState::Rejected);
        assert!(matches!(unit.error(), Some(LoadFailure::Abandoned { .. })));
    }

    #[test]
    fn weak_unit_does_not_keep_unit_alive() {
        let (unit, completer) = pending("weak");
        let weak = unit.downgrade();
        assert_eq!(unit.observer_count(), 1);
        assert_eq!(weak.ticket(), unit.ticket());
        assert!(weak.upgrade().is_some_and(|u| u.ptr_eq(&unit)));

        drop(unit);
        assert!(weak.is_released());
        assert!(weak.upgrade().is_none());
        assert!(!completer.is_observed());
    }

    #[tokio::test]
    async fn settled_returns_final_state() {
        let (unit, completer) = pending("awaited");
        let waiter = unit.clone();
        let task = tokio::spawn(async move { waiter.settled().await });
        completer.resolve("done".to_string());
        assert_eq!(task.await.unwrap(), UnitState::Resolved);
        assert_eq!(unit.settled().await, UnitState::Resolved);
    }

    #[test]
    fn completion_without_observers_is_a_no_op() {
        let (unit, completer) = pending("unmounted");
        assert!(completer.is_observed());
        drop(unit);
        assert!(!completer.is_observed());
        assert!(!completer.resolve("late".to_string()));
    }

    #[test]
    fn snapshot_carries_payload() {
        let (unit, completer) = pending("snap");
        assert_eq!(unit.snapshot().state(), UnitState::Pending);
        completer.resolve("payload".to_string());
        match unit.snapshot() {
            UnitSnapshot::Resolved(value) => assert_eq!(value.as_str(), "payload"),
            other => panic!("unexpected snapshot: {other:?}"),
        }
    }

    #[tokio::test]
    async fn settled_wakes_on_transition() {
        let (unit, completer) = pending("async");
        let waiter = {
            let unit = unit.clone();
            tokio::spawn(async move { unit.settled().await })
        };

        tokio::task::yield_now().await;
        completer.resolve("done".to_string());

        assert_eq!(waiter.await.unwrap(), UnitState::Resolved);
    }

    #[tokio::test]
    async fn subscriber_sees_single_change() {
        let (unit, completer) = pending("watched");
        let mut receiver = unit.subscribe();
        assert_eq!(*receiver.borrow(), UnitState::Pending);

        completer.reject(LoadFailure::NotFound {
            module: "watched".into(),
        });

        receiver.changed().await.unwrap();
        assert_eq!(*receiver.borrow_and_update(), UnitState::Rejected);
        assert!(!receiver.has_changed().unwrap());
    }
}
