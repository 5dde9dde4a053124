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

/// A generic, thread-safe event channel.
///
/// The bus owns both ends of an unbounded `flume` channel. Producers get
/// cloned senders; the owner drains the receiver.
#[derive(Debug)]
pub struct EventBus<T: Clone + Send + Sync + 'static> {
    sender: flume::Sender<T>,
    receiver: flume::Receiver<T>,
}

impl<T: Clone + Send + Sync + 'static> EventBus<T> {
    /// Creates a new bus backed by an unbounded channel.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        log::debug!("EventBus initialized.");
        Self { sender, receiver }
    }

    /// Sends an event, logging an error if the receiving side is gone.
    pub fn publish(&self, event: T) {
        log::trace!("Publishing an event.");

        if let Err(e) = self.sender.send(event) {
            log::error!("Failed to send event: {e}. Receiver likely disconnected.");
        }
    }

    /// Returns a clone of the sending end.
    pub fn sender(&self) -> flume::Sender<T> {
        self.sender.clone()
    }

    /// Returns a clone of the receiving end.
    ///
    /// Several receivers compete for events; each event is delivered once.
    pub fn receiver(&self) -> flume::Receiver<T> {
        self.receiver.clone()
    }

    /// Takes every event currently queued without blocking.
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }

    /// The number of queued events.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Returns `true` if no events are queued.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::UnitEvent;
    use crate::module::ModuleSpecifier;
    use crate::unit::{UnitState, UnitTicket};
    use std::{thread, time::Duration};

    fn event(module: &str, state: UnitState) -> UnitEvent {
        UnitEvent {
            specifier: ModuleSpecifier::new(module),
            ticket: UnitTicket::new(),
            state,
        }
    }

    #[test]
    fn new_bus_is_empty() {
        let bus = EventBus::<UnitEvent>::new();
        assert!(bus.is_empty());
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn drain_returns_events_in_publish_order() {
        let bus = EventBus::new();
        let first = event("unit-a", UnitState::Resolved);
        let second = event("unit-b", UnitState::Rejected);

        bus.publish(first.clone());
        bus.publish(second.clone());
        assert_eq!(bus.len(), 2);

        assert_eq!(bus.drain(), vec![first, second]);
        assert!(bus.is_empty());
    }

    #[test]
    fn send_from_thread() {
        let bus = EventBus::new();
        let sender = bus.sender();
        let sent = event("threaded", UnitState::Resolved);
        let expected = sent.clone();

        let handle = thread::spawn(move || {
            sender.send(sent).expect("Send from thread failed");
        });

        let received = bus
            .receiver()
            .recv_timeout(Duration::from_secs(1))
            .expect("Event should arrive");
        assert_eq!(received, expected);
        handle.join().expect("Thread join failed");
    }

    #[test]
    fn send_fails_after_bus_dropped() {
        let bus = EventBus::new();
        let sender = bus.sender();
        drop(bus);

        assert!(sender.send(event("late", UnitState::Pending)).is_err());
    }
}
