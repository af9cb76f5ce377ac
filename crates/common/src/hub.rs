//! Push/subscribe boundary between the core and the transport
//!
//! Every transport connection registers with the [`Hub`] and receives a
//! `flume` receiver of [`OutboundEvent`]s; a writer task on the transport side
//! drains it onto the socket. Sends never block and failures are reported per
//! recipient, so one stale connection cannot stall a broadcast.
//!
//! Queues are bounded. A connection whose queue is full is evicted: its
//! sender is dropped, the writer drains what is left and then stops, and the
//! transport closes the socket.

use std::collections::HashMap;
use std::sync::Arc;

use flume::TrySendError;
use parking_lot::RwLock;

use crate::events::OutboundEvent;
use crate::session::ConnectionId;

/// Outbound events buffered per connection before it is evicted
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Something that can deliver events to connections
pub trait EventSink: Send + Sync {
    /// Deliver to a single connection. Returns `false` if it is gone.
    fn send_to(&self, connection_id: ConnectionId, event: OutboundEvent) -> bool;

    /// Deliver to every connection. Returns the number of successful deliveries.
    fn broadcast(&self, event: OutboundEvent) -> usize;
}

pub type EventReceiver = flume::Receiver<OutboundEvent>;

/// Registry of connection outbound channels
#[derive(Debug, Clone)]
pub struct Hub {
    connections: Arc<RwLock<HashMap<ConnectionId, flume::Sender<OutboundEvent>>>>,
    capacity: usize,
}

impl Default for Hub {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hub whose per-connection queues hold at most `capacity` events
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Register a connection and hand back the receiving end of its channel.
    ///
    /// Registering an id twice replaces the earlier channel.
    pub fn register(&self, connection_id: ConnectionId) -> EventReceiver {
        let (tx, rx) = flume::bounded(self.capacity);
        self.connections.write().insert(connection_id, tx);
        tracing::debug!(connection = %connection_id, "HUB: connection registered");
        rx
    }

    pub fn unregister(&self, connection_id: ConnectionId) {
        if self.connections.write().remove(&connection_id).is_some() {
            tracing::debug!(connection = %connection_id, "HUB: connection unregistered");
        }
    }

    pub fn is_registered(&self, connection_id: ConnectionId) -> bool {
        self.connections.read().contains_key(&connection_id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }

    /// Returns true if the event was queued. A full queue evicts the connection.
    fn deliver(
        &self,
        connection_id: ConnectionId,
        tx: &flume::Sender<OutboundEvent>,
        event: OutboundEvent,
    ) -> Result<(), Eviction> {
        match tx.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(event)) => {
                tracing::warn!(
                    connection = %connection_id,
                    event = event.name(),
                    capacity = self.capacity,
                    "HUB: outbound queue full, evicting connection"
                );
                Err(Eviction::Full)
            }
            Err(TrySendError::Disconnected(event)) => {
                tracing::debug!(
                    connection = %connection_id,
                    event = event.name(),
                    "HUB: dropping event for closed connection"
                );
                Err(Eviction::Closed)
            }
        }
    }

    fn evict(&self, connection_id: ConnectionId, tx: &flume::Sender<OutboundEvent>) {
        let mut connections = self.connections.write();
        // a re-registration in between owns a different channel
        if connections
            .get(&connection_id)
            .is_some_and(|current| current.same_channel(tx))
        {
            connections.remove(&connection_id);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Eviction {
    Full,
    Closed,
}

impl EventSink for Hub {
    fn send_to(&self, connection_id: ConnectionId, event: OutboundEvent) -> bool {
        let Some(tx) = self.connections.read().get(&connection_id).cloned() else {
            return false;
        };
        match self.deliver(connection_id, &tx, event) {
            Ok(()) => true,
            Err(Eviction::Full) => {
                self.evict(connection_id, &tx);
                false
            }
            Err(Eviction::Closed) => false,
        }
    }

    fn broadcast(&self, event: OutboundEvent) -> usize {
        let connections: Vec<_> = self
            .connections
            .read()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut delivered = 0;
        for (connection_id, tx) in connections {
            match self.deliver(connection_id, &tx, event.clone()) {
                Ok(()) => delivered += 1,
                Err(Eviction::Full) => self.evict(connection_id, &tx),
                Err(Eviction::Closed) => {}
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::JoinErrorPayload;

    fn event(message: &str) -> OutboundEvent {
        OutboundEvent::JoinError(JoinErrorPayload {
            message: message.into(),
        })
    }

    #[test]
    fn test_send_to_registered_connection() {
        let hub = Hub::new();
        let id = ConnectionId::new();
        let rx = hub.register(id);

        assert!(hub.send_to(id, event("hello")));
        assert_eq!(rx.try_recv().unwrap(), event("hello"));
        assert!(!hub.send_to(ConnectionId::new(), event("nobody")));
    }

    #[test]
    fn test_broadcast_skips_dropped_receivers() {
        let hub = Hub::new();
        let live = hub.register(ConnectionId::new());
        let dropped = hub.register(ConnectionId::new());
        drop(dropped);

        assert_eq!(hub.broadcast(event("all")), 1);
        assert_eq!(live.try_recv().unwrap(), event("all"));
    }

    #[test]
    fn test_unregister() {
        let hub = Hub::new();
        let id = ConnectionId::new();
        let _rx = hub.register(id);
        assert_eq!(hub.connection_count(), 1);

        hub.unregister(id);
        hub.unregister(id);
        assert!(!hub.is_registered(id));
        assert_eq!(hub.broadcast(event("gone")), 0);
    }

    #[test]
    fn test_per_connection_order_is_fifo() {
        let hub = Hub::new();
        let id = ConnectionId::new();
        let rx = hub.register(id);

        for i in 0..10 {
            hub.broadcast(event(&i.to_string()));
        }
        let received: Vec<_> = rx.try_iter().collect();
        let expected: Vec<_> = (0..10).map(|i| event(&i.to_string())).collect();
        assert_eq!(received, expected);
    }

    #[test]
    fn test_full_queue_evicts_connection() {
        let hub = Hub::with_capacity(2);
        let slow = ConnectionId::new();
        let fast = ConnectionId::new();
        let slow_rx = hub.register(slow);
        let fast_rx = hub.register(fast);

        assert_eq!(hub.broadcast(event("0")), 2);
        assert_eq!(hub.broadcast(event("1")), 2);
        // the fast reader keeps up, the slow one never reads
        fast_rx.drain().for_each(drop);

        assert_eq!(hub.broadcast(event("2")), 1);
        assert!(!hub.is_registered(slow));
        assert!(hub.is_registered(fast));
        assert!(!hub.send_to(slow, event("3")));

        // what was queued before eviction is still readable, then the channel ends
        let queued: Vec<_> = slow_rx.try_iter().collect();
        assert_eq!(queued, vec![event("0"), event("1")]);
        assert!(matches!(
            slow_rx.try_recv(),
            Err(flume::TryRecvError::Disconnected)
        ));
        assert_eq!(fast_rx.try_recv().unwrap(), event("2"));
    }

    #[test]
    fn test_send_to_full_queue_evicts() {
        let hub = Hub::with_capacity(1);
        let id = ConnectionId::new();
        let _rx = hub.register(id);

        assert!(hub.send_to(id, event("first")));
        assert!(!hub.send_to(id, event("second")));
        assert!(!hub.is_registered(id));
    }

    #[test]
    fn test_eviction_spares_reregistered_channel() {
        let hub = Hub::with_capacity(1);
        let id = ConnectionId::new();
        let _old = hub.register(id);
        let old_tx = hub.connections.read().get(&id).cloned().unwrap();

        let _new = hub.register(id);
        hub.evict(id, &old_tx);
        assert!(hub.is_registered(id));
    }
}
