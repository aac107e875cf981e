//! Connection and room registry for WebSocket fan-out.
//!
//! Every connected client owns an unbounded channel; rooms are named after
//! symbols and hold the set of clients subscribed to them. Publishing an
//! event to a room clones it once per member and pushes it down each
//! channel, so a slow consumer never blocks the others.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::models::HubStats;

/// Identifier handed out at registration, unique for the process lifetime.
pub type ClientId = u64;

/// Result of joining a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinOutcome {
    /// Whether this client was not a member before.
    pub newly_joined: bool,
    /// Whether the room had no members at all before this join.
    pub first_subscriber: bool,
}

/// Result of leaving a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// Whether this client was a member.
    pub removed: bool,
    /// Whether the departure left the room empty.
    pub room_emptied: bool,
}

/// Registry of clients and symbol rooms with per-room fan-out.
pub struct BroadcastHub<T> {
    next_id: AtomicU64,
    clients: RwLock<HashMap<ClientId, mpsc::UnboundedSender<T>>>,
    rooms: RwLock<HashMap<String, HashSet<ClientId>>>,
    memberships: RwLock<HashMap<ClientId, HashSet<String>>>,
}

impl<T> Default for BroadcastHub<T> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            clients: RwLock::new(HashMap::new()),
            rooms: RwLock::new(HashMap::new()),
            memberships: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: Clone> BroadcastHub<T> {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new client and returns its id together with the receiving
    /// half of its event channel.
    pub fn register(&self) -> (ClientId, mpsc::UnboundedReceiver<T>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mpsc::unbounded_channel();
        self.clients.write().insert(id, tx);
        (id, rx)
    }

    /// Adds `client` to `room`, creating the room on first use. Joining a
    /// room twice is a no-op reported through the outcome, as is joining
    /// with an id that is not (or no longer) registered.
    pub fn join(&self, client: ClientId, room: &str) -> JoinOutcome {
        // A subscribe racing teardown must not recreate rooms for a client
        // whose channel is already gone; nothing would clean them up again.
        if !self.clients.read().contains_key(&client) {
            return JoinOutcome {
                newly_joined: false,
                first_subscriber: false,
            };
        }

        let newly_joined = self
            .memberships
            .write()
            .entry(client)
            .or_default()
            .insert(room.to_string());
        if !newly_joined {
            return JoinOutcome {
                newly_joined: false,
                first_subscriber: false,
            };
        }

        let mut rooms = self.rooms.write();
        let members = rooms.entry(room.to_string()).or_default();
        let first_subscriber = members.is_empty();
        members.insert(client);
        JoinOutcome {
            newly_joined: true,
            first_subscriber,
        }
    }

    /// Removes `client` from `room`. Empty rooms are dropped.
    pub fn leave(&self, client: ClientId, room: &str) -> LeaveOutcome {
        let removed = self
            .memberships
            .write()
            .get_mut(&client)
            .is_some_and(|joined| joined.remove(room));
        if !removed {
            return LeaveOutcome {
                removed: false,
                room_emptied: false,
            };
        }

        let mut rooms = self.rooms.write();
        let room_emptied = if let Some(members) = rooms.get_mut(room) {
            members.remove(&client);
            members.is_empty()
        } else {
            false
        };
        if room_emptied {
            rooms.remove(room);
        }
        LeaveOutcome {
            removed: true,
            room_emptied,
        }
    }

    /// Sends `event` to every member of `room`, once per member. Returns the
    /// number of clients the event was delivered to.
    pub fn publish(&self, room: &str, event: &T) -> usize {
        let members: Vec<ClientId> = {
            let rooms = self.rooms.read();
            match rooms.get(room) {
                Some(members) => members.iter().copied().collect(),
                None => return 0,
            }
        };

        let clients = self.clients.read();
        let mut delivered = 0;
        for id in members {
            if let Some(tx) = clients.get(&id) {
                if tx.send(event.clone()).is_ok() {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    /// Removes a client and all its memberships. Returns the rooms that
    /// became empty because of the departure, sorted.
    pub fn disconnect(&self, client: ClientId) -> Vec<String> {
        self.clients.write().remove(&client);
        let joined = self
            .memberships
            .write()
            .remove(&client)
            .unwrap_or_default();

        let mut emptied = Vec::new();
        let mut rooms = self.rooms.write();
        for room in joined {
            if let Some(members) = rooms.get_mut(&room) {
                members.remove(&client);
                if members.is_empty() {
                    rooms.remove(&room);
                    emptied.push(room);
                }
            }
        }
        emptied.sort();
        emptied
    }

    /// Number of connected clients.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    /// Number of rooms with at least one member.
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.read().len()
    }

    /// Point-in-time hub statistics.
    #[must_use]
    pub fn stats(&self) -> HubStats {
        HubStats {
            clients: self.clients.read().len(),
            rooms: self.rooms.read().len(),
            memberships: self
                .memberships
                .read()
                .values()
                .map(HashSet::len)
                .sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_assigns_unique_ids() {
        let hub: BroadcastHub<String> = BroadcastHub::new();
        let (a, _rx_a) = hub.register();
        let (b, _rx_b) = hub.register();

        assert_ne!(a, b);
        assert_eq!(hub.client_count(), 2);
    }

    #[test]
    fn test_join_is_idempotent() {
        let hub: BroadcastHub<String> = BroadcastHub::new();
        let (client, _rx) = hub.register();

        let first = hub.join(client, "AAPL");
        assert!(first.newly_joined);
        assert!(first.first_subscriber);

        let second = hub.join(client, "AAPL");
        assert!(!second.newly_joined);
        assert!(!second.first_subscriber);
        assert_eq!(hub.room_count(), 1);
    }

    #[test]
    fn test_first_subscriber_only_once_per_room() {
        let hub: BroadcastHub<String> = BroadcastHub::new();
        let (a, _rx_a) = hub.register();
        let (b, _rx_b) = hub.register();

        assert!(hub.join(a, "AAPL").first_subscriber);
        assert!(!hub.join(b, "AAPL").first_subscriber);
    }

    #[test]
    fn test_publish_delivers_exactly_once_per_member() {
        let hub: BroadcastHub<String> = BroadcastHub::new();
        let (a, mut rx_a) = hub.register();
        let (b, mut rx_b) = hub.register();
        hub.join(a, "AAPL");
        hub.join(a, "AAPL");
        hub.join(b, "AAPL");

        let delivered = hub.publish("AAPL", &"tick".to_string());
        assert_eq!(delivered, 2);

        assert_eq!(rx_a.try_recv().expect("event for a"), "tick");
        assert!(rx_a.try_recv().is_err());
        assert_eq!(rx_b.try_recv().expect("event for b"), "tick");
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn test_publish_respects_room_isolation() {
        let hub: BroadcastHub<String> = BroadcastHub::new();
        let (a, mut rx_a) = hub.register();
        let (b, mut rx_b) = hub.register();
        hub.join(a, "AAPL");
        hub.join(b, "MSFT");

        hub.publish("AAPL", &"tick".to_string());
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn test_publish_to_unknown_room_delivers_nothing() {
        let hub: BroadcastHub<String> = BroadcastHub::new();
        assert_eq!(hub.publish("AAPL", &"tick".to_string()), 0);
    }

    #[test]
    fn test_leave_reports_room_emptied() {
        let hub: BroadcastHub<String> = BroadcastHub::new();
        let (a, _rx_a) = hub.register();
        let (b, _rx_b) = hub.register();
        hub.join(a, "AAPL");
        hub.join(b, "AAPL");

        let first = hub.leave(a, "AAPL");
        assert!(first.removed);
        assert!(!first.room_emptied);

        let second = hub.leave(b, "AAPL");
        assert!(second.removed);
        assert!(second.room_emptied);
        assert_eq!(hub.room_count(), 0);

        let missing = hub.leave(b, "AAPL");
        assert!(!missing.removed);
    }

    #[test]
    fn test_disconnect_returns_emptied_rooms() {
        let hub: BroadcastHub<String> = BroadcastHub::new();
        let (a, mut rx_a) = hub.register();
        let (b, _rx_b) = hub.register();
        hub.join(a, "AAPL");
        hub.join(a, "MSFT");
        hub.join(b, "MSFT");

        let emptied = hub.disconnect(a);
        assert_eq!(emptied, vec!["AAPL".to_string()]);
        assert_eq!(hub.client_count(), 1);
        assert_eq!(hub.room_count(), 1);
        // The stored sender is dropped, so the receive stream ends.
        assert!(matches!(
            rx_a.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn test_join_requires_registered_client() {
        let hub: BroadcastHub<String> = BroadcastHub::new();

        let outcome = hub.join(42, "AAPL");
        assert!(!outcome.newly_joined);
        assert!(!outcome.first_subscriber);
        assert_eq!(hub.room_count(), 0);
        assert_eq!(hub.stats().memberships, 0);
    }

    #[test]
    fn test_join_after_disconnect_does_not_resurrect_room() {
        let hub: BroadcastHub<String> = BroadcastHub::new();
        let (client, _rx) = hub.register();
        hub.join(client, "AAPL");
        hub.disconnect(client);

        let outcome = hub.join(client, "AAPL");
        assert!(!outcome.newly_joined);
        assert!(!outcome.first_subscriber);
        assert_eq!(hub.room_count(), 0);
        assert_eq!(hub.stats().memberships, 0);
        assert_eq!(hub.publish("AAPL", &"tick".to_string()), 0);
    }

    #[test]
    fn test_stats_counts_memberships() {
        let hub: BroadcastHub<String> = BroadcastHub::new();
        let (a, _rx_a) = hub.register();
        let (b, _rx_b) = hub.register();
        hub.join(a, "AAPL");
        hub.join(a, "MSFT");
        hub.join(b, "AAPL");

        let stats = hub.stats();
        assert_eq!(stats.clients, 2);
        assert_eq!(stats.rooms, 2);
        assert_eq!(stats.memberships, 3);
    }
}
