use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::ServerEvent;

struct ConnectionEntry {
    sender: mpsc::UnboundedSender<ServerEvent>,
    last_heartbeat: Instant,
}

/// Registry of live connections and chat rooms.
///
/// Encapsulates the two shared maps of the real-time subsystem; every
/// operation takes the owning lock, so readers always see a consistent
/// snapshot and read-modify-write sequences cannot interleave. The raw maps
/// are never handed out.
///
/// Senders are unbounded, so nothing awaits while a lock is held. Dropping a
/// connection's sender ends its writer task, which closes the transport;
/// close errors are the writer's to ignore.
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<Uuid, ConnectionEntry>>,
    rooms: Mutex<HashMap<Uuid, HashSet<Uuid>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            rooms: Mutex::new(HashMap::new()),
        }
    }

    /// Register a connection for a user, replacing any previous one. The
    /// replaced sender is dropped, which closes the stale transport.
    pub fn register(&self, user_id: Uuid, sender: mpsc::UnboundedSender<ServerEvent>) {
        let mut connections = self.connections.lock().unwrap();
        let previous = connections.insert(
            user_id,
            ConnectionEntry {
                sender,
                last_heartbeat: Instant::now(),
            },
        );
        drop(connections);

        if previous.is_some() {
            tracing::info!("user {} reconnected, replacing previous session", user_id);
        } else {
            tracing::info!("user {} connected", user_id);
        }
    }

    /// Remove a user's connection and vacate every room it joined.
    /// Idempotent: unknown users are a no-op.
    pub fn unregister(&self, user_id: Uuid) {
        let removed = self.connections.lock().unwrap().remove(&user_id);
        self.vacate_rooms(user_id);

        if removed.is_some() {
            tracing::info!("user {} disconnected", user_id);
        }
    }

    /// Teardown variant for a connection task cleaning up after itself:
    /// removes the registration only while it still belongs to the given
    /// channel. A user who reconnected in the meantime keeps the new
    /// session, and its room memberships stay intact.
    pub fn unregister_stale(&self, user_id: Uuid, sender: &mpsc::UnboundedSender<ServerEvent>) {
        {
            let mut connections = self.connections.lock().unwrap();
            match connections.get(&user_id) {
                Some(entry) if entry.sender.same_channel(sender) => {
                    connections.remove(&user_id);
                }
                _ => return,
            }
        }

        self.vacate_rooms(user_id);
        tracing::info!("user {} disconnected", user_id);
    }

    fn vacate_rooms(&self, user_id: Uuid) {
        let mut rooms = self.rooms.lock().unwrap();
        rooms.retain(|_, members| {
            members.remove(&user_id);
            !members.is_empty()
        });
    }

    /// Push an event to one user. Not connected is a no-op; a dead channel
    /// is treated as a disconnect.
    pub fn send(&self, user_id: Uuid, event: ServerEvent) {
        let sender = {
            let connections = self.connections.lock().unwrap();
            connections.get(&user_id).map(|entry| entry.sender.clone())
        };

        let Some(sender) = sender else {
            return;
        };

        if sender.send(event).is_err() {
            tracing::warn!("send to {} failed, dropping connection", user_id);
            self.unregister(user_id);
        }
    }

    /// Add a user to a match room, creating the room lazily.
    pub fn join(&self, match_id: Uuid, user_id: Uuid) {
        let mut rooms = self.rooms.lock().unwrap();
        if rooms.entry(match_id).or_default().insert(user_id) {
            tracing::debug!("user {} joined room {}", user_id, match_id);
        }
    }

    /// Remove a user from a match room; empty rooms are pruned.
    pub fn leave(&self, match_id: Uuid, user_id: Uuid) {
        let mut rooms = self.rooms.lock().unwrap();
        if let Some(members) = rooms.get_mut(&match_id) {
            members.remove(&user_id);
            if members.is_empty() {
                rooms.remove(&match_id);
            }
        }
    }

    /// Fan an event out to every member of a room, optionally skipping the
    /// sender (typing and read events; persisted-message confirmations go to
    /// everyone).
    pub fn broadcast(&self, match_id: Uuid, event: ServerEvent, exclude: Option<Uuid>) {
        let members: Vec<Uuid> = {
            let rooms = self.rooms.lock().unwrap();
            match rooms.get(&match_id) {
                Some(members) => members.iter().copied().collect(),
                None => return,
            }
        };

        for member in members {
            if Some(member) == exclude {
                continue;
            }
            self.send(member, event.clone());
        }
    }

    pub fn is_in_room(&self, match_id: Uuid, user_id: Uuid) -> bool {
        self.rooms
            .lock()
            .unwrap()
            .get(&match_id)
            .map(|members| members.contains(&user_id))
            .unwrap_or(false)
    }

    pub fn is_online(&self, user_id: Uuid) -> bool {
        self.connections.lock().unwrap().contains_key(&user_id)
    }

    /// Consistent snapshot of everyone currently connected.
    pub fn online_users(&self) -> Vec<Uuid> {
        self.connections.lock().unwrap().keys().copied().collect()
    }

    /// Refresh a user's heartbeat.
    pub fn touch(&self, user_id: Uuid) {
        if let Some(entry) = self.connections.lock().unwrap().get_mut(&user_id) {
            entry.last_heartbeat = Instant::now();
        }
    }

    /// Force-disconnect every connection whose heartbeat is older than the
    /// timeout. Returns how many were evicted. Bounds resource leakage from
    /// clients that vanished without a clean close.
    pub fn sweep_stale(&self, timeout: Duration) -> usize {
        let stale: Vec<Uuid> = {
            let connections = self.connections.lock().unwrap();
            connections
                .iter()
                .filter(|(_, entry)| entry.last_heartbeat.elapsed() > timeout)
                .map(|(user_id, _)| *user_id)
                .collect()
        };

        for user_id in &stale {
            tracing::warn!("evicting stale connection for user {}", user_id);
            self.unregister(*user_id);
        }

        stale.len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connect(registry: &ConnectionRegistry, user: Uuid) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        registry.register(user, tx);
        rx
    }

    #[test]
    fn test_register_and_send() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::from_u128(1);
        let mut rx = connect(&registry, user);

        registry.send(user, ServerEvent::NotificationLiked);
        assert!(matches!(
            rx.try_recv().unwrap(),
            ServerEvent::NotificationLiked
        ));
    }

    #[test]
    fn test_send_to_offline_user_is_noop() {
        let registry = ConnectionRegistry::new();
        registry.send(Uuid::from_u128(1), ServerEvent::NotificationLiked);
        // nothing to observe: must simply not panic
        assert!(!registry.is_online(Uuid::from_u128(1)));
    }

    #[test]
    fn test_send_failure_disconnects() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::from_u128(1);
        let rx = connect(&registry, user);
        drop(rx); // dead channel simulates a failed transport

        registry.send(user, ServerEvent::NotificationLiked);
        assert!(!registry.is_online(user));
    }

    #[test]
    fn test_unregister_vacates_all_rooms() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::from_u128(1);
        let peer = Uuid::from_u128(2);
        let room_a = Uuid::from_u128(10);
        let room_b = Uuid::from_u128(11);

        let _rx = connect(&registry, user);
        let mut peer_rx = connect(&registry, peer);

        registry.join(room_a, user);
        registry.join(room_b, user);
        registry.join(room_a, peer);

        registry.unregister(user);

        assert!(!registry.is_in_room(room_a, user));
        assert!(!registry.is_in_room(room_b, user));
        // peer remains
        assert!(registry.is_in_room(room_a, peer));

        // A broadcast after unregister never reaches the departed user
        registry.broadcast(room_a, ServerEvent::NotificationLiked, None);
        assert!(peer_rx.try_recv().is_ok());
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::from_u128(1);
        let _rx = connect(&registry, user);

        registry.unregister(user);
        registry.unregister(user);
        assert!(!registry.is_online(user));
    }

    #[test]
    fn test_stale_unregister_spares_a_reconnect() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::from_u128(1);
        let room = Uuid::from_u128(10);

        let (old_tx, _old_rx) = mpsc::unbounded_channel();
        registry.register(user, old_tx.clone());

        // User reconnects before the old task finishes cleanup
        let _new_rx = connect(&registry, user);
        registry.join(room, user);

        registry.unregister_stale(user, &old_tx);

        // The new session and its room membership survive
        assert!(registry.is_online(user));
        assert!(registry.is_in_room(room, user));
    }

    #[test]
    fn test_broadcast_excludes_sender() {
        let registry = ConnectionRegistry::new();
        let sender = Uuid::from_u128(1);
        let receiver = Uuid::from_u128(2);
        let room = Uuid::from_u128(10);

        let mut sender_rx = connect(&registry, sender);
        let mut receiver_rx = connect(&registry, receiver);
        registry.join(room, sender);
        registry.join(room, receiver);

        registry.broadcast(
            room,
            ServerEvent::Typing {
                user_id: sender,
                is_typing: true,
                match_id: room,
            },
            Some(sender),
        );

        assert!(receiver_rx.try_recv().is_ok());
        assert!(sender_rx.try_recv().is_err());
    }

    #[test]
    fn test_empty_room_is_pruned() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::from_u128(1);
        let room = Uuid::from_u128(10);

        let _rx = connect(&registry, user);
        registry.join(room, user);
        registry.leave(room, user);

        assert!(registry.rooms.lock().unwrap().is_empty());
    }

    #[test]
    fn test_sweep_evicts_only_stale_connections() {
        let registry = ConnectionRegistry::new();
        let stale = Uuid::from_u128(1);
        let fresh = Uuid::from_u128(2);

        let _rx1 = connect(&registry, stale);
        let _rx2 = connect(&registry, fresh);

        // Age the stale connection artificially
        {
            let mut connections = registry.connections.lock().unwrap();
            connections.get_mut(&stale).unwrap().last_heartbeat =
                Instant::now() - Duration::from_secs(600);
        }

        let evicted = registry.sweep_stale(Duration::from_secs(90));

        assert_eq!(evicted, 1);
        assert!(!registry.is_online(stale));
        assert!(registry.is_online(fresh));
    }

    #[test]
    fn test_touch_refreshes_heartbeat() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::from_u128(1);
        let _rx = connect(&registry, user);

        {
            let mut connections = registry.connections.lock().unwrap();
            connections.get_mut(&user).unwrap().last_heartbeat =
                Instant::now() - Duration::from_secs(600);
        }

        registry.touch(user);
        assert_eq!(registry.sweep_stale(Duration::from_secs(90)), 0);
        assert!(registry.is_online(user));
    }

    #[test]
    fn test_online_users_snapshot() {
        let registry = ConnectionRegistry::new();
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let _rx1 = connect(&registry, a);
        let _rx2 = connect(&registry, b);

        let mut online = registry.online_users();
        online.sort();
        assert_eq!(online, vec![a, b]);
    }
}
