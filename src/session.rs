//////////////////////////
// session.rs
//////////////////////////

use dashmap::{DashMap, DashSet};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::types::{GameId, ServerMessage};

pub type ConnectionId = Uuid;

/// Outbound queue for one live connection. The server drains it onto the
/// socket; a closed receiver means the peer is gone.
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

#[derive(Clone, Debug)]
pub struct Member {
    pub username: String,
    pub game_id: GameId,
    outbox: Outbox,
}

/// Which connections are live, who they are, and which room each is in.
///
/// A connection belongs to at most one room. Both maps are concurrent so
/// workers for different connections never need a global lock.
#[derive(Default)]
pub struct SessionRegistry {
    connections: DashMap<ConnectionId, Member>,
    rooms: DashMap<GameId, DashSet<ConnectionId>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        SessionRegistry::default()
    }

    /// Adds `conn` to the room for `game_id`, moving it out of any room it
    /// was in before.
    pub fn join(&self, conn: ConnectionId, username: &str, game_id: GameId, outbox: Outbox) {
        let member = Member {
            username: username.to_string(),
            game_id,
            outbox,
        };
        if let Some(previous) = self.connections.insert(conn, member) {
            if previous.game_id != game_id {
                self.remove_from_room(previous.game_id, conn);
            }
        }
        self.rooms.entry(game_id).or_default().insert(conn);
        tracing::debug!(%conn, game_id, user = username, "joined room");
    }

    /// Drops `conn` from the registry. Safe to call any number of times.
    pub fn leave(&self, conn: ConnectionId) -> Option<Member> {
        let (_, member) = self.connections.remove(&conn)?;
        self.remove_from_room(member.game_id, conn);
        tracing::debug!(%conn, game_id = member.game_id, user = %member.username, "left room");
        Some(member)
    }

    fn remove_from_room(&self, game_id: GameId, conn: ConnectionId) {
        if let Some(room) = self.rooms.get(&game_id) {
            room.remove(&conn);
        }
        self.rooms.remove_if(&game_id, |_, room| room.is_empty());
    }

    pub fn member(&self, conn: ConnectionId) -> Option<Member> {
        self.connections.get(&conn).map(|m| m.value().clone())
    }

    pub fn members(&self, game_id: GameId) -> Vec<ConnectionId> {
        self.rooms
            .get(&game_id)
            .map(|room| room.iter().map(|c| *c).collect())
            .unwrap_or_default()
    }

    pub fn room_size(&self, game_id: GameId) -> usize {
        self.rooms.get(&game_id).map(|room| room.len()).unwrap_or(0)
    }

    pub fn has_room(&self, game_id: GameId) -> bool {
        self.rooms.contains_key(&game_id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Sends to a single registered connection. A dead peer is deregistered.
    pub fn send_to(&self, conn: ConnectionId, message: ServerMessage) -> bool {
        let Some(outbox) = self.connections.get(&conn).map(|m| m.outbox.clone()) else {
            return false;
        };
        if outbox.send(message).is_err() {
            tracing::warn!(%conn, "peer gone, dropping connection");
            self.leave(conn);
            return false;
        }
        true
    }

    /// Best-effort delivery to every member of the room except `except`.
    /// Peers whose outbox is closed are deregistered; the rest still receive
    /// the message. Returns how many sends succeeded.
    pub fn broadcast(
        &self,
        game_id: GameId,
        message: &ServerMessage,
        except: Option<ConnectionId>,
    ) -> usize {
        let targets: Vec<(ConnectionId, Outbox)> = self
            .members(game_id)
            .into_iter()
            .filter(|conn| Some(*conn) != except)
            .filter_map(|conn| {
                self.connections
                    .get(&conn)
                    .filter(|m| m.game_id == game_id)
                    .map(|m| (conn, m.outbox.clone()))
            })
            .collect();

        let mut delivered = 0;
        let mut dead = Vec::new();
        for (conn, outbox) in targets {
            if outbox.send(message.clone()).is_ok() {
                delivered += 1;
            } else {
                dead.push(conn);
            }
        }
        for conn in dead {
            tracing::warn!(%conn, game_id, "peer gone during broadcast, dropping connection");
            self.leave(conn);
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn outbox() -> (Outbox, UnboundedReceiver<ServerMessage>) {
        mpsc::unbounded_channel()
    }

    #[test]
    fn leave_twice_only_removes_that_connection() {
        let registry = SessionRegistry::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let (tx_a, _rx_a) = outbox();
        let (tx_b, _rx_b) = outbox();
        registry.join(a, "alice", 1, tx_a);
        registry.join(b, "bob", 1, tx_b);

        assert!(registry.leave(a).is_some());
        assert!(registry.leave(a).is_none());
        assert_eq!(registry.members(1), vec![b]);
        assert!(registry.member(b).is_some());
    }

    #[test]
    fn empty_rooms_are_dropped() {
        let registry = SessionRegistry::new();
        let conn = Uuid::new_v4();
        let (tx, _rx) = outbox();
        registry.join(conn, "alice", 3, tx);
        assert!(registry.has_room(3));
        registry.leave(conn);
        assert!(!registry.has_room(3));
        assert_eq!(registry.connection_count(), 0);
    }

    #[test]
    fn joining_another_room_moves_the_connection() {
        let registry = SessionRegistry::new();
        let conn = Uuid::new_v4();
        let (tx, _rx) = outbox();
        registry.join(conn, "alice", 1, tx.clone());
        registry.join(conn, "alice", 2, tx);
        assert_eq!(registry.room_size(1), 0);
        assert_eq!(registry.members(2), vec![conn]);
        assert_eq!(registry.member(conn).unwrap().game_id, 2);
    }

    #[test]
    fn broadcast_skips_sender_and_other_rooms() {
        let registry = SessionRegistry::new();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let (tx_a, mut rx_a) = outbox();
        let (tx_b, mut rx_b) = outbox();
        let (tx_c, mut rx_c) = outbox();
        registry.join(a, "alice", 1, tx_a);
        registry.join(b, "bob", 1, tx_b);
        registry.join(c, "carol", 2, tx_c);

        let sent = registry.broadcast(1, &ServerMessage::notification("hello"), Some(a));
        assert_eq!(sent, 1);
        assert!(rx_a.try_recv().is_err());
        assert!(matches!(rx_b.try_recv(), Ok(ServerMessage::Notification { .. })));
        assert!(rx_c.try_recv().is_err());
    }

    #[test]
    fn dead_peer_is_dropped_without_blocking_others() {
        let registry = SessionRegistry::new();
        let (dead, alive) = (Uuid::new_v4(), Uuid::new_v4());
        let (tx_dead, rx_dead) = outbox();
        let (tx_alive, mut rx_alive) = outbox();
        registry.join(dead, "ghost", 1, tx_dead);
        registry.join(alive, "bob", 1, tx_alive);
        drop(rx_dead);

        let sent = registry.broadcast(1, &ServerMessage::notification("move"), None);
        assert_eq!(sent, 1);
        assert!(rx_alive.try_recv().is_ok());
        assert!(registry.member(dead).is_none());
        assert_eq!(registry.members(1), vec![alive]);
        assert!(!registry.send_to(dead, ServerMessage::notification("x")));
    }
}
