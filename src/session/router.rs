use std::{
    collections::{HashMap, HashSet},
    fmt::Display,
    sync::{Mutex, MutexGuard, PoisonError},
};

use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::db::RoomId;

use super::event::ServerEvent;

/// Group every connection joins on connect.
pub const LOBBY: &str = "guesswhat";
const ROOM_GROUP_PREFIX: &str = "chat-room/";

pub type ConnId = Uuid;
pub type Outbox = mpsc::Sender<String>;

/// Frames a connection may have queued before broadcasts to it start being dropped.
pub const OUTBOX_CAPACITY: usize = 64;

pub fn room_group(room: impl Display) -> String {
    format!("{ROOM_GROUP_PREFIX}{room}")
}

pub fn parse_room_group(group: &str) -> Option<RoomId> {
    group.strip_prefix(ROOM_GROUP_PREFIX)?.parse().ok()
}

#[derive(Default)]
struct Groups {
    outboxes: HashMap<ConnId, Outbox>,
    members: HashMap<String, HashSet<ConnId>>,
}

/// Transport-level fan-out. Knows connections and groups, nothing about the store.
///
/// Delivery is fire-and-forget: a connection whose outbox is gone or full is skipped.
/// Each connection's outbox is FIFO, so one connection sees broadcasts in call order.
#[derive(Default)]
pub struct BroadcastRouter {
    groups: Mutex<Groups>,
}

impl BroadcastRouter {
    pub fn new() -> BroadcastRouter {
        BroadcastRouter::default()
    }

    fn lock(&self) -> MutexGuard<'_, Groups> {
        self.groups.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, conn: ConnId, outbox: Outbox) {
        self.lock().outboxes.insert(conn, outbox);
    }

    /// Forgets the connection and returns the groups it was still in.
    pub fn unregister(&self, conn: ConnId) -> Vec<String> {
        let mut groups = self.lock();
        groups.outboxes.remove(&conn);

        let mut left = Vec::new();
        groups.members.retain(|name, members| {
            if members.remove(&conn) {
                left.push(name.clone());
            }
            !members.is_empty()
        });
        left
    }

    pub fn join_group(&self, conn: ConnId, group: &str) {
        self.lock()
            .members
            .entry(group.to_owned())
            .or_default()
            .insert(conn);
    }

    pub fn leave_group(&self, conn: ConnId, group: &str) {
        let mut groups = self.lock();
        if let Some(members) = groups.members.get_mut(group) {
            members.remove(&conn);
            if members.is_empty() {
                groups.members.remove(group);
            }
        }
    }

    /// Empties a group, returning who was in it.
    pub fn drop_group(&self, group: &str) -> Vec<ConnId> {
        self.lock()
            .members
            .remove(group)
            .map(|members| members.into_iter().collect())
            .unwrap_or_default()
    }

    pub fn group_size(&self, group: &str) -> usize {
        self.lock().members.get(group).map_or(0, HashSet::len)
    }

    pub fn is_member(&self, conn: ConnId, group: &str) -> bool {
        self.lock()
            .members
            .get(group)
            .is_some_and(|members| members.contains(&conn))
    }

    pub fn groups_of(&self, conn: ConnId) -> Vec<String> {
        self.lock()
            .members
            .iter()
            .filter(|(_, members)| members.contains(&conn))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Sends `event` to everyone currently in `group`. Returns how many outboxes took it.
    pub fn broadcast(&self, group: &str, event: &ServerEvent) -> usize {
        let text = match event.to_text() {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(group, %err, "dropping unencodable broadcast");
                return 0;
            }
        };

        let groups = self.lock();
        let Some(members) = groups.members.get(group) else {
            return 0;
        };

        members
            .iter()
            .filter(|conn| match groups.outboxes.get(*conn) {
                Some(outbox) => deliver(**conn, outbox, text.clone()),
                None => false,
            })
            .count()
    }

    pub fn send_to(&self, conn: ConnId, text: String) -> bool {
        self.lock()
            .outboxes
            .get(&conn)
            .is_some_and(|outbox| deliver(conn, outbox, text))
    }
}

fn deliver(conn: ConnId, outbox: &Outbox, text: String) -> bool {
    match outbox.try_send(text) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::debug!(%conn, "outbox full, frame dropped");
            false
        }
        Err(TrySendError::Closed(_)) => false,
    }
}
