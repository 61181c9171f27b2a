use std::{net::IpAddr, sync::Arc, time::Duration};

use crate::{db::{RoomId, RoomUser}, error::GameResult, store::{bounded, Store}};

/// Who sits in which room, keyed by the joining connection's address.
#[derive(Clone)]
pub struct MembershipTracker {
    store: Arc<dyn Store>,
    timeout: Duration,
}

impl MembershipTracker {
    pub fn new(store: Arc<dyn Store>, timeout: Duration) -> MembershipTracker {
        MembershipTracker { store, timeout }
    }

    /// Always inserts. Joining twice gives two records.
    pub async fn join(&self, room_id: RoomId, username: &str, addr: &IpAddr) -> GameResult<RoomUser> {
        let ip = addr.to_string();
        bounded(self.timeout, self.store.insert_member(room_id, username, &ip)).await
    }

    pub async fn list_members(&self, room_id: RoomId) -> GameResult<Vec<RoomUser>> {
        bounded(self.timeout, self.store.members(room_id)).await
    }

    /// Every record from this address, in every room.
    pub async fn remove_by_address(&self, addr: &IpAddr) -> GameResult<u64> {
        let ip = addr.to_string();
        bounded(self.timeout, self.store.delete_members_by_ip(&ip)).await
    }

    /// Records from this address, limited to `rooms`.
    pub async fn remove_by_address_in_rooms(&self, addr: &IpAddr, rooms: &[RoomId]) -> GameResult<u64> {
        let ip = addr.to_string();
        bounded(self.timeout, self.store.delete_members_by_ip_in(&ip, rooms)).await
    }

    pub async fn remove_by_room(&self, room_id: RoomId) -> GameResult<u64> {
        bounded(self.timeout, self.store.delete_members_by_room(room_id)).await
    }
}

#[cfg(test)]
mod tests {
    use crate::store::SqliteStore;

    use super::*;

    async fn tracker() -> MembershipTracker {
        let store = SqliteStore::in_memory().await.unwrap();
        MembershipTracker::new(Arc::new(store), Duration::from_secs(5))
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn join_records_name_and_address() {
        let members = tracker().await;
        let user = members.join(3, "Bob", &ip("10.0.0.2")).await.unwrap();

        assert_eq!(user.room_id, 3);
        assert_eq!(user.name, "Bob");
        assert_eq!(user.ip, "10.0.0.2");
        assert_eq!(members.list_members(3).await.unwrap(), vec![user]);
    }

    #[tokio::test]
    async fn double_join_gives_two_records() {
        let members = tracker().await;
        members.join(3, "Bob", &ip("10.0.0.2")).await.unwrap();
        members.join(3, "Bob", &ip("10.0.0.2")).await.unwrap();
        assert_eq!(members.list_members(3).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn remove_by_address_spans_rooms() {
        let members = tracker().await;
        members.join(1, "Ann", &ip("10.0.0.1")).await.unwrap();
        members.join(2, "Ann", &ip("10.0.0.1")).await.unwrap();
        members.join(2, "Bob", &ip("10.0.0.2")).await.unwrap();

        assert_eq!(members.remove_by_address(&ip("10.0.0.1")).await.unwrap(), 2);
        for room in [1, 2] {
            let left = members.list_members(room).await.unwrap();
            assert!(left.iter().all(|u| u.ip != "10.0.0.1"));
        }
        assert_eq!(members.list_members(2).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn remove_by_room_clears_only_that_room() {
        let members = tracker().await;
        members.join(1, "Ann", &ip("10.0.0.1")).await.unwrap();
        members.join(2, "Bob", &ip("10.0.0.2")).await.unwrap();

        assert_eq!(members.remove_by_room(1).await.unwrap(), 1);
        assert!(members.list_members(1).await.unwrap().is_empty());
        assert_eq!(members.list_members(2).await.unwrap().len(), 1);
    }
}
