use std::{sync::Arc, time::Duration};

use crate::{db::{Room, RoomId}, error::GameResult, store::{bounded, Store}};

/// Rooms: create, list, fetch, set the word, delete.
#[derive(Clone)]
pub struct RoomRegistry {
    store: Arc<dyn Store>,
    timeout: Duration,
}

impl RoomRegistry {
    pub fn new(store: Arc<dyn Store>, timeout: Duration) -> RoomRegistry {
        RoomRegistry { store, timeout }
    }

    pub async fn create_room(&self, name: &str, creator: &str) -> GameResult<Room> {
        bounded(self.timeout, self.store.insert_room(name, creator)).await
    }

    /// Lobby listing, oldest room first.
    pub async fn list_rooms(&self) -> GameResult<Vec<Room>> {
        bounded(self.timeout, self.store.rooms()).await
    }

    pub async fn get_room(&self, id: RoomId) -> GameResult<Option<Room>> {
        bounded(self.timeout, self.store.room(id)).await
    }

    /// No-op on an unknown id: returns `None` instead of creating anything.
    pub async fn set_word(&self, id: RoomId, word: &str) -> GameResult<Option<Room>> {
        bounded(self.timeout, self.store.update_word(id, word)).await
    }

    /// Removes the room record only. Memberships are the tracker's business.
    pub async fn delete_room(&self, id: RoomId) -> GameResult<bool> {
        bounded(self.timeout, self.store.delete_room(id)).await
    }
}

#[cfg(test)]
mod tests {
    use crate::store::SqliteStore;

    use super::*;

    async fn registry() -> RoomRegistry {
        let store = SqliteStore::in_memory().await.unwrap();
        RoomRegistry::new(Arc::new(store), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn create_then_get() {
        let rooms = registry().await;
        let room = rooms.create_room("Animals", "tok").await.unwrap();

        assert_eq!(room.name, "Animals");
        assert_eq!(room.creator, "tok");
        assert_eq!(room.word, "");
        assert_eq!(rooms.get_room(room.id).await.unwrap(), Some(room));
    }

    #[tokio::test]
    async fn names_need_not_be_unique() {
        let rooms = registry().await;
        rooms.create_room("Same", "a").await.unwrap();
        rooms.create_room("Same", "b").await.unwrap();
        assert_eq!(rooms.list_rooms().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn set_word_reads_back() {
        let rooms = registry().await;
        let room = rooms.create_room("Animals", "tok").await.unwrap();

        for word in ["cat", "Dog", " spaced ", ""] {
            let updated = rooms.set_word(room.id, word).await.unwrap().unwrap();
            assert_eq!(updated.word, word);
            assert_eq!(rooms.get_room(room.id).await.unwrap().unwrap().word, word);
        }
    }

    #[tokio::test]
    async fn set_word_on_unknown_room_is_silent() {
        let rooms = registry().await;
        assert_eq!(rooms.set_word(404, "cat").await.unwrap(), None);
        assert!(rooms.list_rooms().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_removes_from_listing() {
        let rooms = registry().await;
        let keep = rooms.create_room("Keep", "tok").await.unwrap();
        let gone = rooms.create_room("Gone", "tok").await.unwrap();

        assert!(rooms.delete_room(gone.id).await.unwrap());
        assert_eq!(rooms.get_room(gone.id).await.unwrap(), None);
        assert_eq!(rooms.list_rooms().await.unwrap(), vec![keep]);
    }
}
