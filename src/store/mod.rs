mod sqlite;

use std::{future::Future, time::Duration};

use async_trait::async_trait;

use crate::{db::{Room, RoomId, RoomUser}, error::{GameError, GameResult}};

pub use sqlite::SqliteStore;

/// Record store behind the room registry and the membership tracker.
///
/// Every read skips soft-deleted rows. Nothing here spans more than one statement.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn insert_room(&self, name: &str, creator: &str) -> Result<Room, sqlx::Error>;
    async fn rooms(&self) -> Result<Vec<Room>, sqlx::Error>;
    async fn room(&self, id: RoomId) -> Result<Option<Room>, sqlx::Error>;
    /// `None` when the room does not exist.
    async fn update_word(&self, id: RoomId, word: &str) -> Result<Option<Room>, sqlx::Error>;
    /// Returns whether a row was deleted.
    async fn delete_room(&self, id: RoomId) -> Result<bool, sqlx::Error>;

    async fn insert_member(&self, room_id: RoomId, name: &str, ip: &str) -> Result<RoomUser, sqlx::Error>;
    async fn members(&self, room_id: RoomId) -> Result<Vec<RoomUser>, sqlx::Error>;
    async fn delete_members_by_ip(&self, ip: &str) -> Result<u64, sqlx::Error>;
    async fn delete_members_by_ip_in(&self, ip: &str, rooms: &[RoomId]) -> Result<u64, sqlx::Error>;
    async fn delete_members_by_room(&self, room_id: RoomId) -> Result<u64, sqlx::Error>;
}

/// Runs a store call with an upper bound on how long it may take.
pub(crate) async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, sqlx::Error>>,
) -> GameResult<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(GameError::StoreTimeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn bounded_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, sqlx::Error>(())
        };
        let err = bounded(Duration::from_millis(10), slow).await.unwrap_err();
        assert!(matches!(err, GameError::StoreTimeout(_)));
    }

    #[tokio::test]
    async fn bounded_passes_store_errors_through() {
        let failing = async { Err::<(), _>(sqlx::Error::PoolClosed) };
        let err = bounded(Duration::from_secs(1), failing).await.unwrap_err();
        assert!(matches!(err, GameError::Store(sqlx::Error::PoolClosed)));
    }
}
