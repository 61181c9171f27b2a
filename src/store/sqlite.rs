use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool, sqlite::SqlitePoolOptions};
use time::OffsetDateTime;

use crate::db::{Room, RoomId, RoomUser};

use super::Store;

const ROOM_COLUMNS: &str = "id,created_at,updated_at,deleted_at,name,creator,word";
const ROOM_USER_COLUMNS: &str = "id,created_at,updated_at,deleted_at,room_id,name,ip";

const SCHEMA: [&str; 4] = [
    "CREATE TABLE IF NOT EXISTS rooms (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        created_at DATETIME NOT NULL,
        updated_at DATETIME NOT NULL,
        deleted_at DATETIME,
        name TEXT NOT NULL,
        creator TEXT NOT NULL,
        word TEXT NOT NULL DEFAULT ''
    )",
    "CREATE TABLE IF NOT EXISTS room_users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        created_at DATETIME NOT NULL,
        updated_at DATETIME NOT NULL,
        deleted_at DATETIME,
        room_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        ip TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_room_users_room_id ON room_users (room_id)",
    "CREATE INDEX IF NOT EXISTS idx_room_users_ip ON room_users (ip)",
];

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqliteStore, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        let store = SqliteStore { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Private database that lives as long as the store. Every pooled connection to
    /// `sqlite::memory:` is its own database, so the pool is pinned to one.
    pub async fn in_memory() -> Result<SqliteStore, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let store = SqliteStore { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_room(&self, name: &str, creator: &str) -> Result<Room, sqlx::Error> {
        let now = OffsetDateTime::now_utc();
        sqlx::query_as(&format!(
            "INSERT INTO rooms (created_at,updated_at,name,creator,word) VALUES (?,?,?,?,'') RETURNING {ROOM_COLUMNS}"
        ))
            .bind(now)
            .bind(now)
            .bind(name)
            .bind(creator)
            .fetch_one(&self.pool)
            .await
    }

    async fn rooms(&self) -> Result<Vec<Room>, sqlx::Error> {
        sqlx::query_as(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE deleted_at IS NULL ORDER BY id"))
            .fetch_all(&self.pool)
            .await
    }

    async fn room(&self, id: RoomId) -> Result<Option<Room>, sqlx::Error> {
        sqlx::query_as(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id=? AND deleted_at IS NULL"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn update_word(&self, id: RoomId, word: &str) -> Result<Option<Room>, sqlx::Error> {
        sqlx::query_as(&format!(
            "UPDATE rooms SET word=?, updated_at=? WHERE id=? AND deleted_at IS NULL RETURNING {ROOM_COLUMNS}"
        ))
            .bind(word)
            .bind(OffsetDateTime::now_utc())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn delete_room(&self, id: RoomId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE rooms SET deleted_at=? WHERE id=? AND deleted_at IS NULL")
            .bind(OffsetDateTime::now_utc())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_member(&self, room_id: RoomId, name: &str, ip: &str) -> Result<RoomUser, sqlx::Error> {
        let now = OffsetDateTime::now_utc();
        sqlx::query_as(&format!(
            "INSERT INTO room_users (created_at,updated_at,room_id,name,ip) VALUES (?,?,?,?,?) RETURNING {ROOM_USER_COLUMNS}"
        ))
            .bind(now)
            .bind(now)
            .bind(room_id)
            .bind(name)
            .bind(ip)
            .fetch_one(&self.pool)
            .await
    }

    async fn members(&self, room_id: RoomId) -> Result<Vec<RoomUser>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {ROOM_USER_COLUMNS} FROM room_users WHERE room_id=? AND deleted_at IS NULL ORDER BY id"
        ))
            .bind(room_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn delete_members_by_ip(&self, ip: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE room_users SET deleted_at=? WHERE ip=? AND deleted_at IS NULL")
            .bind(OffsetDateTime::now_utc())
            .bind(ip)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_members_by_ip_in(&self, ip: &str, rooms: &[RoomId]) -> Result<u64, sqlx::Error> {
        if rooms.is_empty() {
            return Ok(0);
        }

        let mut query = QueryBuilder::<Sqlite>::new("UPDATE room_users SET deleted_at=");
        query
            .push_bind(OffsetDateTime::now_utc())
            .push(" WHERE deleted_at IS NULL AND ip=")
            .push_bind(ip)
            .push(" AND room_id IN (");
        let mut ids = query.separated(",");
        for id in rooms {
            ids.push_bind(*id);
        }
        ids.push_unseparated(")");

        let result = query.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn delete_members_by_room(&self, room_id: RoomId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE room_users SET deleted_at=? WHERE room_id=? AND deleted_at IS NULL")
            .bind(OffsetDateTime::now_utc())
            .bind(room_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
