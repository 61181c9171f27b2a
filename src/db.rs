use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

pub type RoomId = i64;
pub type RoomUserId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Room {
    #[serde(rename = "ID")]
    pub id: RoomId,
    #[serde(rename = "CreatedAt", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(rename = "UpdatedAt", with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(rename = "DeletedAt", with = "time::serde::rfc3339::option")]
    pub deleted_at: Option<OffsetDateTime>,

    pub name: String,
    pub creator: String,
    pub word: String,

    // unique: id
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RoomUser {
    #[serde(rename = "ID")]
    pub id: RoomUserId,
    #[serde(rename = "CreatedAt", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(rename = "UpdatedAt", with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(rename = "DeletedAt", with = "time::serde::rfc3339::option")]
    pub deleted_at: Option<OffsetDateTime>,

    #[serde(rename = "roomId")]
    pub room_id: RoomId,
    pub name: String,
    pub ip: String,

    // room_id is not a foreign key, orphans are fine
}

/// Chat line, guess or drawing stroke. Never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, deserialize_with = "room_key")]
    pub room: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub find: bool,
}

impl Message {
    /// The room this message targets, if `room` holds a numeric id.
    pub fn room_id(&self) -> Option<RoomId> {
        self.room.trim().parse().ok()
    }
}

/// Clients send the room both as `"3"` and `3`.
fn room_key<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Key {
        Text(String),
        Number(i64),
    }

    Ok(match Key::deserialize(deserializer)? {
        Key::Text(s) => s,
        Key::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn room_serializes_with_record_field_names() {
        let room = Room {
            id: 7,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
            deleted_at: None,
            name: "Animals".into(),
            creator: "abc".into(),
            word: String::new(),
        };
        let value = serde_json::to_value(&room).unwrap();
        assert_eq!(value["ID"], 7);
        assert_eq!(value["CreatedAt"], "1970-01-01T00:00:00Z");
        assert_eq!(value["DeletedAt"], serde_json::Value::Null);
        assert_eq!(value["name"], "Animals");
        assert_eq!(value["word"], "");
    }

    #[test]
    fn room_user_uses_camel_case_room_id() {
        let user = RoomUser {
            id: 1,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
            deleted_at: None,
            room_id: 7,
            name: "Bob".into(),
            ip: "10.0.0.2".into(),
        };
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["roomId"], 7);
        assert_eq!(value["ip"], "10.0.0.2");
    }

    #[test]
    fn message_accepts_numeric_room() {
        let msg: Message = serde_json::from_value(json!({"room": 12, "message": "cat"})).unwrap();
        assert_eq!(msg.room, "12");
        assert_eq!(msg.room_id(), Some(12));
        assert!(!msg.find);

        let msg: Message = serde_json::from_value(json!({"room": "lobby"})).unwrap();
        assert_eq!(msg.room_id(), None);
    }
}
