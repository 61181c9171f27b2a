use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{db::{Message, Room, RoomId, RoomUser}, error::{GameError, GameResult}};

/// A text frame as it comes off the socket, before the event name is trusted.
#[derive(Debug, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub ack: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SingleRoom {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub creator: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinedRoom {
    pub id: RoomId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub creator: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomRef {
    #[serde(rename = "ID", alias = "id")]
    pub id: RoomId,
}

/// Everything a client may ask for.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    CreateRoom(SingleRoom),
    JoinRoom(JoinedRoom),
    Response(Message),
    GetRoom,
    RoomUsers(JoinedRoom),
    GetTurn(JoinedRoom),
    SetWord(Message),
    SendImage(Message),
    DeleteRoom(RoomRef),
    Whoami(Message),
}

impl ClientEvent {
    pub fn decode(event: &str, data: Value) -> GameResult<ClientEvent> {
        fn payload<T: DeserializeOwned>(event: &str, data: Value) -> GameResult<T> {
            serde_json::from_value(data).map_err(|source| GameError::BadPayload {
                event: event.to_owned(),
                source,
            })
        }

        use ClientEvent::*;
        Ok(match event {
            "create-room" => CreateRoom(payload(event, data)?),
            "join-room" => JoinRoom(payload(event, data)?),
            "response" => Response(payload(event, data)?),
            "get-room" => GetRoom,
            "room-users" => RoomUsers(payload(event, data)?),
            "get-turn" => GetTurn(payload(event, data)?),
            "set-word" => SetWord(payload(event, data)?),
            "send-image" => SendImage(payload(event, data)?),
            "delete-room" => DeleteRoom(payload(event, data)?),
            "whoami" => Whoami(payload(event, data)?),
            other => return Err(GameError::UnknownEvent(other.to_owned())),
        })
    }

    pub fn name(&self) -> &'static str {
        use ClientEvent::*;
        match self {
            CreateRoom(_) => "create-room",
            JoinRoom(_) => "join-room",
            Response(_) => "response",
            GetRoom => "get-room",
            RoomUsers(_) => "room-users",
            GetTurn(_) => "get-turn",
            SetWord(_) => "set-word",
            SendImage(_) => "send-image",
            DeleteRoom(_) => "delete-room",
            Whoami(_) => "whoami",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ack: Option<u64>,
}

impl ErrorPayload {
    pub fn new(err: &GameError, ack: Option<u64>) -> ErrorPayload {
        ErrorPayload {
            kind: err.kind(),
            message: err.to_string(),
            ack,
        }
    }
}

/// What the server pushes, to a group or to one connection.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    NewUser(Vec<RoomUser>),
    SetTurn(Vec<RoomUser>),
    Message(Message),
    BeginTurn(Room),
    EmitDraw(Message),
    QuitRoom(Message),
    Error(ErrorPayload),
}

impl ServerEvent {
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Serialize)]
struct Ack<'a> {
    event: &'static str,
    ack: u64,
    data: &'a Value,
}

/// Direct answer to the request that carried `ack`.
pub fn ack_text(ack: u64, data: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string(&Ack { event: "ack", ack, data })
}
