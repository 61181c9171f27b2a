pub mod event;
pub mod router;
pub mod ws;

use std::{collections::BTreeSet, net::IpAddr, sync::Arc, time::Duration};

use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    db::{Message, RoomId},
    error::{GameError, GameResult},
    identity,
    rooms::{GuessEvaluator, MembershipTracker, RoomRegistry, TurnSelector},
    store::Store,
};

use event::{ack_text, ClientEvent, ErrorPayload, Frame, JoinedRoom, RoomRef, ServerEvent, SingleRoom};
use router::{parse_room_group, room_group, BroadcastRouter, ConnId, Outbox, LOBBY};

/// Reply to `response` when the guess hit the word.
pub const FOUND_REPLY: &str = "Find";

/// Text of the `quit-room` notice, as existing clients expect it (typo included).
pub const QUIT_NOTICE: &str = "This room as been removed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// In the lobby only.
    Connected,
    InRoom(BTreeSet<RoomId>),
    Disconnected,
}

/// One socket's identity. Owned by the socket task; group membership lives in the router.
#[derive(Debug)]
pub struct Session {
    pub id: ConnId,
    pub addr: IpAddr,
    closed: bool,
}

/// Turns socket events into registry, membership and broadcast work.
#[derive(Clone)]
pub struct Coordinator {
    rooms: RoomRegistry,
    members: MembershipTracker,
    turns: TurnSelector,
    guesses: GuessEvaluator,
    router: Arc<BroadcastRouter>,
}

impl Coordinator {
    pub fn new(store: Arc<dyn Store>, store_timeout: Duration) -> Coordinator {
        let rooms = RoomRegistry::new(store.clone(), store_timeout);
        let members = MembershipTracker::new(store, store_timeout);

        Coordinator {
            turns: TurnSelector::new(members.clone()),
            guesses: GuessEvaluator::new(rooms.clone()),
            rooms,
            members,
            router: Arc::new(BroadcastRouter::new()),
        }
    }

    pub fn router(&self) -> &BroadcastRouter {
        &self.router
    }

    pub fn connect(&self, addr: IpAddr, outbox: Outbox) -> Session {
        let id = Uuid::now_v7();
        self.router.register(id, outbox);
        self.router.join_group(id, LOBBY);

        tracing::info!(conn = %id, %addr, playing = self.router.group_size(LOBBY), "client connected");

        Session { id, addr, closed: false }
    }

    /// Where this connection stands, read from its current room groups.
    pub fn state(&self, session: &Session) -> SessionState {
        if session.closed {
            return SessionState::Disconnected;
        }

        let rooms: BTreeSet<RoomId> = self.router
            .groups_of(session.id)
            .iter()
            .filter_map(|group| parse_room_group(group))
            .collect();
        if rooms.is_empty() {
            SessionState::Connected
        } else {
            SessionState::InRoom(rooms)
        }
    }

    /// Handles one text frame from the socket.
    pub async fn receive(&self, session: &mut Session, text: &str) {
        let frame: Frame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(source) => {
                let err = GameError::BadPayload { event: "frame".to_owned(), source };
                return self.reject(session, None, &err);
            }
        };

        match ClientEvent::decode(&frame.event, frame.data) {
            Ok(event) => self.dispatch(session, event, frame.ack).await,
            Err(err) => self.reject(session, frame.ack, &err),
        }
    }

    pub async fn dispatch(&self, session: &mut Session, event: ClientEvent, ack: Option<u64>) {
        let name = event.name();
        tracing::debug!(conn = %session.id, event = name, "dispatch");

        match self.handle(session, event).await {
            Ok(reply) => {
                let Some(ack) = ack else {
                    return;
                };
                match ack_text(ack, &reply) {
                    Ok(text) => {
                        self.router.send_to(session.id, text);
                    }
                    Err(err) => self.reject(session, Some(ack), &err.into()),
                }
            }
            Err(err) => {
                tracing::warn!(conn = %session.id, event = name, %err, "handler failed");
                self.reject(session, ack, &err);
            }
        }
    }

    /// Sends an `error` event to this connection only.
    pub fn reject(&self, session: &Session, ack: Option<u64>, err: &GameError) {
        let event = ServerEvent::Error(ErrorPayload::new(err, ack));
        match event.to_text() {
            Ok(text) => {
                self.router.send_to(session.id, text);
            }
            Err(err) => tracing::warn!(conn = %session.id, %err, "could not encode error event"),
        }
    }

    async fn handle(&self, session: &mut Session, event: ClientEvent) -> GameResult<Value> {
        if session.closed {
            return Err(GameError::Invalid("connection is closed"));
        }

        use ClientEvent::*;
        match event {
            CreateRoom(req) => self.create_room(session, req).await,
            JoinRoom(req) => self.join_room(session, req).await,
            Response(msg) => self.response(msg).await,
            GetRoom => Ok(serde_json::to_value(self.rooms.list_rooms().await?)?),
            RoomUsers(JoinedRoom { id, .. }) => Ok(serde_json::to_value(self.members.list_members(id).await?)?),
            GetTurn(JoinedRoom { id, .. }) => self.get_turn(id).await,
            SetWord(msg) => self.set_word(msg).await,
            SendImage(msg) => self.send_image(msg),
            DeleteRoom(RoomRef { id }) => self.delete_room(id).await,
            Whoami(msg) => {
                let id = numeric_room(&msg)?;
                let room = self.rooms.get_room(id).await?.ok_or(GameError::RoomNotFound(id))?;
                Ok(serde_json::to_value(room)?)
            }
        }
    }

    async fn create_room(&self, session: &Session, SingleRoom { name, .. }: SingleRoom) -> GameResult<Value> {
        if name.trim().is_empty() {
            return Err(GameError::Invalid("room name is required"));
        }

        let creator = identity::creator_token(&session.addr);
        let room = self.rooms.create_room(&name, &creator).await?;
        tracing::info!(room = room.id, name = %room.name, "room created");

        Ok(serde_json::to_value(room)?)
    }

    async fn join_room(&self, session: &mut Session, req: JoinedRoom) -> GameResult<Value> {
        let group = room_group(req.id);

        self.members.join(req.id, &req.username, &session.addr).await?;
        self.router.join_group(session.id, &group);

        let members = self.members.list_members(req.id).await?;
        self.router.broadcast(&group, &ServerEvent::NewUser(members));

        Ok(Value::String(group))
    }

    async fn response(&self, msg: Message) -> GameResult<Value> {
        let (found, msg) = self.guesses.evaluate(msg).await?;
        let group = message_group(&msg);
        self.router.broadcast(&group, &ServerEvent::Message(msg));

        Ok(Value::String(if found { FOUND_REPLY.to_owned() } else { group }))
    }

    async fn get_turn(&self, room: RoomId) -> GameResult<Value> {
        let picked: Vec<_> = self.turns.pick_turn(room).await?.into_iter().collect();
        if !picked.is_empty() {
            self.router.broadcast(&room_group(room), &ServerEvent::SetTurn(picked.clone()));
        }

        Ok(serde_json::to_value(picked)?)
    }

    async fn set_word(&self, msg: Message) -> GameResult<Value> {
        let id = numeric_room(&msg)?;
        let room = self.rooms
            .set_word(id, &msg.message)
            .await?
            .ok_or(GameError::RoomNotFound(id))?;
        self.router.broadcast(&room_group(id), &ServerEvent::BeginTurn(room));

        Ok(serde_json::to_value(msg)?)
    }

    fn send_image(&self, msg: Message) -> GameResult<Value> {
        let reply = serde_json::to_value(&msg)?;
        self.router.broadcast(&message_group(&msg), &ServerEvent::EmitDraw(msg));
        Ok(reply)
    }

    /// Deletes first, so members are only told once the room is really gone.
    /// Deleting a room that is already gone replies the same and tells nobody.
    async fn delete_room(&self, id: RoomId) -> GameResult<Value> {
        if !self.rooms.delete_room(id).await? {
            tracing::debug!(room = id, "delete of missing room");
            return Ok(json!([]));
        }

        let group = room_group(id);
        let notice = Message {
            room: id.to_string(),
            name: "Creator".to_owned(),
            message: QUIT_NOTICE.to_owned(),
            ..Message::default()
        };
        self.router.broadcast(&group, &ServerEvent::QuitRoom(notice));
        let kicked = self.router.drop_group(&group);

        let vacated = self.members.remove_by_room(id).await?;
        tracing::info!(room = id, vacated, kicked = kicked.len(), "room deleted");

        Ok(json!([]))
    }

    /// Leaves every group and drops this address's memberships in the rooms it had joined.
    pub async fn disconnect(&self, session: &mut Session) {
        session.closed = true;

        let rooms: Vec<RoomId> = self.router
            .unregister(session.id)
            .iter()
            .filter_map(|group| parse_room_group(group))
            .collect();

        match self.members.remove_by_address_in_rooms(&session.addr, &rooms).await {
            Ok(removed) => tracing::info!(conn = %session.id, addr = %session.addr, removed, "client disconnected"),
            Err(err) => tracing::warn!(conn = %session.id, addr = %session.addr, %err, "membership cleanup failed"),
        }
    }
}

/// Group a message goes to. Numeric rooms use the same id the store lookup used.
fn message_group(msg: &Message) -> String {
    match msg.room_id() {
        Some(id) => room_group(id),
        None => room_group(&msg.room),
    }
}

fn numeric_room(msg: &Message) -> GameResult<RoomId> {
    msg.room_id().ok_or(GameError::Invalid("room must be a numeric id"))
}
