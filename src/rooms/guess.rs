use crate::{db::Message, error::GameResult};

use super::RoomRegistry;

/// Checks guesses against the room's word. Never writes.
#[derive(Clone)]
pub struct GuessEvaluator {
    rooms: RoomRegistry,
}

impl GuessEvaluator {
    pub fn new(rooms: RoomRegistry) -> GuessEvaluator {
        GuessEvaluator { rooms }
    }

    /// Exact, case-sensitive comparison with no trimming.
    pub fn is_match(word: &str, text: &str) -> bool {
        word == text
    }

    /// An unknown room counts as a room without a word.
    pub async fn evaluate(&self, mut msg: Message) -> GameResult<(bool, Message)> {
        let word = match msg.room_id() {
            Some(id) => self.rooms.get_room(id).await?.map(|room| room.word),
            None => None,
        };

        let found = word.is_some_and(|word| Self::is_match(&word, &msg.message));
        msg.find = found;
        Ok((found, msg))
    }
}
