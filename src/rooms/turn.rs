use rand::{Rng, seq::IndexedRandom};

use crate::{db::{RoomId, RoomUser}, error::GameResult};

use super::MembershipTracker;

/// Picks who sets the word next. Announcing the pick is left to the caller.
#[derive(Clone)]
pub struct TurnSelector {
    members: MembershipTracker,
}

impl TurnSelector {
    pub fn new(members: MembershipTracker) -> TurnSelector {
        TurnSelector { members }
    }

    /// Uniform pick over `members`. `None` for an empty room.
    pub fn select<'a, R: Rng + ?Sized>(members: &'a [RoomUser], rng: &mut R) -> Option<&'a RoomUser> {
        members.choose(rng)
    }

    pub async fn pick_turn(&self, room_id: RoomId) -> GameResult<Option<RoomUser>> {
        let members = self.members.list_members(room_id).await?;
        Ok(Self::select(&members, &mut rand::rng()).cloned())
    }
}
