mod guess;
mod membership;
mod registry;
mod turn;

pub use guess::GuessEvaluator;
pub use membership::MembershipTracker;
pub use registry::RoomRegistry;
pub use turn::TurnSelector;

pub use crate::db::{Message, Room, RoomId, RoomUser};
