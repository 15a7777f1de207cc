//! Domain models

pub mod friendship;
pub mod user;

pub use friendship::{FriendRequestView, Friendship, FriendshipStatus, RelationshipView};
pub use user::{User, UserSummary};
