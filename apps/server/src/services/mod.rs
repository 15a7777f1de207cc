//! Business logic layer

pub mod friendships;
pub mod users;

pub use friendships::FriendshipService;
pub use users::UserService;
