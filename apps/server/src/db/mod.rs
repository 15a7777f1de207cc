//! Database layer - repositories and data access

pub mod friendships;
pub mod render;
pub mod traits;
pub mod users;

pub use friendships::FriendshipRepository;
pub use traits::UserDirectory;
pub use users::UserRepository;
