//! HTTP handlers

pub mod friendships;
pub mod users;
