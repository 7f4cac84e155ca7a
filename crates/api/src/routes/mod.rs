pub mod auth;
pub mod room;
