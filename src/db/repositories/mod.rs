pub mod access;
pub mod api_key;
pub mod chat;
pub mod database;
pub mod team;
pub mod user;
