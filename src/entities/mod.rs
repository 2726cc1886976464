pub mod prelude;

pub mod accesses;
pub mod api_keys;
pub mod chat_databases;
pub mod chats;
pub mod databases;
pub mod messages;
pub mod team_members;
pub mod teams;
pub mod users;
