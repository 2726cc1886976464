pub use super::accesses::Entity as Accesses;
pub use super::api_keys::Entity as ApiKeys;
pub use super::chat_databases::Entity as ChatDatabases;
pub use super::chats::Entity as Chats;
pub use super::databases::Entity as Databases;
pub use super::messages::Entity as Messages;
pub use super::team_members::Entity as TeamMembers;
pub use super::teams::Entity as Teams;
pub use super::users::Entity as Users;
