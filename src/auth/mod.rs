pub mod api_key;
pub mod identity;
pub mod password;

pub use identity::{ActorContext, Identity, Role};
