//! Request identity, resolved once per request into a normalized
//! [`ActorContext`] that handlers read from request extensions.

use serde::{Deserialize, Serialize};

use crate::db::repositories::api_key::ApiKeyRecord;
use crate::db::repositories::user::User;

pub const WILDCARD_SCOPE: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s == "admin" { Self::Admin } else { Self::User }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

/// How the caller proved who they are.
#[derive(Debug, Clone)]
pub enum Identity {
    Session { user: User },
    ApiKey { key: ApiKeyRecord },
}

/// Normalized authorization context for a single request.
#[derive(Debug, Clone)]
pub struct ActorContext {
    pub user_id: Option<i32>,
    pub role: Option<Role>,
    pub team_id: Option<i32>,
    pub api_key_id: Option<i32>,
    pub permissions: Vec<String>,
}

impl ActorContext {
    #[must_use]
    pub fn resolve(identity: Identity) -> Self {
        match identity {
            Identity::Session { user } => Self {
                user_id: Some(user.id),
                role: Some(Role::parse(&user.role)),
                team_id: None,
                api_key_id: None,
                // Interactive logins are scoped by role checks, not key scopes
                permissions: vec![WILDCARD_SCOPE.to_string()],
            },
            Identity::ApiKey { key } => Self {
                user_id: None,
                role: None,
                team_id: Some(key.team_id),
                api_key_id: Some(key.id),
                permissions: key.permissions,
            },
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }

    /// Set-membership scope check with wildcard.
    #[must_use]
    pub fn has_permission(&self, required: &str) -> bool {
        self.permissions
            .iter()
            .any(|p| p == WILDCARD_SCOPE || p == required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_actor(permissions: Vec<&str>) -> ActorContext {
        ActorContext {
            user_id: None,
            role: None,
            team_id: Some(1),
            api_key_id: Some(7),
            permissions: permissions.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn test_scope_membership() {
        let actor = key_actor(vec!["query:read"]);
        assert!(actor.has_permission("query:read"));
        assert!(!actor.has_permission("query:write"));
    }

    #[test]
    fn test_wildcard_grants_all() {
        let actor = key_actor(vec!["*"]);
        assert!(actor.has_permission("query:read"));
        assert!(actor.has_permission("anything:else"));
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("admin"), Role::Admin);
        assert_eq!(Role::parse("user"), Role::User);
        assert_eq!(Role::parse("garbage"), Role::User);
    }
}
