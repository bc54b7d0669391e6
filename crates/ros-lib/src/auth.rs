//! Resolution of the authenticated user

use crate::error::{Result, RosError};
use crate::models::User;
use async_trait::async_trait;

/// Resolves the user a view is loaded for; awaited before the first fetch
#[async_trait]
pub trait UserResolver: Send + Sync {
    async fn get_user(&self) -> Result<User>;
}

/// Resolver returning a user fixed at construction
#[derive(Debug, Clone)]
pub struct StaticUserResolver {
    user: User,
}

impl StaticUserResolver {
    pub fn new(user: User) -> Self {
        Self { user }
    }

    /// Resolver for `username`; fails on every call when the name is blank
    pub fn from_username(username: impl Into<String>) -> Self {
        Self::new(User {
            username: username.into(),
            org_id: None,
        })
    }
}

#[async_trait]
impl UserResolver for StaticUserResolver {
    async fn get_user(&self) -> Result<User> {
        if self.user.username.trim().is_empty() {
            return Err(RosError::Auth("no user configured".to_string()));
        }
        Ok(self.user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_user() {
        let resolver = StaticUserResolver::from_username("ops");
        let user = resolver.get_user().await.unwrap();
        assert_eq!(user.username, "ops");
        assert_eq!(user.org_id, None);
    }

    #[tokio::test]
    async fn test_blank_user_rejected() {
        let resolver = StaticUserResolver::from_username("  ");
        assert!(matches!(resolver.get_user().await, Err(RosError::Auth(_))));
    }
}
