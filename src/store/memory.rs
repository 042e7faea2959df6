//! In-memory store backed by a `HashMap`, for tests and local hacking.

use crate::store::{NewUser, StoreError, StoreResult, User, UserStore};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_username(&self, username: &str) -> StoreResult<User> {
        let users = self.users.read().await;

        users
            .values()
            .find(|user| user.username == username)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut users = self.users.write().await;

        let taken = users
            .values()
            .any(|existing| existing.username == user.username || existing.email == user.email);
        if taken {
            return Err(StoreError::Conflict);
        }

        let user = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
        };

        users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Role;
    use anyhow::Result;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "$2b$04$stub".to_string(),
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn test_insert_then_find() -> Result<()> {
        let store = MemoryStore::new();

        let created = store.insert_user(new_user("ana", "ana@example.com")).await?;
        let found = store.find_by_username("ana").await?;

        assert_eq!(found.id, created.id);
        assert_eq!(found.email, "ana@example.com");
        assert_eq!(found.role, Role::User);

        Ok(())
    }

    #[tokio::test]
    async fn test_find_unknown_is_not_found() {
        let store = MemoryStore::new();

        let result = store.find_by_username("ghost").await;

        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() -> Result<()> {
        let store = MemoryStore::new();

        store.insert_user(new_user("ana", "ana@example.com")).await?;
        let result = store.insert_user(new_user("ana", "other@example.com")).await;

        assert!(matches!(result, Err(StoreError::Conflict)));

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() -> Result<()> {
        let store = MemoryStore::new();

        store.insert_user(new_user("ana", "ana@example.com")).await?;
        let result = store.insert_user(new_user("bob", "ana@example.com")).await;

        assert!(matches!(result, Err(StoreError::Conflict)));

        Ok(())
    }

    #[tokio::test]
    async fn test_health_check_always_ok() {
        let store = MemoryStore::new();

        assert!(store.health_check().await.is_ok());
    }
}
