use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::accounts::repo_types::{NewUser, User};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("username already taken")]
    DuplicateUsername,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence for user profiles. Usernames are unique case-insensitively.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    /// Fails with [`StoreError::DuplicateUsername`] if the name is taken.
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError>;
    async fn record_login(&self, id: Uuid, at: OffsetDateTime) -> Result<(), StoreError>;
    /// Invalidates every session token issued to the user so far.
    async fn revoke_sessions(&self, id: Uuid) -> Result<(), StoreError>;
    async fn count(&self) -> Result<i64, StoreError>;
    fn backend(&self) -> &'static str;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        // SELECT * so optional extension columns fall back to their defaults
        let user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT *
            FROM users
            WHERE lower(username) = lower($1)
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, date_of_birth)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.date_of_birth)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateUsername
            } else {
                StoreError::Database(e)
            }
        })
    }

    async fn record_login(&self, id: Uuid, at: OffsetDateTime) -> Result<(), StoreError> {
        sqlx::query(r#"UPDATE users SET last_login = $2 WHERE id = $1"#)
            .bind(id)
            .bind(at)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn revoke_sessions(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query(r#"UPDATE users SET session_epoch = session_epoch + 1 WHERE id = $1"#)
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let (n,): (i64,) = sqlx::query_as(r#"SELECT COUNT(*) FROM users"#)
            .fetch_one(&self.db)
            .await?;
        Ok(n)
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

/// Process-local store for development without a database, and for tests.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn set_active(&self, id: Uuid, active: bool) {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.is_active = active;
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let wanted = username.to_lowercase();
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.username.to_lowercase() == wanted)
            .cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        // check and insert under one write lock
        // same folding as lower() in postgres, not ASCII-only
        let wanted = new_user.username.to_lowercase();
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username.to_lowercase() == wanted) {
            return Err(StoreError::DuplicateUsername);
        }
        let user = User {
            id: Uuid::new_v4(),
            password_hash: new_user.password_hash,
            last_login: None,
            is_superuser: false,
            username: new_user.username,
            first_name: String::new(),
            last_name: String::new(),
            email: new_user.email,
            is_staff: false,
            is_active: true,
            date_joined: OffsetDateTime::now_utc(),
            date_of_birth: new_user.date_of_birth,
            session_epoch: 0,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn record_login(&self, id: Uuid, at: OffsetDateTime) -> Result<(), StoreError> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.last_login = Some(at);
        }
        Ok(())
    }

    async fn revoke_sessions(&self, id: Uuid) -> Result<(), StoreError> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.session_epoch += 1;
        }
        Ok(())
    }

    async fn count(&self) -> Result<i64, StoreError> {
        Ok(self.users.read().await.len() as i64)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
