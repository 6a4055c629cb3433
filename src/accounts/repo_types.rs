use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub password_hash: String,            // Argon2 PHC string, never rendered
    pub last_login: Option<OffsetDateTime>,
    pub is_superuser: bool,
    pub username: String,
    #[sqlx(default)]
    pub first_name: String,
    #[sqlx(default)]
    pub last_name: String,
    pub email: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub date_joined: OffsetDateTime,
    // older schemas predate this column
    #[sqlx(default)]
    pub date_of_birth: Option<Date>,
    #[sqlx(default)]
    pub session_epoch: i64, // bumped on logout; tokens carry the value they were issued with
}

/// Validated signup data, ready to be persisted.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub date_of_birth: Option<Date>,
}
