/// User collaborator
use crate::admin::Role;
use crate::db::{decode_timestamp, encode_timestamp};
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

/// User as exposed to moderation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub email: Option<String>,
    pub role: Role,
    pub suspended: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a user
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub id: Option<String>,
    pub username: String,
    pub display_name: String,
    pub email: Option<String>,
    pub role: Role,
}

/// Moderation contract for users
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, id: &str) -> AppResult<Option<User>>;

    async fn set_suspended(&self, id: &str, suspended: bool) -> AppResult<Option<User>>;

    async fn set_role(&self, id: &str, role: Role) -> AppResult<Option<User>>;

    /// `false` when the user did not exist
    async fn delete_user(&self, id: &str) -> AppResult<bool>;
}

/// User store backed by the `users` table
#[derive(Clone)]
pub struct SqliteUserStore {
    db: SqlitePool,
}

impl SqliteUserStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert a user (seeding and tests; registration lives elsewhere)
    pub async fn create_user(&self, new_user: NewUser) -> AppResult<User> {
        if new_user.username.trim().is_empty() {
            return Err(AppError::Validation("Username cannot be empty".to_string()));
        }

        let id = new_user
            .id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO users (id, username, display_name, email, role, suspended, created_at)
            VALUES (?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(&id)
        .bind(&new_user.username)
        .bind(&new_user.display_name)
        .bind(&new_user.email)
        .bind(new_user.role.as_str())
        .bind(encode_timestamp(now))
        .execute(&self.db)
        .await?;

        Ok(User {
            id,
            username: new_user.username,
            display_name: new_user.display_name,
            email: new_user.email,
            role: new_user.role,
            suspended: false,
            created_at: now,
        })
    }

    fn parse_user(row: SqliteRow) -> AppResult<User> {
        let role: String = row.try_get("role")?;
        let created_at: String = row.try_get("created_at")?;

        Ok(User {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            display_name: row.try_get("display_name")?,
            email: row.try_get("email")?,
            role: role.parse()?,
            suspended: row.try_get("suspended")?,
            created_at: decode_timestamp(&created_at)?,
        })
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn get_user(&self, id: &str) -> AppResult<Option<User>> {
        let mut conn = self.db.acquire().await?;
        fetch_user(&mut conn, id).await
    }

    async fn set_suspended(&self, id: &str, suspended: bool) -> AppResult<Option<User>> {
        let mut conn = self.db.acquire().await?;
        update_suspended(&mut conn, id, suspended).await
    }

    async fn set_role(&self, id: &str, role: Role) -> AppResult<Option<User>> {
        let mut conn = self.db.acquire().await?;
        update_role(&mut conn, id, role).await
    }

    async fn delete_user(&self, id: &str) -> AppResult<bool> {
        let mut conn = self.db.acquire().await?;
        remove_user(&mut conn, id).await
    }
}

/// Load a user on an open connection or transaction
pub(crate) async fn fetch_user(conn: &mut SqliteConnection, id: &str) -> AppResult<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, username, display_name, email, role, suspended, created_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(SqliteUserStore::parse_user).transpose()
}

pub(crate) async fn update_suspended(
    conn: &mut SqliteConnection,
    id: &str,
    suspended: bool,
) -> AppResult<Option<User>> {
    let result = sqlx::query("UPDATE users SET suspended = ? WHERE id = ?")
        .bind(suspended)
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    fetch_user(conn, id).await
}

pub(crate) async fn update_role(
    conn: &mut SqliteConnection,
    id: &str,
    role: Role,
) -> AppResult<Option<User>> {
    let result = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
        .bind(role.as_str())
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    fetch_user(conn, id).await
}

pub(crate) async fn remove_user(conn: &mut SqliteConnection, id: &str) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;

    #[tokio::test]
    async fn test_create_and_mutate_user() {
        let store = SqliteUserStore::new(connect_in_memory().await.unwrap());
        let user = store
            .create_user(NewUser {
                username: "alice".to_string(),
                display_name: "Alice Liddell".to_string(),
                email: Some("alice@example.com".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(user.role, Role::User);

        let suspended = store.set_suspended(&user.id, true).await.unwrap().unwrap();
        assert!(suspended.suspended);

        let promoted = store.set_role(&user.id, Role::Moderator).await.unwrap().unwrap();
        assert_eq!(promoted.role, Role::Moderator);
        assert!(promoted.suspended);

        assert!(store.delete_user(&user.id).await.unwrap());
        assert!(store.get_user(&user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_user() {
        let store = SqliteUserStore::new(connect_in_memory().await.unwrap());

        assert!(store.set_suspended("ghost", true).await.unwrap().is_none());
        assert!(store.set_role("ghost", Role::Admin).await.unwrap().is_none());
        assert!(!store.delete_user("ghost").await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_username_rejected() {
        let store = SqliteUserStore::new(connect_in_memory().await.unwrap());
        let result = store.create_user(NewUser::default()).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
