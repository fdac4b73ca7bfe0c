/// Post collaborator
use crate::db::{decode_timestamp, encode_timestamp};
use crate::error::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

text_enum! {
    /// Kind of content a post carries
    pub enum PostKind: "post kind" {
        Text => "text",
        Image => "image",
        Video => "video",
        Document => "document",
        Article => "article",
    }
}

/// Post as exposed to moderation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub kind: PostKind,
    pub hidden: bool,
    pub created_at: DateTime<Utc>,
}

/// Moderation contract for posts
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn get_post(&self, id: &str) -> AppResult<Option<Post>>;

    /// Set the hidden flag; `None` when the post does not exist
    async fn set_hidden(&self, id: &str, hidden: bool) -> AppResult<Option<Post>>;

    /// Irreversibly delete; `false` when the post did not exist
    async fn delete_post(&self, id: &str) -> AppResult<bool>;
}

/// Post store backed by the `posts` table
#[derive(Clone)]
pub struct SqlitePostStore {
    db: SqlitePool,
}

impl SqlitePostStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert a post (seeding and tests; posts are authored elsewhere)
    pub async fn create_post(
        &self,
        id: Option<&str>,
        author_id: &str,
        title: &str,
        kind: PostKind,
    ) -> AppResult<Post> {
        let id = id
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO posts (id, author_id, title, kind, hidden, created_at) VALUES (?, ?, ?, ?, 0, ?)",
        )
        .bind(&id)
        .bind(author_id)
        .bind(title)
        .bind(kind.as_str())
        .bind(encode_timestamp(now))
        .execute(&self.db)
        .await?;

        Ok(Post {
            id,
            author_id: author_id.to_string(),
            title: title.to_string(),
            kind,
            hidden: false,
            created_at: now,
        })
    }

    fn parse_post(row: SqliteRow) -> AppResult<Post> {
        let kind: String = row.try_get("kind")?;
        let created_at: String = row.try_get("created_at")?;

        Ok(Post {
            id: row.try_get("id")?,
            author_id: row.try_get("author_id")?,
            title: row.try_get("title")?,
            kind: kind.parse()?,
            hidden: row.try_get("hidden")?,
            created_at: decode_timestamp(&created_at)?,
        })
    }
}

#[async_trait]
impl PostStore for SqlitePostStore {
    async fn get_post(&self, id: &str) -> AppResult<Option<Post>> {
        let mut conn = self.db.acquire().await?;
        fetch_post(&mut conn, id).await
    }

    async fn set_hidden(&self, id: &str, hidden: bool) -> AppResult<Option<Post>> {
        let mut conn = self.db.acquire().await?;
        update_hidden(&mut conn, id, hidden).await
    }

    async fn delete_post(&self, id: &str) -> AppResult<bool> {
        let mut conn = self.db.acquire().await?;
        remove_post(&mut conn, id).await
    }
}

/// Load a post on an open connection or transaction
pub(crate) async fn fetch_post(conn: &mut SqliteConnection, id: &str) -> AppResult<Option<Post>> {
    let row = sqlx::query(
        "SELECT id, author_id, title, kind, hidden, created_at FROM posts WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(SqlitePostStore::parse_post).transpose()
}

pub(crate) async fn update_hidden(
    conn: &mut SqliteConnection,
    id: &str,
    hidden: bool,
) -> AppResult<Option<Post>> {
    let result = sqlx::query("UPDATE posts SET hidden = ? WHERE id = ?")
        .bind(hidden)
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    fetch_post(conn, id).await
}

pub(crate) async fn remove_post(conn: &mut SqliteConnection, id: &str) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}
