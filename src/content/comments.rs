/// Comment collaborator
use crate::db::{decode_timestamp, encode_timestamp};
use crate::error::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Moderation contract for comments
#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn get_comment(&self, id: &str) -> AppResult<Option<Comment>>;

    async fn delete_comment(&self, id: &str) -> AppResult<bool>;
}

#[derive(Clone)]
pub struct SqliteCommentStore {
    db: SqlitePool,
}

impl SqliteCommentStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn create_comment(
        &self,
        id: Option<&str>,
        post_id: &str,
        author_id: &str,
        body: &str,
    ) -> AppResult<Comment> {
        let id = id
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO comments (id, post_id, author_id, body, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(post_id)
        .bind(author_id)
        .bind(body)
        .bind(encode_timestamp(now))
        .execute(&self.db)
        .await?;

        Ok(Comment {
            id,
            post_id: post_id.to_string(),
            author_id: author_id.to_string(),
            body: body.to_string(),
            created_at: now,
        })
    }

    fn parse_comment(row: SqliteRow) -> AppResult<Comment> {
        let created_at: String = row.try_get("created_at")?;

        Ok(Comment {
            id: row.try_get("id")?,
            post_id: row.try_get("post_id")?,
            author_id: row.try_get("author_id")?,
            body: row.try_get("body")?,
            created_at: decode_timestamp(&created_at)?,
        })
    }
}

#[async_trait]
impl CommentStore for SqliteCommentStore {
    async fn get_comment(&self, id: &str) -> AppResult<Option<Comment>> {
        let row = sqlx::query(
            "SELECT id, post_id, author_id, body, created_at FROM comments WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.map(Self::parse_comment).transpose()
    }

    async fn delete_comment(&self, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;

    #[tokio::test]
    async fn test_comment_lifecycle() {
        let store = SqliteCommentStore::new(connect_in_memory().await.unwrap());
        let comment = store
            .create_comment(Some("C1"), "P1", "bob", "first!")
            .await
            .unwrap();

        let fetched = store.get_comment("C1").await.unwrap().unwrap();
        assert_eq!(fetched.author_id, "bob");
        assert_eq!(fetched.post_id, comment.post_id);

        assert!(store.delete_comment("C1").await.unwrap());
        assert!(!store.delete_comment("C1").await.unwrap());
    }
}
