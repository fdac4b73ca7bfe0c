//! Posts, users and comments as seen by moderation
//!
//! These entities belong to other parts of the platform. Reads and
//! best-effort report side effects go through the narrow store traits below
//! (get, set-hidden, set-suspended, set-role, delete). Quick admin actions
//! use the connection-level helpers in `posts` and `users` instead, so the
//! change and its audit record commit in the same transaction on the
//! moderation database.

pub mod comments;
pub mod posts;
pub mod users;

pub use comments::{Comment, CommentStore, SqliteCommentStore};
pub use posts::{Post, PostKind, PostStore, SqlitePostStore};
pub use users::{NewUser, SqliteUserStore, User, UserStore};

use sqlx::SqlitePool;
use std::sync::Arc;

/// The three content collaborators bundled together
#[derive(Clone)]
pub struct ContentStores {
    pub posts: Arc<dyn PostStore>,
    pub users: Arc<dyn UserStore>,
    pub comments: Arc<dyn CommentStore>,
}

impl ContentStores {
    /// SQLite-backed stores over the shared pool
    pub fn sqlite(db: SqlitePool) -> Self {
        Self {
            posts: Arc::new(SqlitePostStore::new(db.clone())),
            users: Arc::new(SqliteUserStore::new(db.clone())),
            comments: Arc::new(SqliteCommentStore::new(db)),
        }
    }
}
