use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{Sqlite, SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    QueryBuilder, Row,
};
use std::{path::Path, str::FromStr};
use tracing::{debug, info};

use crate::core::{CommentId, FollowId, LikeId, PostId, UserId};
use crate::error::{AppError, AppResult};
use crate::infrastructure::database::{DatabaseInterface, PostQuery};
use crate::models::{Comment, Follow, Like, NewComment, NewPost, NewUser, Post, User};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, bio, profile_picture, is_active, date_joined";
const POST_COLUMNS: &str = "id, author_id, content, media, created_at, updated_at";
const COMMENT_COLUMNS: &str = "id, author_id, post_id, content, created_at, updated_at";

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        bio TEXT,
        profile_picture TEXT,
        is_active INTEGER NOT NULL DEFAULT 1,
        date_joined TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS posts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        author_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        content TEXT NOT NULL,
        media TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS comments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        author_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
        content TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS likes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
        created_at TEXT NOT NULL,
        UNIQUE (user_id, post_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS follows (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        follower_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        following_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at TEXT NOT NULL,
        UNIQUE (follower_id, following_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS token_blacklist (
        jti TEXT PRIMARY KEY,
        expires_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author_id, id)",
    "CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id, id)",
    "CREATE INDEX IF NOT EXISTS idx_follows_following ON follows(following_id)",
];

/// Escape LIKE wildcards and wrap the text for a substring match
fn like_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// File path component of a `sqlite:` url, without query parameters
fn database_file(url: &str) -> Option<&Path> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    (!path.is_empty()).then(|| Path::new(path))
}

/// SQLite implementation of the record store (file-backed or in-memory)
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Connect to `url` (e.g. `sqlite:data/social.db` or `sqlite::memory:`) and create the schema
    pub async fn connect(url: &str) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| AppError::ConfigurationError(format!("Invalid database url {}: {}", url, e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool_options = if in_memory {
            // Every connection to :memory: is a separate database, so keep exactly one alive
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            if let Some(parent) = database_file(url).and_then(|path| path.parent()) {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        AppError::ConfigurationError(format!(
                            "Failed to create database directory {}: {}",
                            parent.display(),
                            e
                        ))
                    })?;
                }
            }
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to connect to {}: {}", url, e))
        })?;

        let db = Self { pool };
        db.initialize().await?;
        info!("Connected to database {}", url);
        Ok(db)
    }

    pub async fn new_in_memory() -> AppResult<Self> {
        Self::connect("sqlite::memory:").await
    }

    /// Create tables and indexes if they do not exist yet
    pub async fn initialize(&self) -> AppResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to initialize schema: {}", e)))?;
        }
        Ok(())
    }

    /// Run a raw statement; lets tests break the schema underneath a service
    #[cfg(test)]
    pub(crate) async fn execute_raw(&self, sql: &str) -> AppResult<()> {
        sqlx::query(sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn require_post(&self, id: PostId) -> AppResult<Post> {
        self.get_post(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", id)))
    }

    async fn require_comment(&self, id: CommentId) -> AppResult<Comment> {
        self.get_comment(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", id)))
    }

    async fn users_via_follows(&self, join_column: &str, filter_column: &str, user_id: UserId) -> AppResult<Vec<User>> {
        let sql = format!(
            "SELECT u.id, u.username, u.email, u.password_hash, u.bio, u.profile_picture, u.is_active, u.date_joined \
             FROM follows f JOIN users u ON u.id = f.{} WHERE f.{} = ? ORDER BY f.id",
            join_column, filter_column
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }
}

#[async_trait]
impl DatabaseInterface for SqliteDatabase {
    async fn insert_user(&self, user: NewUser) -> AppResult<User> {
        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash, is_active, date_joined) VALUES (?, ?, ?, 1, ?)",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let id = UserId::new(result.last_insert_rowid());
        debug!("Inserted user {} ({})", user.username, id);
        self.get_user(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("User {} vanished after insert", id)))
    }

    async fn get_user(&self, id: UserId) -> AppResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_user(&self, user: &User) -> AppResult<User> {
        let result = sqlx::query(
            "UPDATE users SET username = ?, email = ?, password_hash = ?, bio = ?, profile_picture = ?, is_active = ? WHERE id = ?",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.bio)
        .bind(&user.profile_picture)
        .bind(user.is_active)
        .bind(user.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", user.id)));
        }
        self.get_user(user.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.id)))
    }

    async fn search_users(&self, username: Option<&str>) -> AppResult<Vec<User>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM users", USER_COLUMNS));
        if let Some(username) = username.filter(|u| !u.is_empty()) {
            qb.push(" WHERE username LIKE ");
            qb.push_bind(like_pattern(username));
            qb.push(" ESCAPE '\\'");
        }
        qb.push(" ORDER BY id");
        Ok(qb.build_query_as::<User>().fetch_all(&self.pool).await?)
    }

    async fn insert_post(&self, post: NewPost) -> AppResult<Post> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO posts (author_id, content, media, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(post.author_id)
        .bind(&post.content)
        .bind(&post.media)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.require_post(PostId::new(result.last_insert_rowid())).await
    }

    async fn get_post(&self, id: PostId) -> AppResult<Option<Post>> {
        let sql = format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS);
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_post(&self, post: &Post) -> AppResult<Post> {
        let result = sqlx::query("UPDATE posts SET content = ?, media = ?, updated_at = ? WHERE id = ?")
            .bind(&post.content)
            .bind(&post.media)
            .bind(Utc::now())
            .bind(post.id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Post {} not found", post.id)));
        }
        self.require_post(post.id).await
    }

    async fn delete_post(&self, id: PostId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn query_posts(&self, query: PostQuery) -> AppResult<Vec<Post>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM posts WHERE 1 = 1", POST_COLUMNS));

        if let Some(author_id) = query.author_id {
            qb.push(" AND author_id = ");
            qb.push_bind(author_id);
        }
        if let Some(follower_id) = query.followed_by {
            qb.push(" AND author_id IN (SELECT following_id FROM follows WHERE follower_id = ");
            qb.push_bind(follower_id);
            qb.push(")");
        }
        if let Some(text) = query.content_contains.filter(|t| !t.is_empty()) {
            qb.push(" AND content LIKE ");
            qb.push_bind(like_pattern(&text));
            qb.push(" ESCAPE '\\'");
        }

        qb.push(" ORDER BY id DESC");

        Ok(qb.build_query_as::<Post>().fetch_all(&self.pool).await?)
    }

    async fn insert_comment(&self, comment: NewComment) -> AppResult<Comment> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO comments (author_id, post_id, content, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(comment.author_id)
        .bind(comment.post_id)
        .bind(&comment.content)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.require_comment(CommentId::new(result.last_insert_rowid())).await
    }

    async fn get_comment(&self, id: CommentId) -> AppResult<Option<Comment>> {
        let sql = format!("SELECT {} FROM comments WHERE id = ?", COMMENT_COLUMNS);
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_comment(&self, comment: &Comment) -> AppResult<Comment> {
        let result = sqlx::query("UPDATE comments SET content = ?, updated_at = ? WHERE id = ?")
            .bind(&comment.content)
            .bind(Utc::now())
            .bind(comment.id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Comment {} not found", comment.id)));
        }
        self.require_comment(comment.id).await
    }

    async fn delete_comment(&self, id: CommentId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn comments_for_post(&self, post_id: PostId) -> AppResult<Vec<Comment>> {
        let sql = format!("SELECT {} FROM comments WHERE post_id = ? ORDER BY id", COMMENT_COLUMNS);
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn insert_like(&self, user_id: UserId, post_id: PostId) -> AppResult<Like> {
        let result = sqlx::query("INSERT INTO likes (user_id, post_id, created_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(post_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        let id = LikeId::new(result.last_insert_rowid());
        Ok(sqlx::query_as::<_, Like>("SELECT id, user_id, post_id, created_at FROM likes WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn get_like(&self, user_id: UserId, post_id: PostId) -> AppResult<Option<Like>> {
        Ok(sqlx::query_as::<_, Like>(
            "SELECT id, user_id, post_id, created_at FROM likes WHERE user_id = ? AND post_id = ?",
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_like(&self, id: LikeId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM likes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_likes(&self, post_id: PostId) -> AppResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM likes WHERE post_id = ?")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("count") as u64)
    }

    async fn likers(&self, post_id: PostId) -> AppResult<Vec<User>> {
        Ok(sqlx::query_as::<_, User>(
            "SELECT u.id, u.username, u.email, u.password_hash, u.bio, u.profile_picture, u.is_active, u.date_joined \
             FROM likes l JOIN users u ON u.id = l.user_id WHERE l.post_id = ? ORDER BY l.id",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn insert_follow(&self, follower_id: UserId, following_id: UserId) -> AppResult<Follow> {
        let result = sqlx::query("INSERT INTO follows (follower_id, following_id, created_at) VALUES (?, ?, ?)")
            .bind(follower_id)
            .bind(following_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        let id = FollowId::new(result.last_insert_rowid());
        Ok(sqlx::query_as::<_, Follow>(
            "SELECT id, follower_id, following_id, created_at FROM follows WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn get_follow(&self, follower_id: UserId, following_id: UserId) -> AppResult<Option<Follow>> {
        Ok(sqlx::query_as::<_, Follow>(
            "SELECT id, follower_id, following_id, created_at FROM follows WHERE follower_id = ? AND following_id = ?",
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_follow(&self, id: FollowId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn following(&self, user_id: UserId) -> AppResult<Vec<User>> {
        self.users_via_follows("following_id", "follower_id", user_id).await
    }

    async fn followers(&self, user_id: UserId) -> AppResult<Vec<User>> {
        self.users_via_follows("follower_id", "following_id", user_id).await
    }

    async fn blacklist_token(&self, jti: &str, expires_at: DateTime<Utc>) -> AppResult<bool> {
        // Expired tokens fail validation anyway, so their entries can go
        let purged = sqlx::query("DELETE FROM token_blacklist WHERE expires_at < ?")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?
            .rows_affected();
        if purged > 0 {
            debug!("Purged {} expired blacklist entries", purged);
        }

        let result = sqlx::query("INSERT OR IGNORE INTO token_blacklist (jti, expires_at) VALUES (?, ?)")
            .bind(jti)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_token_blacklisted(&self, jti: &str) -> AppResult<bool> {
        let row = sqlx::query("SELECT 1 FROM token_blacklist WHERE jti = ?")
            .bind(jti)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn db_with_users() -> (SqliteDatabase, User, User) {
        let db = SqliteDatabase::new_in_memory().await.unwrap();
        let alice = db
            .insert_user(NewUser {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        let bob = db
            .insert_user(NewUser {
                username: "bob".to_string(),
                email: "bob@example.com".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        (db, alice, bob)
    }

    #[test]
    fn test_database_file_from_url() {
        assert_eq!(database_file("sqlite:data/social.db"), Some(Path::new("data/social.db")));
        assert_eq!(database_file("sqlite://tmp/x.db?mode=rwc"), Some(Path::new("tmp/x.db")));
        assert_eq!(database_file("postgres://host/db"), None);
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("abc"), "%abc%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[tokio::test]
    async fn test_duplicate_username_is_conflict() {
        let (db, _, _) = db_with_users().await;
        let result = db
            .insert_user(NewUser {
                username: "alice".to_string(),
                email: "other@example.com".to_string(),
                password_hash: "hash".to_string(),
            })
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_duplicate_like_is_conflict_not_second_row() {
        let (db, alice, bob) = db_with_users().await;
        let post = db
            .insert_post(NewPost {
                author_id: alice.id,
                content: "first".to_string(),
                media: None,
            })
            .await
            .unwrap();

        db.insert_like(bob.id, post.id).await.unwrap();
        let second = db.insert_like(bob.id, post.id).await;
        assert!(matches!(second, Err(AppError::Conflict(_))));
        assert_eq!(db.count_likes(post.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_follow_is_conflict() {
        let (db, alice, bob) = db_with_users().await;
        db.insert_follow(alice.id, bob.id).await.unwrap();
        assert!(matches!(
            db.insert_follow(alice.id, bob.id).await,
            Err(AppError::Conflict(_))
        ));
        // The reverse direction is a different edge
        db.insert_follow(bob.id, alice.id).await.unwrap();
        assert_eq!(db.followers(alice.id).await.unwrap().len(), 1);
        assert_eq!(db.following(alice.id).await.unwrap()[0].username, "bob");
    }

    #[tokio::test]
    async fn test_deleting_post_cascades_to_comments_and_likes() {
        let (db, alice, bob) = db_with_users().await;
        let post = db
            .insert_post(NewPost {
                author_id: alice.id,
                content: "first".to_string(),
                media: None,
            })
            .await
            .unwrap();
        db.insert_like(bob.id, post.id).await.unwrap();
        let comment = db
            .insert_comment(NewComment {
                author_id: bob.id,
                post_id: post.id,
                content: "hi".to_string(),
            })
            .await
            .unwrap();

        assert!(db.delete_post(post.id).await.unwrap());
        assert!(db.get_comment(comment.id).await.unwrap().is_none());
        assert!(db.get_like(bob.id, post.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_post_keeps_author() {
        let (db, alice, bob) = db_with_users().await;
        let mut post = db
            .insert_post(NewPost {
                author_id: alice.id,
                content: "draft".to_string(),
                media: None,
            })
            .await
            .unwrap();

        post.content = "final".to_string();
        post.author_id = bob.id;
        let updated = db.update_post(&post).await.unwrap();
        assert_eq!(updated.content, "final");
        assert_eq!(updated.author_id, alice.id);
    }

    #[tokio::test]
    async fn test_query_posts_filters() {
        let (db, alice, bob) = db_with_users().await;
        for (author, content) in [(alice.id, "Rust is great"), (bob.id, "hello world"), (bob.id, "more rust")] {
            db.insert_post(NewPost {
                author_id: author,
                content: content.to_string(),
                media: None,
            })
            .await
            .unwrap();
        }

        assert_eq!(db.query_posts(PostQuery::by_author(bob.id)).await.unwrap().len(), 2);
        assert_eq!(db.query_posts(PostQuery::containing("RUST")).await.unwrap().len(), 2);
        assert!(db.query_posts(PostQuery::followed_by(alice.id)).await.unwrap().is_empty());

        db.insert_follow(alice.id, bob.id).await.unwrap();
        let feed = db.query_posts(PostQuery::followed_by(alice.id)).await.unwrap();
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].content, "more rust");
        assert_eq!(feed[1].content, "hello world");
    }

    #[tokio::test]
    async fn test_token_blacklist() {
        let db = SqliteDatabase::new_in_memory().await.unwrap();
        let expires_at = Utc::now() + Duration::hours(1);
        assert!(!db.is_token_blacklisted("abc").await.unwrap());
        assert!(db.blacklist_token("abc", expires_at).await.unwrap());
        assert!(!db.blacklist_token("abc", expires_at).await.unwrap());
        assert!(db.is_token_blacklisted("abc").await.unwrap());
    }

    #[tokio::test]
    async fn test_blacklist_purges_expired_entries() {
        let db = SqliteDatabase::new_in_memory().await.unwrap();
        db.blacklist_token("stale", Utc::now() - Duration::hours(1)).await.unwrap();
        db.blacklist_token("live", Utc::now() + Duration::hours(1)).await.unwrap();

        assert!(!db.is_token_blacklisted("stale").await.unwrap());
        assert!(db.is_token_blacklisted("live").await.unwrap());

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM token_blacklist")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(remaining, 1);
    }

    #[tokio::test]
    async fn test_update_user_renames() {
        let (db, mut alice, bob) = db_with_users().await;
        alice.username = "alicia".to_string();
        assert_eq!(db.update_user(&alice).await.unwrap().username, "alicia");
        assert!(db.get_user_by_username("alice").await.unwrap().is_none());

        alice.username = bob.username.clone();
        assert!(matches!(db.update_user(&alice).await, Err(AppError::Conflict(_))));
    }
}
