// Record store interface - typed find/insert/update/delete per entity
// Inserts of duplicate relation edges fail with AppError::Conflict

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    core::{CommentId, FollowId, LikeId, PostId, UserId},
    error::AppResult,
    models::{Comment, Follow, Like, NewComment, NewPost, NewUser, Post, User},
};

/// Filters for post listings; all set filters must match
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    pub author_id: Option<UserId>,
    /// Only posts by users this user follows
    pub followed_by: Option<UserId>,
    /// Case-insensitive substring of the content
    pub content_contains: Option<String>,
}

impl PostQuery {
    pub fn by_author(author_id: UserId) -> Self {
        Self {
            author_id: Some(author_id),
            ..Self::default()
        }
    }

    pub fn followed_by(user_id: UserId) -> Self {
        Self {
            followed_by: Some(user_id),
            ..Self::default()
        }
    }

    pub fn containing(text: impl Into<String>) -> Self {
        Self {
            content_contains: Some(text.into()),
            ..Self::default()
        }
    }
}

#[async_trait]
pub trait DatabaseInterface: Send + Sync {
    // Users
    async fn insert_user(&self, user: NewUser) -> AppResult<User>;
    async fn get_user(&self, id: UserId) -> AppResult<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn update_user(&self, user: &User) -> AppResult<User>;
    /// Case-insensitive substring match on username; `None` lists everyone
    async fn search_users(&self, username: Option<&str>) -> AppResult<Vec<User>>;

    // Posts
    async fn insert_post(&self, post: NewPost) -> AppResult<Post>;
    async fn get_post(&self, id: PostId) -> AppResult<Option<Post>>;
    /// Rewrites content and media only; the author is immutable
    async fn update_post(&self, post: &Post) -> AppResult<Post>;
    async fn delete_post(&self, id: PostId) -> AppResult<bool>;
    /// Newest first
    async fn query_posts(&self, query: PostQuery) -> AppResult<Vec<Post>>;

    // Comments
    async fn insert_comment(&self, comment: NewComment) -> AppResult<Comment>;
    async fn get_comment(&self, id: CommentId) -> AppResult<Option<Comment>>;
    async fn update_comment(&self, comment: &Comment) -> AppResult<Comment>;
    async fn delete_comment(&self, id: CommentId) -> AppResult<bool>;
    /// Oldest first
    async fn comments_for_post(&self, post_id: PostId) -> AppResult<Vec<Comment>>;

    // Likes
    async fn insert_like(&self, user_id: UserId, post_id: PostId) -> AppResult<Like>;
    async fn get_like(&self, user_id: UserId, post_id: PostId) -> AppResult<Option<Like>>;
    async fn delete_like(&self, id: LikeId) -> AppResult<bool>;
    async fn count_likes(&self, post_id: PostId) -> AppResult<u64>;
    async fn likers(&self, post_id: PostId) -> AppResult<Vec<User>>;

    // Follows
    async fn insert_follow(&self, follower_id: UserId, following_id: UserId) -> AppResult<Follow>;
    async fn get_follow(&self, follower_id: UserId, following_id: UserId) -> AppResult<Option<Follow>>;
    async fn delete_follow(&self, id: FollowId) -> AppResult<bool>;
    /// Users `user_id` follows, in follow order
    async fn following(&self, user_id: UserId) -> AppResult<Vec<User>>;
    /// Users following `user_id`, in follow order
    async fn followers(&self, user_id: UserId) -> AppResult<Vec<User>>;

    // Revoked refresh tokens
    /// Returns false when the token was already revoked
    async fn blacklist_token(&self, jti: &str, expires_at: DateTime<Utc>) -> AppResult<bool>;
    async fn is_token_blacklisted(&self, jti: &str) -> AppResult<bool>;
}
