use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::{
    core::PostId,
    error::{AppError, AppResult},
    framework::privacy::{ensure_allowed, PrivacyOperation, PrivacyTarget},
    infrastructure::{
        database::{DatabaseInterface, PostQuery},
        viewer::ViewerContext,
    },
    models::{EntityKind, Like, NewPost, Post, PostDetail, User},
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostUpdate {
    pub content: Option<String>,
    pub media: Option<String>,
}

/// Outcome of the like toggle
#[derive(Debug, Clone, PartialEq)]
pub enum LikeToggle {
    Liked(Like),
    Unliked,
}

pub(crate) fn validate_content(content: &str) -> AppResult<()> {
    if content.trim().is_empty() {
        return Err(AppError::Validation("Content may not be blank.".to_string()));
    }
    Ok(())
}

pub struct PostService {
    db: Arc<dyn DatabaseInterface>,
}

impl PostService {
    pub fn new(db: Arc<dyn DatabaseInterface>) -> Self {
        Self { db }
    }

    pub(crate) async fn require_post(&self, id: PostId) -> AppResult<Post> {
        self.db
            .get_post(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", id)))
    }

    #[instrument(skip(self, vc, content, media), fields(request_id = %vc.request_id))]
    pub async fn create(&self, vc: &ViewerContext, content: String, media: Option<String>) -> AppResult<Post> {
        ensure_allowed(vc.actor(), PrivacyOperation::Create, PrivacyTarget::Class(EntityKind::Post))?;
        let author_id = vc.require_user()?;
        validate_content(&content)?;

        let post = self
            .db
            .insert_post(NewPost {
                author_id,
                content,
                media: media.filter(|m| !m.is_empty()),
            })
            .await?;
        info!("Post {} created by {}", post.id, author_id);
        Ok(post)
    }

    pub async fn get(&self, id: PostId) -> AppResult<PostDetail> {
        let post = self.require_post(id).await?;
        let likes_count = self.db.count_likes(id).await?;
        Ok(PostDetail { post, likes_count })
    }

    /// `username` picks that user's posts; otherwise a signed-in viewer sees their own
    /// posts and an anonymous viewer sees everything
    pub async fn list(&self, vc: &ViewerContext, username: Option<&str>) -> AppResult<Vec<Post>> {
        let query = match (username, vc.user_id()) {
            (Some(username), _) => {
                let author = self
                    .db
                    .get_user_by_username(username)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("User {} not found", username)))?;
                PostQuery::by_author(author.id)
            }
            (None, Some(user_id)) => PostQuery::by_author(user_id),
            (None, None) => PostQuery::default(),
        };
        self.db.query_posts(query).await
    }

    #[instrument(skip(self, vc, update), fields(request_id = %vc.request_id))]
    pub async fn update(&self, vc: &ViewerContext, id: PostId, update: PostUpdate) -> AppResult<Post> {
        vc.require_user()?;
        let mut post = self.require_post(id).await?;
        ensure_allowed(vc.actor(), PrivacyOperation::Update, PrivacyTarget::Post(&post))?;

        if let Some(content) = update.content {
            validate_content(&content)?;
            post.content = content;
        }
        if let Some(media) = update.media {
            post.media = Some(media).filter(|m| !m.is_empty());
        }
        self.db.update_post(&post).await
    }

    #[instrument(skip(self, vc), fields(request_id = %vc.request_id))]
    pub async fn delete(&self, vc: &ViewerContext, id: PostId) -> AppResult<()> {
        vc.require_user()?;
        let post = self.require_post(id).await?;
        ensure_allowed(vc.actor(), PrivacyOperation::Delete, PrivacyTarget::Post(&post))?;

        self.db.delete_post(id).await?;
        info!("Post {} deleted", id);
        Ok(())
    }

    pub async fn own_posts(&self, vc: &ViewerContext) -> AppResult<Vec<Post>> {
        let user_id = vc.require_user()?;
        self.db.query_posts(PostQuery::by_author(user_id)).await
    }

    pub async fn following_posts(&self, vc: &ViewerContext) -> AppResult<Vec<Post>> {
        let user_id = vc.require_user()?;
        self.db.query_posts(PostQuery::followed_by(user_id)).await
    }

    pub async fn search(&self, vc: &ViewerContext, criteria: Option<&str>) -> AppResult<Vec<Post>> {
        vc.require_user()?;
        let query = match criteria {
            Some(text) => PostQuery::containing(text),
            None => PostQuery::default(),
        };
        self.db.query_posts(query).await
    }

    /// Like the post, or remove the viewer's existing like
    #[instrument(skip(self, vc), fields(request_id = %vc.request_id))]
    pub async fn toggle_like(&self, vc: &ViewerContext, post_id: PostId) -> AppResult<LikeToggle> {
        ensure_allowed(vc.actor(), PrivacyOperation::Create, PrivacyTarget::Class(EntityKind::Like))?;
        let user_id = vc.require_user()?;
        self.require_post(post_id).await?;

        if let Some(like) = self.db.get_like(user_id, post_id).await? {
            ensure_allowed(vc.actor(), PrivacyOperation::Delete, PrivacyTarget::Like(&like))?;
            self.db.delete_like(like.id).await?;
            debug!("User {} unliked post {}", user_id, post_id);
            return Ok(LikeToggle::Unliked);
        }

        match self.db.insert_like(user_id, post_id).await {
            Ok(like) => {
                debug!("User {} liked post {}", user_id, post_id);
                Ok(LikeToggle::Liked(like))
            }
            // A concurrent request already inserted the edge; report it as liked
            Err(AppError::Conflict(_)) => self
                .db
                .get_like(user_id, post_id)
                .await?
                .map(LikeToggle::Liked)
                .ok_or_else(|| AppError::Internal("Like vanished after conflict".to_string())),
            Err(other) => Err(other),
        }
    }

    pub async fn likers(&self, post_id: PostId) -> AppResult<Vec<User>> {
        self.require_post(post_id).await?;
        self.db.likers(post_id).await
    }
}
