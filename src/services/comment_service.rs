use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, instrument};

use crate::{
    core::{CommentId, PostId},
    error::{AppError, AppResult},
    framework::privacy::{ensure_allowed, PrivacyOperation, PrivacyTarget},
    infrastructure::{database::DatabaseInterface, viewer::ViewerContext},
    models::{Comment, EntityKind, NewComment, Post},
    services::post_service::validate_content,
};

#[derive(Debug, Clone, Deserialize)]
pub struct CommentUpdate {
    pub content: String,
}

pub struct CommentService {
    db: Arc<dyn DatabaseInterface>,
}

impl CommentService {
    pub fn new(db: Arc<dyn DatabaseInterface>) -> Self {
        Self { db }
    }

    async fn require_post(&self, id: PostId) -> AppResult<Post> {
        self.db
            .get_post(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", id)))
    }

    /// The comment along with the post it belongs to
    async fn load(&self, id: CommentId) -> AppResult<(Comment, Post)> {
        let comment = self
            .db
            .get_comment(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", id)))?;
        let post = self.require_post(comment.post_id).await?;
        Ok((comment, post))
    }

    #[instrument(skip(self, vc, content), fields(request_id = %vc.request_id))]
    pub async fn create(&self, vc: &ViewerContext, post_id: PostId, content: String) -> AppResult<Comment> {
        ensure_allowed(vc.actor(), PrivacyOperation::Create, PrivacyTarget::Class(EntityKind::Comment))?;
        let author_id = vc.require_user()?;
        self.require_post(post_id).await?;
        validate_content(&content)?;

        let comment = self
            .db
            .insert_comment(NewComment {
                author_id,
                post_id,
                content,
            })
            .await?;
        info!("Comment {} added to post {}", comment.id, post_id);
        Ok(comment)
    }

    pub async fn list(&self, post_id: PostId) -> AppResult<Vec<Comment>> {
        self.require_post(post_id).await?;
        self.db.comments_for_post(post_id).await
    }

    pub async fn get(&self, id: CommentId) -> AppResult<Comment> {
        self.load(id).await.map(|(comment, _)| comment)
    }

    #[instrument(skip(self, vc, update), fields(request_id = %vc.request_id))]
    pub async fn update(&self, vc: &ViewerContext, id: CommentId, update: CommentUpdate) -> AppResult<Comment> {
        vc.require_user()?;
        let (mut comment, post) = self.load(id).await?;
        ensure_allowed(
            vc.actor(),
            PrivacyOperation::Update,
            PrivacyTarget::Comment {
                comment: &comment,
                post: &post,
            },
        )?;

        validate_content(&update.content)?;
        comment.content = update.content;
        self.db.update_comment(&comment).await
    }

    /// Removable by the comment's author or by the author of the post
    #[instrument(skip(self, vc), fields(request_id = %vc.request_id))]
    pub async fn delete(&self, vc: &ViewerContext, id: CommentId) -> AppResult<()> {
        vc.require_user()?;
        let (comment, post) = self.load(id).await?;
        ensure_allowed(
            vc.actor(),
            PrivacyOperation::Delete,
            PrivacyTarget::Comment {
                comment: &comment,
                post: &post,
            },
        )?;

        self.db.delete_comment(id).await?;
        info!("Comment {} deleted", id);
        Ok(())
    }
}
