use std::sync::Arc;

use tracing::{info, instrument};

use crate::{
    error::{AppError, AppResult},
    framework::privacy::{ensure_allowed, PrivacyOperation, PrivacyTarget},
    infrastructure::{database::DatabaseInterface, viewer::ViewerContext},
    models::{EntityKind, Follow, User},
};

pub struct FollowService {
    db: Arc<dyn DatabaseInterface>,
}

impl FollowService {
    pub fn new(db: Arc<dyn DatabaseInterface>) -> Self {
        Self { db }
    }

    async fn require_user(&self, username: &str) -> AppResult<User> {
        self.db
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", username)))
    }

    #[instrument(skip(self, vc), fields(request_id = %vc.request_id))]
    pub async fn follow(&self, vc: &ViewerContext, username: &str) -> AppResult<Follow> {
        ensure_allowed(vc.actor(), PrivacyOperation::Create, PrivacyTarget::Class(EntityKind::Follow))?;
        let follower_id = vc.require_user()?;
        let target = self.require_user(username).await?;

        if target.id == follower_id {
            return Err(AppError::BadRequest("You cannot follow yourself.".to_string()));
        }

        let follow = self
            .db
            .insert_follow(follower_id, target.id)
            .await
            .map_err(|e| match e {
                AppError::Conflict(_) => AppError::Conflict("You are already following this user.".to_string()),
                other => other,
            })?;
        info!("User {} now follows {}", follower_id, target.id);
        Ok(follow)
    }

    #[instrument(skip(self, vc), fields(request_id = %vc.request_id))]
    pub async fn unfollow(&self, vc: &ViewerContext, username: &str) -> AppResult<()> {
        let follower_id = vc.require_user()?;
        let target = self.require_user(username).await?;

        let follow = self
            .db
            .get_follow(follower_id, target.id)
            .await?
            .ok_or_else(|| AppError::BadRequest("You are not following this user.".to_string()))?;
        ensure_allowed(vc.actor(), PrivacyOperation::Delete, PrivacyTarget::Follow(&follow))?;

        self.db.delete_follow(follow.id).await?;
        info!("User {} unfollowed {}", follower_id, target.id);
        Ok(())
    }

    /// Users the viewer follows
    pub async fn following(&self, vc: &ViewerContext) -> AppResult<Vec<User>> {
        let user_id = vc.require_user()?;
        self.db.following(user_id).await
    }

    /// Users following the viewer
    pub async fn followers(&self, vc: &ViewerContext) -> AppResult<Vec<User>> {
        let user_id = vc.require_user()?;
        self.db.followers(user_id).await
    }
}
