// Deferred post publication - one background task per scheduled post

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use crate::{
    core::UserId,
    error::{AppError, AppResult},
    framework::privacy::{ensure_allowed, Actor, PrivacyOperation, PrivacyTarget},
    infrastructure::{database::DatabaseInterface, viewer::ViewerContext},
    models::{EntityKind, NewPost, Post},
    services::post_service::validate_content,
};

pub const SCHEDULE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleRequest {
    pub content: String,
    pub media: Option<String>,
    pub schedule_time: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduledPost {
    pub author_id: UserId,
    pub schedule_time: DateTime<Utc>,
}

/// Times are wall-clock UTC
pub fn parse_schedule_time(raw: &str) -> AppResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), SCHEDULE_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| AppError::Validation("Invalid datetime format. Use 'YYYY-mm-dd HH:MM:SS'.".to_string()))
}

pub struct PostScheduler {
    db: Arc<dyn DatabaseInterface>,
}

impl PostScheduler {
    pub fn new(db: Arc<dyn DatabaseInterface>) -> Self {
        Self { db }
    }

    /// Validate now, publish later. The returned handle resolves once the
    /// background task has run.
    #[instrument(skip(self, vc, request), fields(request_id = %vc.request_id))]
    pub fn schedule(
        &self,
        vc: &ViewerContext,
        request: ScheduleRequest,
    ) -> AppResult<(ScheduledPost, JoinHandle<Option<Post>>)> {
        ensure_allowed(vc.actor(), PrivacyOperation::Create, PrivacyTarget::Class(EntityKind::Post))?;
        let author_id = vc.require_user()?;
        validate_content(&request.content)?;

        let schedule_time = parse_schedule_time(&request.schedule_time)?;
        let delay = (schedule_time - Utc::now())
            .to_std()
            .ok()
            .filter(|d| !d.is_zero())
            .ok_or_else(|| AppError::BadRequest("Schedule time must be in the future.".to_string()))?;

        let post = NewPost {
            author_id,
            content: request.content,
            media: request.media.filter(|m| !m.is_empty()),
        };
        let db = Arc::clone(&self.db);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match publish_scheduled(db.as_ref(), post).await {
                Ok(post) => Some(post),
                Err(e) => {
                    error!("Scheduled post for user {} was not published: {}", author_id, e);
                    None
                }
            }
        });

        info!("Post by {} scheduled for {}", author_id, schedule_time);
        Ok((
            ScheduledPost {
                author_id,
                schedule_time,
            },
            handle,
        ))
    }
}

/// The author is checked again at publish time; they may have been
/// deactivated while the post was pending.
pub async fn publish_scheduled(db: &dyn DatabaseInterface, post: NewPost) -> AppResult<Post> {
    let author = db
        .get_user(post.author_id)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| {
            warn!("Author {} is gone or inactive", post.author_id);
            AppError::NotFound(format!("User {} not found", post.author_id))
        })?;

    ensure_allowed(
        Actor::User(author.id),
        PrivacyOperation::Create,
        PrivacyTarget::Class(EntityKind::Post),
    )?;
    let post = db.insert_post(post).await?;
    info!("Scheduled post {} published", post.id);
    Ok(post)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Duration, Timelike};

    #[test]
    fn test_parse_schedule_time() {
        let parsed = parse_schedule_time("2030-01-02 03:04:05").unwrap();
        assert_eq!(parsed.year(), 2030);
        assert_eq!(parsed.day(), 2);
        assert_eq!(parsed.hour(), 3);
        assert_eq!(parsed.second(), 5);

        assert!(matches!(parse_schedule_time("2030-01-02T03:04:05"), Err(AppError::Validation(_))));
        assert!(matches!(parse_schedule_time("tomorrow"), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_format_matches_parser() {
        let when = Utc::now() + Duration::hours(1);
        let raw = when.format(SCHEDULE_TIME_FORMAT).to_string();
        assert_eq!(parse_schedule_time(&raw).unwrap().timestamp(), when.timestamp());
    }
}
