use crate::core::UserId;
use crate::error::{AppError, AppResult};
use crate::framework::privacy::Actor;

/// Who is making the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerType {
    Anonymous,
    User { user_id: UserId, username: String },
}

/// Request-scoped identity, created by middleware and passed explicitly
/// into every service call
#[derive(Debug, Clone)]
pub struct ViewerContext {
    pub viewer_type: ViewerType,
    pub request_id: String,
}

impl ViewerContext {
    pub fn anonymous(request_id: String) -> Self {
        Self {
            viewer_type: ViewerType::Anonymous,
            request_id,
        }
    }

    pub fn authenticated_user(user_id: UserId, username: String, request_id: String) -> Self {
        Self {
            viewer_type: ViewerType::User { user_id, username },
            request_id,
        }
    }

    pub fn actor(&self) -> Actor {
        match &self.viewer_type {
            ViewerType::Anonymous => Actor::Anonymous,
            ViewerType::User { user_id, .. } => Actor::User(*user_id),
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.actor().user_id()
    }

    pub fn username(&self) -> Option<&str> {
        match &self.viewer_type {
            ViewerType::User { username, .. } => Some(username),
            ViewerType::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.actor().is_authenticated()
    }

    /// Endpoints scoped to "me" need a signed-in viewer
    pub fn require_user(&self) -> AppResult<UserId> {
        self.user_id().ok_or_else(|| {
            AppError::Unauthorized("Authentication credentials were not provided.".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_viewer() {
        let vc = ViewerContext::anonymous("req-1".to_string());
        assert_eq!(vc.actor(), Actor::Anonymous);
        assert!(!vc.is_authenticated());
        assert!(matches!(vc.require_user(), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_user_viewer() {
        let vc = ViewerContext::authenticated_user(UserId::new(3), "carol".to_string(), "req-2".to_string());
        assert_eq!(vc.actor(), Actor::User(UserId::new(3)));
        assert_eq!(vc.username(), Some("carol"));
        assert_eq!(vc.require_user().unwrap(), UserId::new(3));
    }
}
