use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::{
    error::{AppError, AppResult},
    infrastructure::{
        database::DatabaseInterface,
        security::{Claims, SecurityService, TokenPair, TokenType},
        viewer::ViewerContext,
    },
};

/// Login, token refresh/verification and logout
pub struct AuthService {
    db: Arc<dyn DatabaseInterface>,
    security: Arc<SecurityService>,
}

impl AuthService {
    pub fn new(db: Arc<dyn DatabaseInterface>, security: Arc<SecurityService>) -> Self {
        Self { db, security }
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> AppResult<TokenPair> {
        let invalid = || AppError::Unauthorized("No active account found with the given credentials".to_string());

        let user = self.db.get_user_by_username(username).await?.ok_or_else(invalid)?;
        if !self.security.verify_password(password, &user.password_hash)? {
            warn!("Failed login for {}", username);
            return Err(invalid());
        }
        if !user.is_active {
            warn!("Login attempt for deactivated account {}", username);
            return Err(invalid());
        }

        info!("User {} authenticated successfully", username);
        self.security.issue_pair(user.id, &user.username)
    }

    /// Validate a refresh token that has not been revoked
    async fn live_refresh_claims(&self, refresh: &str) -> AppResult<Claims> {
        let claims = self.security.validate(refresh, TokenType::Refresh)?;
        if self.db.is_token_blacklisted(&claims.jti).await? {
            return Err(AppError::Unauthorized("Token is blacklisted".to_string()));
        }
        Ok(claims)
    }

    /// Exchange a refresh token for a new access token
    pub async fn refresh(&self, refresh: &str) -> AppResult<String> {
        let claims = self.live_refresh_claims(refresh).await?;
        let user = self
            .db
            .get_user(claims.user_id()?)
            .await?
            .filter(|user| user.is_active)
            .ok_or_else(|| AppError::Unauthorized("User not found or inactive".to_string()))?;
        self.security.issue(user.id, &user.username, TokenType::Access)
    }

    /// Accepts either token type; refresh tokens must not be revoked
    pub async fn verify(&self, token: &str) -> AppResult<()> {
        if self.security.validate(token, TokenType::Access).is_ok() {
            return Ok(());
        }
        self.live_refresh_claims(token).await.map(|_| ())
    }

    /// Revoke the viewer's refresh token
    #[instrument(skip(self, vc, refresh), fields(request_id = %vc.request_id))]
    pub async fn logout(&self, vc: &ViewerContext, refresh: &str) -> AppResult<()> {
        let user_id = vc.require_user()?;
        let claims = self
            .live_refresh_claims(refresh)
            .await
            .map_err(|e| match e {
                AppError::Unauthorized(_) => AppError::BadRequest("Token is invalid or expired".to_string()),
                other => other,
            })?;

        if claims.user_id()? != user_id {
            return Err(AppError::Forbidden("Token belongs to another user".to_string()));
        }

        self.db.blacklist_token(&claims.jti, claims.expires_at()).await?;
        info!("User {} logged out", user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AuthConfig, infrastructure::sqlite_database::SqliteDatabase, models::NewUser};

    async fn fixture() -> (Arc<SqliteDatabase>, AuthService, ViewerContext, TokenPair) {
        let db = Arc::new(SqliteDatabase::new_in_memory().await.unwrap());
        let security = Arc::new(SecurityService::new(&AuthConfig {
            jwt_secret: "test-secret".to_string(),
            ..AuthConfig::default()
        }));
        let user = db
            .insert_user(NewUser {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password_hash: security.hash_password("password123").unwrap(),
            })
            .await
            .unwrap();
        let pair = security.issue_pair(user.id, &user.username).unwrap();
        let vc = ViewerContext::authenticated_user(user.id, user.username, "test-logout".to_string());
        let service = AuthService::new(db.clone(), security);
        (db, service, vc, pair)
    }

    #[tokio::test]
    async fn test_logout_rejects_unusable_token_as_bad_request() {
        let (_, service, vc, pair) = fixture().await;
        assert!(matches!(service.logout(&vc, "garbage").await, Err(AppError::BadRequest(_))));
        assert!(matches!(service.logout(&vc, &pair.access).await, Err(AppError::BadRequest(_))));

        service.logout(&vc, &pair.refresh).await.unwrap();
        assert!(matches!(service.logout(&vc, &pair.refresh).await, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_logout_store_failure_is_not_a_bad_request() {
        let (db, service, vc, pair) = fixture().await;
        db.execute_raw("DROP TABLE token_blacklist").await.unwrap();

        let result = service.logout(&vc, &pair.refresh).await;
        assert!(matches!(result, Err(AppError::DatabaseError(_))));
    }
}
