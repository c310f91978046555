use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::{
    error::{AppError, AppResult},
    framework::privacy::{ensure_allowed, PrivacyOperation, PrivacyTarget},
    infrastructure::{database::DatabaseInterface, security::SecurityService, viewer::ViewerContext},
    models::{NewUser, User},
};

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]{1,150}$").expect("username pattern is valid"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid"));

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Partial profile edit; absent fields are left alone
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
}

fn validate_username(username: &str) -> AppResult<()> {
    if USERNAME_RE.is_match(username) {
        Ok(())
    } else {
        Err(AppError::Validation(
            "Username may contain only letters, digits and @/./+/-/_ (max 150).".to_string(),
        ))
    }
}

fn username_taken(e: AppError) -> AppError {
    match e {
        AppError::Conflict(_) => AppError::Conflict("A user with that username already exists.".to_string()),
        other => other,
    }
}

fn validate_email(email: &str) -> AppResult<()> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(AppError::Validation("Enter a valid email address.".to_string()))
    }
}

pub struct UserService {
    db: Arc<dyn DatabaseInterface>,
    security: Arc<SecurityService>,
    password_min_length: usize,
}

impl UserService {
    pub fn new(db: Arc<dyn DatabaseInterface>, security: Arc<SecurityService>, password_min_length: usize) -> Self {
        Self {
            db,
            security,
            password_min_length,
        }
    }

    /// Registration is open to anonymous viewers; it creates the actor rather than acting as one
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: RegisterUser) -> AppResult<User> {
        let username = request.username.trim().to_string();
        validate_username(&username)?;
        validate_email(&request.email)?;
        if request.password.chars().count() < self.password_min_length {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                self.password_min_length
            )));
        }

        let password_hash = self.security.hash_password(&request.password)?;
        let user = self
            .db
            .insert_user(NewUser {
                username,
                email: request.email,
                password_hash,
            })
            .await
            .map_err(username_taken)?;

        info!("User {} registered ({})", user.username, user.id);
        Ok(user)
    }

    pub async fn profile(&self, vc: &ViewerContext) -> AppResult<User> {
        let user_id = vc.require_user()?;
        self.db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    #[instrument(skip(self, vc, update), fields(request_id = %vc.request_id))]
    pub async fn update_profile(&self, vc: &ViewerContext, update: ProfileUpdate) -> AppResult<User> {
        let mut user = self.profile(vc).await?;
        ensure_allowed(vc.actor(), PrivacyOperation::Update, PrivacyTarget::User(&user))?;

        if let Some(username) = update.username {
            let username = username.trim().to_string();
            validate_username(&username)?;
            user.username = username;
        }
        if let Some(email) = update.email {
            validate_email(&email)?;
            user.email = email;
        }
        if let Some(bio) = update.bio {
            user.bio = Some(bio).filter(|b| !b.is_empty());
        }
        if let Some(picture) = update.profile_picture {
            user.profile_picture = Some(picture).filter(|p| !p.is_empty());
        }

        self.db.update_user(&user).await.map_err(username_taken)
    }

    /// Accounts are never removed, only switched off
    #[instrument(skip(self, vc), fields(request_id = %vc.request_id))]
    pub async fn deactivate(&self, vc: &ViewerContext) -> AppResult<()> {
        let mut user = self.profile(vc).await?;
        ensure_allowed(vc.actor(), PrivacyOperation::Update, PrivacyTarget::User(&user))?;

        user.is_active = false;
        self.db.update_user(&user).await?;
        info!("User {} deactivated", user.username);
        Ok(())
    }

    pub async fn get_by_username(&self, username: &str) -> AppResult<User> {
        self.db
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", username)))
    }

    pub async fn search(&self, vc: &ViewerContext, username: Option<&str>) -> AppResult<Vec<User>> {
        vc.require_user()?;
        self.db.search_users(username).await
    }
}
