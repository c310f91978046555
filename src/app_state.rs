use std::sync::Arc;

use crate::{
    config::Config,
    error::AppResult,
    infrastructure::{
        database::DatabaseInterface, middleware::HasAuthentication, security::SecurityService,
        sqlite_database::SqliteDatabase,
    },
    services::{AuthService, CommentService, FollowService, PostScheduler, PostService, UserService},
};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseInterface>,
    pub security: Arc<SecurityService>,
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub follows: Arc<FollowService>,
    pub scheduler: Arc<PostScheduler>,
    pub config: Config,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let database = SqliteDatabase::connect(&config.database.url).await?;
        Ok(Self::with_database(Arc::new(database), config))
    }

    /// Wire every service around an existing record store
    pub fn with_database(db: Arc<dyn DatabaseInterface>, config: Config) -> Self {
        let security = Arc::new(SecurityService::new(&config.auth));

        Self {
            auth: Arc::new(AuthService::new(db.clone(), security.clone())),
            users: Arc::new(UserService::new(
                db.clone(),
                security.clone(),
                config.auth.password_min_length,
            )),
            posts: Arc::new(PostService::new(db.clone())),
            comments: Arc::new(CommentService::new(db.clone())),
            follows: Arc::new(FollowService::new(db.clone())),
            scheduler: Arc::new(PostScheduler::new(db.clone())),
            db,
            security,
            config,
        }
    }
}

impl HasAuthentication for AppState {
    fn security(&self) -> &Arc<SecurityService> {
        &self.security
    }

    fn database(&self) -> &Arc<dyn DatabaseInterface> {
        &self.db
    }
}
