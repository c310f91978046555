// Application services - each mutation passes the privacy rules before it is persisted
pub mod auth_service;
pub mod comment_service;
pub mod follow_service;
pub mod post_service;
pub mod scheduler;
pub mod user_service;

pub use auth_service::AuthService;
pub use comment_service::{CommentService, CommentUpdate};
pub use follow_service::FollowService;
pub use post_service::{LikeToggle, PostService, PostUpdate};
pub use scheduler::{PostScheduler, ScheduleRequest, ScheduledPost};
pub use user_service::{ProfileUpdate, RegisterUser, UserService};
