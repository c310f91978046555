// Social Graph API - users, posts, comments, likes and follows behind one set of privacy rules

// Core types and primitives
pub mod core;

// Persisted records
pub mod models;

// Privacy rules
pub mod framework;

// Record store, security and viewer resolution
pub mod infrastructure;

// Application services
pub mod services;

// HTTP wiring
pub mod app_state;
pub mod social_interface;

// Common utilities
pub mod config;
pub mod error;

// Re-exports for convenience
pub use app_state::AppState;
pub use error::{AppError, AppResult};
pub use social_interface::create_social_router;
