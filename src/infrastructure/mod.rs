// Core infrastructure modules
pub mod database;              // Record store interface
pub mod sqlite_database;       // SQLite record store
pub mod security;              // Password hashing and JWTs
pub mod viewer;                // Viewer context
pub mod middleware;            // Viewer context middleware and extractor

pub use database::{DatabaseInterface, PostQuery};
pub use security::{Claims, SecurityService, TokenPair, TokenType};
pub use sqlite_database::SqliteDatabase;
pub use viewer::ViewerContext;
