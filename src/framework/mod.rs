// Framework - access rules shared by every service

pub mod privacy;

pub use privacy::{authorize, ensure_allowed, Actor, DenyReason, PrivacyOperation, PrivacyResult, PrivacyTarget};
