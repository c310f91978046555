// Strong Types - newtype ids for every persisted record
// Keeps a PostId from being passed where a UserId is expected

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn new(id: i64) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

record_id!(
    /// Strongly-typed user ID
    UserId
);
record_id!(
    /// Strongly-typed post ID
    PostId
);
record_id!(
    /// Strongly-typed comment ID
    CommentId
);
record_id!(LikeId);
record_id!(FollowId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_operations() {
        let id = UserId::new(123);
        assert_eq!(i64::from(id), 123);
        assert_eq!(CommentId::from(7).to_string(), "7");
    }

    #[test]
    fn test_record_id_serializes_as_bare_number() {
        let json = serde_json::to_string(&PostId::new(42)).unwrap();
        assert_eq!(json, "42");
        let back: UserId = serde_json::from_str("9").unwrap();
        assert_eq!(back, UserId::new(9));
    }
}
