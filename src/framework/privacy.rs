// Privacy rules - who may create, read, update or delete which record
// Pure evaluation: no I/O, callers persist only after an Allow

use serde::Serialize;

use crate::{
    core::UserId,
    error::AppResult,
    models::{Comment, EntityKind, Follow, Like, Post, User},
};

/// Identity performing an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Actor {
    Anonymous,
    User(UserId),
}

impl Actor {
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Actor::User(id) => Some(*id),
            Actor::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Actor::User(_))
    }

    /// True when the actor is the given user
    pub fn is(&self, user_id: UserId) -> bool {
        self.user_id() == Some(user_id)
    }
}

/// Operations that can be controlled by privacy rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PrivacyOperation {
    Create,
    Read,
    Update,
    Delete,
}

/// Record (or record class, for creation) an operation targets.
///
/// A comment is always evaluated together with the post it hangs off,
/// since the post's author may moderate it.
#[derive(Debug, Clone, Copy)]
pub enum PrivacyTarget<'a> {
    Class(EntityKind),
    User(&'a User),
    Post(&'a Post),
    Comment { comment: &'a Comment, post: &'a Post },
    Like(&'a Like),
    Follow(&'a Follow),
}

impl PrivacyTarget<'_> {
    pub fn kind(&self) -> EntityKind {
        match self {
            PrivacyTarget::Class(kind) => *kind,
            PrivacyTarget::User(_) => EntityKind::User,
            PrivacyTarget::Post(_) => EntityKind::Post,
            PrivacyTarget::Comment { .. } => EntityKind::Comment,
            PrivacyTarget::Like(_) => EntityKind::Like,
            PrivacyTarget::Follow(_) => EntityKind::Follow,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DenyReason {
    Unauthenticated,
    Forbidden,
}

/// Privacy rule result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivacyResult {
    Allow,
    Deny(DenyReason),
}

impl PrivacyResult {
    pub fn into_result(self) -> AppResult<()> {
        match self {
            PrivacyResult::Allow => Ok(()),
            PrivacyResult::Deny(reason) => Err(reason.into()),
        }
    }
}

fn allow_if(condition: bool) -> PrivacyResult {
    if condition {
        PrivacyResult::Allow
    } else {
        PrivacyResult::Deny(DenyReason::Forbidden)
    }
}

/// Evaluate the privacy rules in order; the first matching rule decides.
pub fn authorize(actor: Actor, operation: PrivacyOperation, target: PrivacyTarget<'_>) -> PrivacyResult {
    use PrivacyOperation::*;

    match (operation, target) {
        // Everything is publicly readable
        (Read, _) => PrivacyResult::Allow,

        (Create, _) => {
            if actor.is_authenticated() {
                PrivacyResult::Allow
            } else {
                PrivacyResult::Deny(DenyReason::Unauthenticated)
            }
        }

        (Update | Delete, PrivacyTarget::Post(post)) => allow_if(actor.is(post.author_id)),

        (Update | Delete, PrivacyTarget::Comment { comment, post }) => {
            debug_assert_eq!(comment.post_id, post.id);
            allow_if(actor.is(comment.author_id) || actor.is(post.author_id))
        }

        (Delete, PrivacyTarget::Like(like)) => allow_if(actor.is(like.user_id)),
        (Delete, PrivacyTarget::Follow(follow)) => allow_if(actor.is(follow.follower_id)),

        // Profile edits and deactivation are the owner's alone
        (Update, PrivacyTarget::User(user)) => allow_if(actor.is(user.id)),

        // Users are deactivated, never deleted; edges are never edited
        (Delete, PrivacyTarget::User(_))
        | (Update, PrivacyTarget::Like(_) | PrivacyTarget::Follow(_))
        | (Update | Delete, PrivacyTarget::Class(_)) => PrivacyResult::Deny(DenyReason::Forbidden),
    }
}

/// Evaluate and log a denial; returns an error the boundary turns into 401/403.
pub fn ensure_allowed(actor: Actor, operation: PrivacyOperation, target: PrivacyTarget<'_>) -> AppResult<()> {
    let result = authorize(actor, operation, target);
    if let PrivacyResult::Deny(reason) = result {
        tracing::warn!(
            ?actor,
            ?operation,
            entity = %target.kind(),
            ?reason,
            "privacy check denied"
        );
    }
    result.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CommentId, FollowId, LikeId, PostId};
    use chrono::Utc;

    fn user(id: i64) -> User {
        User {
            id: UserId::new(id),
            username: format!("user{}", id),
            email: format!("user{}@example.com", id),
            password_hash: String::new(),
            bio: None,
            profile_picture: None,
            is_active: true,
            date_joined: Utc::now(),
        }
    }

    fn post_by(author: i64) -> Post {
        Post {
            id: PostId::new(10),
            author_id: UserId::new(author),
            content: "hello".to_string(),
            media: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn comment_by(author: i64, post: &Post) -> Comment {
        Comment {
            id: CommentId::new(20),
            author_id: UserId::new(author),
            post_id: post.id,
            content: "nice".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn like_by(liker: i64) -> Like {
        Like {
            id: LikeId::new(30),
            user_id: UserId::new(liker),
            post_id: PostId::new(10),
            created_at: Utc::now(),
        }
    }

    fn follow(follower: i64, following: i64) -> Follow {
        Follow {
            id: FollowId::new(40),
            follower_id: UserId::new(follower),
            following_id: UserId::new(following),
            created_at: Utc::now(),
        }
    }

    const FORBIDDEN: PrivacyResult = PrivacyResult::Deny(DenyReason::Forbidden);

    fn actors() -> Vec<Actor> {
        vec![Actor::Anonymous, Actor::User(UserId::new(1)), Actor::User(UserId::new(2))]
    }

    #[test]
    fn test_read_is_always_allowed() {
        let post = post_by(1);
        let comment = comment_by(2, &post);
        let like = like_by(2);
        let edge = follow(1, 2);
        let owner = user(1);

        for actor in actors() {
            let targets = [
                PrivacyTarget::User(&owner),
                PrivacyTarget::Post(&post),
                PrivacyTarget::Comment { comment: &comment, post: &post },
                PrivacyTarget::Like(&like),
                PrivacyTarget::Follow(&edge),
                PrivacyTarget::Class(EntityKind::Post),
            ];
            for target in targets {
                assert_eq!(authorize(actor, PrivacyOperation::Read, target), PrivacyResult::Allow);
            }
        }
    }

    #[test]
    fn test_create_requires_authentication() {
        assert_eq!(
            authorize(Actor::Anonymous, PrivacyOperation::Create, PrivacyTarget::Class(EntityKind::Post)),
            PrivacyResult::Deny(DenyReason::Unauthenticated)
        );
        for kind in [EntityKind::Post, EntityKind::Comment, EntityKind::Like, EntityKind::Follow] {
            assert_eq!(
                authorize(Actor::User(UserId::new(5)), PrivacyOperation::Create, PrivacyTarget::Class(kind)),
                PrivacyResult::Allow
            );
        }
    }

    #[test]
    fn test_only_author_mutates_post() {
        let post = post_by(1);
        for op in [PrivacyOperation::Update, PrivacyOperation::Delete] {
            assert_eq!(authorize(Actor::User(UserId::new(1)), op, PrivacyTarget::Post(&post)), PrivacyResult::Allow);
            assert_eq!(authorize(Actor::User(UserId::new(2)), op, PrivacyTarget::Post(&post)), FORBIDDEN);
            assert_eq!(authorize(Actor::Anonymous, op, PrivacyTarget::Post(&post)), FORBIDDEN);
        }
    }

    #[test]
    fn test_post_author_moderates_comments() {
        let post = post_by(1);
        let comment = comment_by(2, &post);
        let target = PrivacyTarget::Comment { comment: &comment, post: &post };

        for op in [PrivacyOperation::Update, PrivacyOperation::Delete] {
            assert_eq!(authorize(Actor::User(UserId::new(2)), op, target), PrivacyResult::Allow);
            assert_eq!(authorize(Actor::User(UserId::new(1)), op, target), PrivacyResult::Allow);
            assert_eq!(authorize(Actor::User(UserId::new(3)), op, target), FORBIDDEN);
        }
    }

    #[test]
    fn test_only_initiator_removes_edges() {
        let like = like_by(2);
        assert_eq!(
            authorize(Actor::User(UserId::new(2)), PrivacyOperation::Delete, PrivacyTarget::Like(&like)),
            PrivacyResult::Allow
        );
        assert_eq!(
            authorize(Actor::User(UserId::new(1)), PrivacyOperation::Delete, PrivacyTarget::Like(&like)),
            FORBIDDEN
        );

        let edge = follow(1, 2);
        assert_eq!(
            authorize(Actor::User(UserId::new(1)), PrivacyOperation::Delete, PrivacyTarget::Follow(&edge)),
            PrivacyResult::Allow
        );
        // The followed side cannot remove the edge
        assert_eq!(
            authorize(Actor::User(UserId::new(2)), PrivacyOperation::Delete, PrivacyTarget::Follow(&edge)),
            FORBIDDEN
        );
        assert_eq!(
            authorize(Actor::User(UserId::new(1)), PrivacyOperation::Update, PrivacyTarget::Follow(&edge)),
            FORBIDDEN
        );
    }

    #[test]
    fn test_users_edit_only_themselves_and_are_never_deleted() {
        let owner = user(1);
        assert_eq!(
            authorize(Actor::User(UserId::new(1)), PrivacyOperation::Update, PrivacyTarget::User(&owner)),
            PrivacyResult::Allow
        );
        assert_eq!(
            authorize(Actor::User(UserId::new(2)), PrivacyOperation::Update, PrivacyTarget::User(&owner)),
            FORBIDDEN
        );
        assert_eq!(
            authorize(Actor::User(UserId::new(1)), PrivacyOperation::Delete, PrivacyTarget::User(&owner)),
            FORBIDDEN
        );
    }

    #[test]
    fn test_into_result_maps_reasons() {
        assert!(PrivacyResult::Allow.into_result().is_ok());
        assert!(matches!(
            PrivacyResult::Deny(DenyReason::Unauthenticated).into_result(),
            Err(crate::error::AppError::Unauthorized(_))
        ));
        assert!(matches!(FORBIDDEN.into_result(), Err(crate::error::AppError::Forbidden(_))));
    }
}
