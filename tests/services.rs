use std::sync::Arc;

use chrono::{Duration, Utc};

use social_graph_api::{
    app_state::AppState,
    config::Config,
    error::AppError,
    infrastructure::{database::DatabaseInterface, sqlite_database::SqliteDatabase, viewer::ViewerContext},
    models::{NewPost, User},
    services::{scheduler::publish_scheduled, LikeToggle, RegisterUser, ScheduleRequest},
};

async fn state() -> AppState {
    let db: Arc<dyn DatabaseInterface> = Arc::new(SqliteDatabase::new_in_memory().await.unwrap());
    AppState::with_database(db, Config::for_testing())
}

async fn user(state: &AppState, username: &str) -> (User, ViewerContext) {
    let user = state
        .users
        .register(RegisterUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: "password123".to_string(),
        })
        .await
        .unwrap();
    let vc = ViewerContext::authenticated_user(user.id, user.username.clone(), format!("test-{}", username));
    (user, vc)
}

#[tokio::test]
async fn test_scheduled_post_is_published() {
    let state = state().await;
    let (alice, vc) = user(&state, "alice").await;

    let due = (Utc::now() + Duration::seconds(2)).format("%Y-%m-%d %H:%M:%S").to_string();
    let (scheduled, handle) = state
        .scheduler
        .schedule(
            &vc,
            ScheduleRequest {
                content: "from the future".to_string(),
                media: None,
                schedule_time: due,
            },
        )
        .unwrap();
    assert_eq!(scheduled.author_id, alice.id);

    let post = handle.await.unwrap().expect("post should be published");
    assert_eq!(post.author_id, alice.id);
    assert!(Utc::now() >= scheduled.schedule_time);

    let own = state.posts.own_posts(&vc).await.unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].content, "from the future");
}

#[tokio::test]
async fn test_scheduled_post_dropped_for_deactivated_author() {
    let state = state().await;
    let (alice, vc) = user(&state, "alice").await;
    state.users.deactivate(&vc).await.unwrap();

    let result = publish_scheduled(
        state.db.as_ref(),
        NewPost {
            author_id: alice.id,
            content: "never".to_string(),
            media: None,
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_anonymous_cannot_schedule() {
    let state = state().await;
    let vc = ViewerContext::anonymous("test-anon".to_string());
    let result = state.scheduler.schedule(
        &vc,
        ScheduleRequest {
            content: "hi".to_string(),
            media: None,
            schedule_time: "2999-01-01 00:00:00".to_string(),
        },
    );
    assert!(matches!(result, Err(AppError::Unauthorized(_))));
}

#[tokio::test]
async fn test_concurrent_likes_leave_one_edge() {
    let state = state().await;
    let (_, alice) = user(&state, "alice").await;
    let (_, bob) = user(&state, "bob").await;
    let post = state.posts.create(&alice, "popular".to_string(), None).await.unwrap();

    // Two toggles racing from the same user: the store keeps at most one like
    let (a, b) = tokio::join!(state.posts.toggle_like(&bob, post.id), state.posts.toggle_like(&bob, post.id));
    let liked = [a.unwrap(), b.unwrap()]
        .iter()
        .filter(|t| matches!(t, LikeToggle::Liked(_)))
        .count();
    assert!(liked >= 1);

    let count = state.posts.get(post.id).await.unwrap().likes_count;
    assert!(count <= 1);
}

#[tokio::test]
async fn test_post_author_moderates_comments() {
    let state = state().await;
    let (_, alice) = user(&state, "alice").await;
    let (_, bob) = user(&state, "bob").await;
    let (_, carol) = user(&state, "carol").await;

    let post = state.posts.create(&alice, "thread".to_string(), None).await.unwrap();
    let first = state.comments.create(&bob, post.id, "one".to_string()).await.unwrap();
    let second = state.comments.create(&bob, post.id, "two".to_string()).await.unwrap();

    assert!(matches!(
        state.comments.delete(&carol, first.id).await,
        Err(AppError::Forbidden(_))
    ));
    state.comments.delete(&alice, first.id).await.unwrap();
    state.comments.delete(&bob, second.id).await.unwrap();
    assert!(state.comments.list(post.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_records_survive_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("nested").join("social.db").display());

    let mut config = Config::for_testing();
    config.database.url = url.clone();

    {
        let state = AppState::new(config.clone()).await.unwrap();
        let (_, alice) = user(&state, "alice").await;
        state.posts.create(&alice, "persisted".to_string(), None).await.unwrap();
    }

    let state = AppState::new(config).await.unwrap();
    let alice = state.users.get_by_username("alice").await.unwrap();
    let tokens = state.auth.login("alice", "password123").await.unwrap();
    assert!(!tokens.access.is_empty());

    let vc = ViewerContext::authenticated_user(alice.id, alice.username, "test-reopen".to_string());
    let posts = state.posts.own_posts(&vc).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].content, "persisted");
}
