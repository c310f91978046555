// HTTP surface - thin handlers that hand the viewer context to the services

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    app_state::AppState,
    core::{CommentId, PostId},
    error::AppError,
    infrastructure::middleware::{viewer_context_middleware, ApiJson, ApiPath, ApiQuery, Vc},
    models::{Comment, Post, PostDetail, User, UserResponse},
    services::{CommentUpdate, LikeToggle, PostUpdate, ProfileUpdate, RegisterUser, ScheduleRequest},
};

// HTTP Request types
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    pub token: String,
}

#[derive(Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
    pub media: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

#[derive(Deserialize)]
pub struct UsernameQuery {
    pub username: Option<String>,
}

#[derive(Deserialize)]
pub struct PostSearchQuery {
    pub search_criteria: Option<String>,
}

fn users_json(users: Vec<User>) -> Json<Vec<UserResponse>> {
    Json(users.into_iter().map(UserResponse::from).collect())
}

// Auth handlers

pub async fn register_handler(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterUser>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let user = state.users.register(req).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn login_handler(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let pair = state.auth.login(&req.username, &req.password).await?;
    Ok(Json(json!({"access": pair.access, "refresh": pair.refresh})))
}

pub async fn logout_handler(
    State(state): State<AppState>,
    vc: Vc,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> Result<StatusCode, AppError> {
    state.auth.logout(&vc, &req.refresh).await?;
    Ok(StatusCode::RESET_CONTENT)
}

pub async fn refresh_handler(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> Result<Json<Value>, AppError> {
    let access = state.auth.refresh(&req.refresh).await?;
    Ok(Json(json!({"access": access})))
}

pub async fn verify_handler(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<VerifyRequest>,
) -> Result<Json<Value>, AppError> {
    state.auth.verify(&req.token).await?;
    Ok(Json(json!({})))
}

// User handlers

pub async fn get_profile_handler(State(state): State<AppState>, vc: Vc) -> Result<Json<UserResponse>, AppError> {
    let user = state.users.profile(&vc).await?;
    Ok(Json(user.into()))
}

pub async fn update_profile_handler(
    State(state): State<AppState>,
    vc: Vc,
    ApiJson(req): ApiJson<ProfileUpdate>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.users.update_profile(&vc, req).await?;
    Ok(Json(user.into()))
}

pub async fn deactivate_handler(State(state): State<AppState>, vc: Vc) -> Result<StatusCode, AppError> {
    state.users.deactivate(&vc).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_user_handler(
    State(state): State<AppState>,
    ApiPath(username): ApiPath<String>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.users.get_by_username(&username).await?;
    Ok(Json(user.into()))
}

pub async fn search_users_handler(
    State(state): State<AppState>,
    vc: Vc,
    ApiQuery(params): ApiQuery<UsernameQuery>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let users = state.users.search(&vc, params.username.as_deref()).await?;
    Ok(users_json(users))
}

// Follow handlers

pub async fn follow_handler(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(username): ApiPath<String>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    state.follows.follow(&vc, &username).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({"message": format!("You are now following {}.", username)})),
    ))
}

pub async fn unfollow_handler(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(username): ApiPath<String>,
) -> Result<StatusCode, AppError> {
    state.follows.unfollow(&vc, &username).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn following_handler(State(state): State<AppState>, vc: Vc) -> Result<Json<Vec<UserResponse>>, AppError> {
    Ok(users_json(state.follows.following(&vc).await?))
}

pub async fn followers_handler(State(state): State<AppState>, vc: Vc) -> Result<Json<Vec<UserResponse>>, AppError> {
    Ok(users_json(state.follows.followers(&vc).await?))
}

// Post handlers

pub async fn list_posts_handler(
    State(state): State<AppState>,
    vc: Vc,
    ApiQuery(params): ApiQuery<UsernameQuery>,
) -> Result<Json<Vec<Post>>, AppError> {
    Ok(Json(state.posts.list(&vc, params.username.as_deref()).await?))
}

pub async fn create_post_handler(
    State(state): State<AppState>,
    vc: Vc,
    ApiJson(req): ApiJson<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let post = state.posts.create(&vc, req.content, req.media).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn get_post_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<PostId>,
) -> Result<Json<PostDetail>, AppError> {
    Ok(Json(state.posts.get(id).await?))
}

pub async fn update_post_handler(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(id): ApiPath<PostId>,
    ApiJson(req): ApiJson<PostUpdate>,
) -> Result<Json<Post>, AppError> {
    Ok(Json(state.posts.update(&vc, id, req).await?))
}

pub async fn delete_post_handler(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(id): ApiPath<PostId>,
) -> Result<StatusCode, AppError> {
    state.posts.delete(&vc, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn like_handler(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(id): ApiPath<PostId>,
) -> Result<Response, AppError> {
    let response = match state.posts.toggle_like(&vc, id).await? {
        LikeToggle::Liked(_) => (StatusCode::CREATED, Json(json!({"message": "Post liked."}))).into_response(),
        LikeToggle::Unliked => StatusCode::NO_CONTENT.into_response(),
    };
    Ok(response)
}

pub async fn likers_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<PostId>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    Ok(users_json(state.posts.likers(id).await?))
}

pub async fn own_posts_handler(State(state): State<AppState>, vc: Vc) -> Result<Json<Vec<Post>>, AppError> {
    Ok(Json(state.posts.own_posts(&vc).await?))
}

pub async fn following_posts_handler(State(state): State<AppState>, vc: Vc) -> Result<Json<Vec<Post>>, AppError> {
    Ok(Json(state.posts.following_posts(&vc).await?))
}

pub async fn search_posts_handler(
    State(state): State<AppState>,
    vc: Vc,
    ApiQuery(params): ApiQuery<PostSearchQuery>,
) -> Result<Json<Vec<Post>>, AppError> {
    Ok(Json(state.posts.search(&vc, params.search_criteria.as_deref()).await?))
}

pub async fn schedule_post_handler(
    State(state): State<AppState>,
    vc: Vc,
    ApiJson(req): ApiJson<ScheduleRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    // The publishing task runs detached; its outcome is only logged
    let (scheduled, _handle) = state.scheduler.schedule(&vc, req)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Post scheduled successfully.",
            "schedule_time": scheduled.schedule_time,
        })),
    ))
}

// Comment handlers

pub async fn list_comments_handler(
    State(state): State<AppState>,
    ApiPath(post_id): ApiPath<PostId>,
) -> Result<Json<Vec<Comment>>, AppError> {
    Ok(Json(state.comments.list(post_id).await?))
}

pub async fn create_comment_handler(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(post_id): ApiPath<PostId>,
    ApiJson(req): ApiJson<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let comment = state.comments.create(&vc, post_id, req.content).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn get_comment_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CommentId>,
) -> Result<Json<Comment>, AppError> {
    Ok(Json(state.comments.get(id).await?))
}

pub async fn update_comment_handler(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(id): ApiPath<CommentId>,
    ApiJson(req): ApiJson<CommentUpdate>,
) -> Result<Json<Comment>, AppError> {
    Ok(Json(state.comments.update(&vc, id, req).await?))
}

pub async fn delete_comment_handler(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(id): ApiPath<CommentId>,
) -> Result<StatusCode, AppError> {
    state.comments.delete(&vc, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// All routes, to be nested under `/api/v1`
pub fn create_social_router(state: AppState) -> Router {
    Router::new()
        // Auth
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .route("/logout", post(logout_handler))
        .route("/token/refresh", post(refresh_handler))
        .route("/token/verify", post(verify_handler))

        // Users and follows
        .route(
            "/profile",
            get(get_profile_handler).patch(update_profile_handler).delete(deactivate_handler),
        )
        .route("/users/{username}", get(get_user_handler))
        .route("/search", get(search_users_handler))
        .route("/follow/{username}", post(follow_handler))
        .route("/unfollow/{username}", post(unfollow_handler))
        .route("/following", get(following_handler))
        .route("/followers", get(followers_handler))

        // Posts and likes
        .route("/posts", get(list_posts_handler).post(create_post_handler))
        .route("/posts/schedule", post(schedule_post_handler))
        .route(
            "/posts/{id}",
            get(get_post_handler).patch(update_post_handler).delete(delete_post_handler),
        )
        .route("/posts/{id}/like", post(like_handler))
        .route("/posts/{id}/likes", get(likers_handler))
        .route("/own-posts", get(own_posts_handler))
        .route("/following-posts", get(following_posts_handler))
        .route("/search-posts", get(search_posts_handler))

        // Comments
        .route("/posts/{id}/comments", get(list_comments_handler).post(create_comment_handler))
        .route(
            "/comments/{id}",
            get(get_comment_handler).patch(update_comment_handler).delete(delete_comment_handler),
        )

        .layer(middleware::from_fn_with_state(
            state.clone(),
            viewer_context_middleware::<AppState>,
        ))
        .with_state(state)
}
