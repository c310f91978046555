// Social Graph API Server

use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use social_graph_api::{app_state::AppState, config::Config, social_interface::create_social_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(?config, "Configuration loaded");

    // Initialize application state
    let app_state = AppState::new(config.clone()).await?;

    // Build main application router
    let app = Router::new()
        .nest("/api/v1", create_social_router(app_state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = config.server_address();
    let listener = TcpListener::bind(&addr).await?;
    info!("Social Graph API listening on http://{}", listener.local_addr()?);
    info!("  POST   /api/v1/register, /api/v1/login, /api/v1/logout");
    info!("  GET    /api/v1/posts, /api/v1/posts/{{id}}, /api/v1/posts/{{id}}/comments");
    info!("  POST   /api/v1/posts/{{id}}/like, /api/v1/follow/{{username}}");

    axum::serve(listener, app).await?;

    Ok(())
}
