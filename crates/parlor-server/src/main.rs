use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use parlor_api::auth::{self, AppState, AppStateInner};
use parlor_api::{chat, polls, posts};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parlor=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("PARLOR_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("PARLOR_DB_PATH").unwrap_or_else(|_| "parlor.db".into());
    let host = std::env::var("PARLOR_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("PARLOR_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = parlor_db::Database::open(&PathBuf::from(&db_path))?;

    let app_state: AppState = Arc::new(AppStateInner { db, jwt_secret });

    // Routes. Core endpoints carry explicit user ids per the client
    // contract; register/login issue the tokens the client holds on to.
    let app = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/posts", post(posts::create_post).get(posts::feed))
        .route(
            "/posts/{post_id}/comments",
            post(posts::create_comment).get(posts::list_comments),
        )
        .route("/posts/{post_id}/like", post(posts::like))
        .route("/posts/{post_id}/unlike", post(posts::unlike))
        .route("/posts/{post_id}/save", post(posts::toggle_save))
        .route("/posts/{post_id}/poll", post(polls::create_poll))
        .route("/polls/{poll_id}", get(polls::fetch_poll))
        .route("/polls/{poll_id}/vote", post(polls::vote))
        .route("/chat/rooms", post(chat::get_or_create_room))
        .route("/chat/messages", post(chat::send_message))
        .route("/chat/rooms/{room_id}/messages", get(chat::list_messages))
        .route("/chat/rooms/{room_id}/mark-read", post(chat::mark_read))
        .route("/users/{user_id}/chat-rooms", get(chat::list_rooms))
        .route("/users/{user_id}/unread-messages", get(chat::unread_count))
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("parlor server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
