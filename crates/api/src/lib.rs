pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;
pub mod ws;

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use state::AppState;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/me", get(routes::auth::me));

    let room_routes = Router::new()
        .route("/", get(routes::room::list).post(routes::room::create))
        .route("/{room_code}", get(routes::room::get))
        .route("/{room_code}/join", post(routes::room::join))
        .route("/{room_code}/leave", post(routes::room::leave))
        .route("/{room_code}/end", post(routes::room::end))
        .route("/{room_code}/participant", get(routes::room::participants))
        .route("/{room_code}/message", get(routes::room::messages));

    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/room", room_routes);

    let static_dir = state.settings.static_files.static_dir.clone();

    Router::new()
        .nest("/api", api)
        .route("/health", get(health_check))
        .route("/ws/{room_code}", get(ws::handler::ws_upgrade))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "active_rooms": state.hub.room_count(),
        "active_connections": state.hub.connection_count(),
    }))
}
