mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicI64;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use hearth_api::auth::{self, AppState, AppStateInner};
use hearth_api::middleware::require_auth;
use hearth_api::{admin, approvals, messages, rules};
use hearth_gateway::connection;
use hearth_gateway::dispatcher::Dispatcher;

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hearth=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database; an empty board gets the default house rules
    let db = hearth_db::Database::open(&PathBuf::from(&config.db_path))?;
    let seeded = hearth_db::seed::seed_default_rules(&db)?;
    if seeded > 0 {
        info!("Rules board seeded with {} default rules", seeded);
    }
    let generation = db.reset_generation()?;

    // Shared state
    let dispatcher = Dispatcher::new();
    let state: AppState = Arc::new(AppStateInner {
        db,
        dispatcher,
        jwt_secret: config.jwt_secret.clone(),
        admin_name: config.admin_name.clone(),
        admin_password: config.admin_password.clone(),
        max_users: config.max_users,
        reset_generation: AtomicI64::new(generation),
    });

    // Routes
    let public_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/auth/session", get(auth::session))
        .route("/rules", get(rules::list_rules).post(rules::create_rule))
        .route(
            "/rules/{id}",
            patch(rules::update_rule).delete(rules::delete_rule),
        )
        .route(
            "/approvals",
            get(approvals::list_approvals).post(approvals::record_approval),
        )
        .route(
            "/messages",
            get(messages::list_messages).post(messages::send_message),
        )
        .route("/messages/{id}/read", post(messages::mark_read))
        .route("/messages/read-all", post(messages::mark_all_read))
        .route("/admin/reset", post(admin::reset_all))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Hearth server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let dispatcher = state.dispatcher.clone();
    let jwt_secret = state.jwt_secret.clone();
    let generation = state.current_generation();
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, dispatcher, jwt_secret, generation)
    })
}
