//! The platform: auth, rows and object storage behind one axum router.

pub mod auth;
pub mod handlers;
mod routes;
pub mod storage;

use std::sync::Arc;

use axum::{routing::get, Router};
use sqlx::{Pool, Sqlite};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::database::db::{connection, migrate};
use storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub db: Pool<Sqlite>,
    pub storage: Storage,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: Pool<Sqlite>, config: ServerConfig) -> Self {
        let storage = Storage::new(config.storage_root.clone(), &config.public_base_url);
        Self {
            db,
            storage,
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "Backend is running" }))
        .merge(routes::auth_routes())
        .merge(routes::rest_routes())
        .merge(routes::storage_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let pool = connection::get_db_pool(&config.database_url).await?;
    migrate::run_migrations(&pool).await?;

    let addr = config.bind_addr;
    let app = router(AppState::new(pool, config));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("platform listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
