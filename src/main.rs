mod config;
mod db;
mod entities;
mod error;
mod filter;
mod middleware;
mod models;
mod movies;
mod normalize;
mod pagination;
mod response;
mod routes;
mod stats;
mod validation;

use std::sync::Arc;

use crate::{config::Config, movies::MovieService};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub movies: MovieService,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,cinedex=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    if config.api_key.is_none() {
        tracing::warn!("API_KEY is not set; every request to a mutating endpoint will be rejected");
    }

    let db = db::connect_and_migrate(&config).await?;
    let movies = MovieService::new(db.clone());

    let state = Arc::new(AppState { config: config.clone(), movies });
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutting down");
        })
        .await?;

    db.close().await?;
    Ok(())
}
