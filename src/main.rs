//! ebazaar API server entrypoint.

use anyhow::Result;
use axum::http::HeaderValue;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ebazaar::auth::AuthKeys;
use ebazaar::config::Config;
use ebazaar::http::{self, AppState};
use ebazaar::images::FsImageStore;
use ebazaar::store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let state = AppState {
        store: Arc::new(PgStore::new(pool)),
        images: Arc::new(FsImageStore::new(
            config.media_root.clone(),
            config.public_base_url.clone(),
        )),
        auth: Arc::new(AuthKeys::from_config(&config)),
    };

    let app = http::router(state, Some(config.media_root.as_path()))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config));

    let listener =
        tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!("🚀 ebazaar API listening on 0.0.0.0:{}", config.port);
    axum::serve(listener, app).await?;
    Ok(())
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
