use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use docqa_core::{
    completion_providers_from_settings, EmbeddingRegistry, PostgresStore, Settings,
};
use docqa_server::routes;
use docqa_server::state::AppState;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "docqa-server", version)]
struct Cli {
    /// Address to bind the HTTP API to.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
    bind: String,

    /// PostgreSQL connection string; overrides DATABASE_URL from the
    /// environment settings.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut settings = Settings::from_env();
    if let Some(database_url) = cli.database_url {
        settings.database_url = database_url;
    }

    let store = PostgresStore::connect(&settings.database_url)
        .await
        .context("connecting to postgres")?;
    store.ensure_schema().await.context("preparing schema")?;

    let registry = Arc::new(EmbeddingRegistry::from_settings(&settings));
    let completions = completion_providers_from_settings(&settings);

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        default_model = registry.default_model(),
        embedding_models = registry.available_models().iter().filter(|m| m.available).count(),
        completion_backends = completions.len(),
        "docqa-server boot"
    );

    let state = AppState::new(
        Arc::new(store),
        registry,
        completions,
        Arc::new(settings),
    );

    let app = routes::router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&cli.bind)
        .await
        .with_context(|| format!("binding {}", cli.bind))?;
    info!(bind = %cli.bind, "listening");

    axum::serve(listener, app).await?;

    Ok(())
}
