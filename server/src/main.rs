mod db;
mod llm;
mod routes;
mod services;
mod state;

use std::sync::Arc;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()
        .expect("invalid PORT");

    let pool = db::init_pool(&database_url)
        .await
        .expect("database init failed");

    // Completion service is optional: without it the server still serves the
    // directory and voice routes, and the relay answers 503.
    let completions: Option<Arc<dyn llm::Completions>> = match llm::OpenAiCompletions::from_env() {
        Ok(client) => {
            tracing::info!(model = client.model(), "completion provider initialized");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "completion provider not configured, relay disabled");
            None
        }
    };

    let assets = services::storage::AssetConfig::from_env().expect("asset storage init failed");
    let state = state::AppState::new(pool, completions, assets);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "conversation server listening");
    axum::serve(listener, app).await.expect("server failed");
}
