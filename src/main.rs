use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use time_travel_booth::{
    server::{self, AppState},
    Config, GeminiHttp, ImageService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "time_travel_booth=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    let gemini = GeminiHttp::new(&config.gemini).context("cannot start Gemini client")?;
    let service = ImageService::new(Arc::new(gemini), config.gemini.models.clone());

    tracing::info!(
        describe_model = %config.gemini.models.describe,
        edit_model = %config.gemini.models.edit,
        "Gemini client ready"
    );

    let app = server::router(AppState::new(service), config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    tracing::info!("Server running on http://{}", config.addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
