// Web server for the sketch-to-image camera page and transform endpoint

use std::sync::Arc;

use sketch_to_image::{router, AppState, Config, ReplicateClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sketch_to_image=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let generator = ReplicateClient::new(&config.provider)?;

    let state = AppState::new(Arc::new(generator)).with_body_limit(config.max_upload_bytes);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    tracing::info!(addr = %config.bind_addr, model = %config.provider.model, "server running");
    tracing::info!("open http://localhost:{}/camera to start capturing", config.bind_addr.port());

    axum::serve(listener, app).await?;
    Ok(())
}
