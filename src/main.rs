use hypertension_predictor::{config::Config, server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = Config::from_env()?;
    let state = server::AppState::load(&cfg)?;
    // Warmup to catch a model/schema width mismatch before serving
    state.warmup()?;

    let app = server::router(state);

    let addr = std::net::SocketAddr::from((cfg.bind_addr, cfg.port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
