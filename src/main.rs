use clap::Parser; // for cli
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use llm_explorer::{AppState, Args, handlers};

// this is main async function with tokio
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // parse cli arguments
    let args = Args::parse();
    let state = Arc::new(AppState::from_args(&args)?);

    let app = handlers::router(Arc::clone(&state));

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(port = args.port, "explorer running on http://localhost:{}", args.port);
    info!(api_base = %args.api_base, default_token = args.hf_token.is_some(), "inference api");
    info!(
        quota = args.rate_limit,
        window_secs = args.rate_window,
        gating = ?args.gating,
        "rate limit"
    );
    for backend in state.coordinator.backends() {
        info!(model = %backend.model, name = %backend.name, "backend");
    }

    axum::serve(listener, app).await?;
    Ok(())
}
