//! HTTP front end for the rota scheduler: `POST /schedule` runs one
//! request through the pipeline, `GET /` is a liveness probe.

mod routes;

use std::time::Duration;

use anyhow::Result;
use rota_core::{Formulation, SolveConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rota_server=info,rota_core=info")),
        )
        .with_target(false)
        .init();

    let config = solve_config_from_env();
    tracing::info!(?config.formulation, ?config.deadline, "scheduler configured");

    let host = std::env::var("ROTA_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("ROTA_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(5000);

    let app = routes::router(config);
    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

fn solve_config_from_env() -> SolveConfig {
    let mut config = SolveConfig::default();
    if let Ok(name) = std::env::var("ROTA_FORMULATION") {
        match Formulation::parse(&name) {
            Some(formulation) => config.formulation = formulation,
            None => tracing::warn!(%name, "unknown formulation, keeping the default"),
        }
    }
    if let Some(secs) = std::env::var("ROTA_DEADLINE_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
    {
        config.deadline = Some(Duration::from_secs(secs));
    }
    config
}
