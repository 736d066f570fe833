mod api;
mod config;
mod error;
mod features;
mod model;
mod risk;
mod service;
mod state;

use anyhow::{Context, Result};
use axum::Router;
use std::path::Path;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, ServerConfig};
use crate::model::LoadedModel;
use crate::service::Predictor;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "predictor=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 && args[1] == "config" && args.get(2).map(|s| s.as_str()) == Some("--schema")
    {
        let schema = schemars::schema_for!(Config);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    let config = Config::load()?;
    let current_dir = std::env::current_dir()?;

    // Nothing is bound until the model is in memory.
    let app = build_app(&config, &current_dir)?;

    let listener = bind(&config.server).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Host names are resolved and IPv6 literals need no brackets.
async fn bind(server: &ServerConfig) -> Result<TcpListener> {
    TcpListener::bind((server.host.as_str(), server.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", server.host, server.port))
}

fn build_app(config: &Config, base: &Path) -> Result<Router> {
    let model_path = config.model_path(base);
    let model = match LoadedModel::load(&model_path) {
        Ok(model) => model,
        Err(e) => {
            tracing::error!("Failed to load model: {}", e);
            return Err(e.into());
        }
    };

    let state = AppState::new(Predictor::new(model));
    api::app(state, &config.cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CorsConfig, ModelConfig};

    fn config_for(path: &str) -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 0,
            },
            model: ModelConfig { path: path.into() },
            cors: CorsConfig::default(),
        }
    }

    #[test]
    fn missing_model_prevents_startup() {
        let dir = tempfile::tempdir().unwrap();
        let err = build_app(&config_for("models/absent.json"), dir.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to read model file"));
    }

    fn server(host: &str) -> ServerConfig {
        ServerConfig {
            host: host.into(),
            port: 0,
        }
    }

    #[tokio::test]
    async fn binds_host_names() {
        let listener = bind(&server("localhost")).await.unwrap();
        assert!(listener.local_addr().unwrap().ip().is_loopback());
    }

    #[tokio::test]
    async fn binds_ipv4_literal() {
        let listener = bind(&server("127.0.0.1")).await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn unresolvable_host_fails_to_bind() {
        let err = bind(&server("no-such-host.invalid")).await.unwrap_err();
        assert!(err.to_string().contains("Failed to bind no-such-host.invalid:0"));
    }

    #[test]
    fn bundled_model_starts() {
        let base = Path::new(env!("CARGO_MANIFEST_DIR"));
        assert!(build_app(&config_for(config::DEFAULT_MODEL_PATH), base).is_ok());
    }
}
