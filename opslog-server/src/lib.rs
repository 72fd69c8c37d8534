// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

pub mod api;
pub mod config;
pub mod dispatcher;
pub mod sink;

use anyhow::Result;
use axum::Router;
use opslog_core::SystemClock;
use opslog_query::RetrievalEngine;
use opslog_storage::{EventStore, FileEventStore, MemoryEventStore};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::AppState;
use config::{ServerConfig, StorageBackend};
use dispatcher::{DispatchSettings, Dispatcher};
use sink::{DatadogTimeline, SlackClient};

/// Open the configured store backend.
pub fn open_store(config: &ServerConfig) -> Result<Arc<dyn EventStore>> {
    let store: Arc<dyn EventStore> = match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory store; entries are lost on restart");
            Arc::new(MemoryEventStore::new())
        }
        StorageBackend::File => {
            tracing::info!("Using file store at {:?}", config.storage.data_file);
            Arc::new(FileEventStore::open(&config.storage.data_file)?)
        }
    };
    Ok(store)
}

/// Wire store, engine and sinks into a dispatcher.
pub fn build_dispatcher(config: &ServerConfig, store: Arc<dyn EventStore>) -> Dispatcher {
    let engine = RetrievalEngine::new(store, Arc::new(SystemClock), config.retrieval.scan);
    let chat = Arc::new(SlackClient::new(
        config.slack.oauth_token.clone(),
        config.slack.api_url.clone(),
    ));
    let settings = DispatchSettings {
        verification_token: config.slack.verification_token.clone(),
        max_text_chars: config.retrieval.max_text_chars,
        default_show_count: config.retrieval.default_show_count,
    };

    let dispatcher = Dispatcher::new(engine, chat, settings);
    match config.timeline.api_key.as_deref() {
        Some(key) if config.timeline.enabled() => {
            tracing::info!("Datadog timeline enabled ({})", config.timeline.api_url);
            dispatcher.with_timeline(Arc::new(DatadogTimeline::new(
                key,
                config.timeline.api_url.clone(),
            )))
        }
        _ => dispatcher,
    }
}

/// Full HTTP application with tracing and request timeout layers.
pub fn app(dispatcher: Dispatcher, request_timeout: Duration) -> Router {
    let state = AppState {
        dispatcher: Arc::new(dispatcher),
    };

    api::router(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(config: ServerConfig) -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "opslog_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Opslog Server");

    config.validate()?;

    let store = open_store(&config)?;
    let dispatcher = build_dispatcher(&config, store);
    let app = app(
        dispatcher,
        Duration::from_secs(config.server.request_timeout_secs),
    );

    let addr = config.socket_addr()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.slack.verification_token = "secret".to_string();
        config
    }

    #[test]
    fn test_config_validation() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_open_store_backends() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config();
        config.storage.data_file = temp_dir.path().join("opslog.json");
        assert!(open_store(&config).is_ok());

        std::fs::write(&config.storage.data_file, "{broken").unwrap();
        assert!(open_store(&config).is_err());

        config.storage.backend = StorageBackend::Memory;
        assert!(open_store(&config).is_ok());
    }
}
