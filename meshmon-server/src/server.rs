//! Server lifecycle: startup, middleware stack and graceful shutdown.

use anyhow::Context;
use axum::http::{HeaderValue, Request};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};

use meshmon_bot::{event_queue, ActionDispatcher, RepeaterTransport, RuleEngine};
use meshmon_runtime::{wait_for_signal, RuleWorker, Shutdown};
use meshmon_store::Store;

use crate::config::ServerConfig;
use crate::routes::router;
use crate::state::AppState;

fn cors_layer(origins: Option<&[String]>) -> CorsLayer {
    let allow_origin = match origins {
        None => AllowOrigin::any(),
        Some(origins) => {
            let values: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(%origin, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(values)
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Router with tracing and CORS layers
pub fn build_app(state: AppState) -> Router {
    let origins = state.config.allowed_origins.clone();
    router(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::span!(
                    Level::INFO,
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
        .layer(cors_layer(origins.as_deref()))
}

/// Run the server until Ctrl-C or SIGTERM.
///
/// Opens the store, seeds built-in rules and starts the rule worker when
/// enabled. On shutdown the worker is signalled and joined; events still
/// queued are dropped.
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let store = Store::open(&config.database_path)
        .with_context(|| format!("opening {}", config.database_path.display()))?;
    store.seed_builtin_rules()?;

    let shutdown = Shutdown::new();
    let (events, worker) = if config.bot_enabled {
        let (tx, rx) = event_queue();
        let transport = RepeaterTransport::shared(&config.repeater_url)?;
        let engine = RuleEngine::new(store.clone(), ActionDispatcher::new(transport)?);
        let handle = tokio::spawn(RuleWorker::new(engine, rx).run(shutdown.subscribe()));
        info!("Bot worker task created");
        (Some(tx), Some(handle))
    } else {
        info!("Bot worker disabled via BOT_ENABLED");
        (None, None)
    };

    let bind_addr = config.bind_addr.clone();
    let app = build_app(AppState::new(config, store, events));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    info!(addr = %bind_addr, "starting server");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_signal())
        .await?;

    shutdown.trigger();
    if let Some(handle) = worker {
        match handle.await {
            Ok(exit) => info!(?exit, "bot worker stopped"),
            Err(e) => warn!(error = %e, "bot worker task failed"),
        }
    }

    info!("server stopped");
    Ok(())
}
