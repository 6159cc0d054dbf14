use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use chat_server::actors::{ConversationActor, ConversationArguments};
use chat_server::agent::OllamaModel;
use chat_server::api;
use chat_server::app_state::AppState;
use chat_server::config::{load_env_file, Config};
use ractor::Actor;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_server=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Search the current directory and ancestors so running from `chat-server/`
    // still picks up the repo-root `.env`.
    load_env_file();
    let config = Config::from_env()?;

    tracing::info!(
        ollama_host = %config.ollama_host,
        ollama_model = %config.ollama_model,
        cors_origins = ?config.cors_origins,
        "Starting chat server"
    );

    let (conversation, _handle) = Actor::spawn(
        Some(format!("conversation:{}", ulid::Ulid::new())),
        ConversationActor,
        ConversationArguments::default(),
    )
    .await
    .map_err(|e| anyhow::anyhow!("Failed to spawn conversation actor: {e}"))?;

    let model = OllamaModel::new(
        config.ollama_host.clone(),
        config.ollama_model.clone(),
        config.model_request_timeout,
    )?;

    let app_state = AppState::new(
        conversation,
        Arc::new(model),
        config.system_prompt.clone(),
        config.stream,
    );

    let allowed_origins = config
        .cors_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|e| anyhow::anyhow!("Invalid CORS origin '{origin}': {e}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600));

    let app = api::router()
        .with_state(api::ApiState { app_state })
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = config.bind_addr();
    tracing::info!("Starting HTTP server on http://{addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
