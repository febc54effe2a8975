//! Gateway 应用层
//!
//! HTTP 服务器和请求处理。每个函数挂载在 `/<name>`（以及旧名称别名）下，
//! 只接受 POST，OPTIONS 预检由 CORS 中间件直接应答。

mod handlers;
pub(crate) mod middleware;
mod state;
#[cfg(test)]
pub(crate) mod testing;

pub use state::AppState;

use anyhow::Result;
use axum::{
    handler::Handler,
    http::StatusCode,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{Config, ConfigProvider, EnvConfig};
use crate::store::{SupabaseAuth, SupabaseStore};
use crate::utils::get_shared_client;
use middleware::CorsPolicy;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// 一个对外暴露的函数
#[derive(Debug, Clone, Copy)]
pub(crate) struct Function {
    pub name: &'static str,
    /// 旧版函数名，同样可路由
    pub aliases: &'static [&'static str],
    pub cors: CorsPolicy,
}

impl Function {
    fn paths(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(self.name)
            .chain(self.aliases.iter().copied())
            .map(|name| format!("/{name}"))
    }
}

pub(crate) const ANALYZE_IMAGE: Function = Function {
    name: "analyze-image",
    aliases: &["analyze-firearm-image"],
    cors: CorsPolicy::VISION,
};

pub(crate) const DELETE_MESSAGE: Function = Function {
    name: "delete-message",
    aliases: &["delete_message"],
    cors: CorsPolicy::SUPABASE,
};

pub(crate) const GET_CONFIG: Function = Function {
    name: "get-config",
    aliases: &[],
    cors: CorsPolicy::SUPABASE,
};

pub(crate) const GET_NEWS: Function = Function {
    name: "get-news",
    aliases: &[],
    cors: CorsPolicy::SUPABASE,
};

pub(crate) const GET_CONVERSATION: Function = Function {
    name: "get-conversation",
    aliases: &["get_conversation_messages"],
    cors: CorsPolicy::SUPABASE,
};

pub(crate) const SEND_MESSAGE: Function = Function {
    name: "send-message",
    aliases: &["send_message"],
    cors: CorsPolicy::SUPABASE,
};

pub(crate) const FUNCTIONS: &[Function] = &[
    ANALYZE_IMAGE,
    DELETE_MESSAGE,
    GET_CONFIG,
    GET_NEWS,
    GET_CONVERSATION,
    SEND_MESSAGE,
];

pub async fn serve(config: Config) -> Result<()> {
    let state = production_state();
    let app = build_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// 基于环境变量和 Supabase 的状态
fn production_state() -> AppState {
    let config: Arc<dyn ConfigProvider> = Arc::new(EnvConfig);
    let http = get_shared_client().clone();

    AppState::new(
        config.clone(),
        Arc::new(SupabaseAuth::new(config.clone(), http.clone())),
        Arc::new(SupabaseStore::new(config, http.clone())),
        http,
    )
}

/// 挂载一个函数：POST 处理器 + CORS 中间件
fn mount<H, T>(function: Function, handler: H) -> Router<AppState>
where
    H: Handler<T, AppState>,
    T: 'static,
{
    let cors = function.cors;
    function
        .paths()
        .fold(Router::<AppState>::new(), |router, path| {
            router.route(&path, post(handler.clone()))
        })
        .layer(axum_middleware::from_fn(move |req, next| {
            middleware::cors_middleware(cors, req, next)
        }))
}

pub(crate) fn build_router(state: AppState) -> Router {
    let public_routes = Router::new().route("/health", get(handlers::handle_health));

    let function_routes = Router::new()
        .merge(mount(ANALYZE_IMAGE, handlers::handle_analyze_image))
        .merge(mount(DELETE_MESSAGE, handlers::handle_delete_message))
        .merge(mount(GET_CONFIG, handlers::handle_get_config))
        .merge(mount(GET_NEWS, handlers::handle_get_news))
        .merge(mount(GET_CONVERSATION, handlers::handle_get_conversation))
        .merge(mount(SEND_MESSAGE, handlers::handle_send_message));

    Router::new()
        .merge(function_routes)
        .merge(public_routes)
        .layer(
            ServiceBuilder::new()
                .layer(axum_middleware::from_fn(middleware::request_logger))
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
                )),
        )
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    #[cfg(not(unix))]
    tokio::select! {
        _ = ctrl_c => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
