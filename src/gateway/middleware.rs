//! Gateway 中间件

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::Instrument;

/// 全局请求计数器，用于生成 request_id
static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(1);

const ALLOW_ORIGIN: &str = "*";
const ALLOW_METHODS: &str = "POST, OPTIONS";

/// 单个函数的 CORS 策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorsPolicy {
    /// `Access-Control-Allow-Headers` 的值
    pub allow_headers: &'static str,
}

impl CorsPolicy {
    /// 视觉识别函数只接受 Content-Type 和 Authorization
    pub const VISION: CorsPolicy = CorsPolicy {
        allow_headers: "Content-Type, Authorization",
    };

    /// 其余函数额外允许 Supabase 客户端头
    pub const SUPABASE: CorsPolicy = CorsPolicy {
        allow_headers: "authorization, x-client-info, apikey, content-type",
    };

    fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(
            "access-control-allow-origin",
            HeaderValue::from_static(ALLOW_ORIGIN),
        );
        headers.insert(
            "access-control-allow-methods",
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            "access-control-allow-headers",
            HeaderValue::from_static(self.allow_headers),
        );
    }
}

/// CORS 中间件
///
/// OPTIONS 预检请求直接返回空响应，不进入处理器；其余响应（包括错误）
/// 一律附加 CORS 头。
pub async fn cors_middleware(policy: CorsPolicy, request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::OK.into_response();
        policy.apply(response.headers_mut());
        return response;
    }

    let mut response = next.run(request).await;
    policy.apply(response.headers_mut());
    response
}

/// 请求日志中间件
pub async fn request_logger(request: Request, next: Next) -> Response {
    let request_id = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let span = tracing::info_span!(
        "req",
        id = request_id,
        %method,
        %path,
    );

    async move {
        let start = std::time::Instant::now();
        let response = next.run(request).await;
        let latency_ms = start.elapsed().as_millis() as u64;
        let status = response.status().as_u16();

        tracing::info!(status, latency_ms, "done");

        response
    }
    .instrument(span)
    .await
}
