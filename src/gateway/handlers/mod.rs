//! HTTP 请求处理器
//!
//! 所有函数共用同一套约定：JSON 请求体、按"是否存在"校验必填字段、
//! 失败时统一返回 `{"error": ...}` 信封。

pub mod config_lookup;
pub mod health;
pub mod messages;
pub mod news;
pub mod vision;

pub use config_lookup::handle_get_config;
pub use health::handle_health;
pub use messages::{handle_delete_message, handle_get_conversation, handle_send_message};
pub use news::handle_get_news;
pub use vision::handle_analyze_image;

use axum::{
    body::Bytes,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::providers::UpstreamError;
use crate::store::{Identifier, StoreError};
use crate::utils::truthy_text;

/// 错误响应体
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// 处理器错误
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 请求体无效或缺少必填字段
    #[error("{0}")]
    BadRequest(String),

    /// 调用方身份与请求中声明的身份不符
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    /// 服务端配置缺失
    #[error("{0}")]
    Config(String),

    /// 上游返回非 2xx，`details` 为原始响应体
    #[error("{error}")]
    Upstream { error: String, details: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    /// 未预期的失败
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Config(_)
            | ApiError::Upstream { .. }
            | ApiError::Store(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Upstream { error, details } => ErrorBody {
                error,
                details: Some(details),
                message: None,
            },
            ApiError::Internal(message) => ErrorBody {
                error: "Internal server error".to_string(),
                details: None,
                message: Some(message),
            },
            other => ErrorBody {
                error: other.to_string(),
                details: None,
                message: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::MissingKey(key) => ApiError::Config(format!("{key} is not configured")),
            UpstreamError::Status { status, body } => ApiError::Upstream {
                error: format!("Upstream API returned {status}"),
                details: body,
            },
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// 解析 JSON 请求体，空请求体视为 `{}`
pub(crate) fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    let raw: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}".as_slice()
    } else {
        body.as_ref()
    };
    serde_json::from_slice(raw).map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {e}")))
}

/// 按真值判断标识符是否存在；整数保留为数字，其他真值转为文本
pub(crate) fn present_id(value: Option<Value>) -> Option<Identifier> {
    match value? {
        Value::Number(n) if n.as_i64().is_some_and(|n| n != 0) => n.as_i64().map(Identifier::Number),
        other => truthy_text(&other).map(Identifier::Text),
    }
}

/// 按真值判断文本字段是否存在，不校验类型
pub(crate) fn present_text(value: Option<Value>) -> Option<String> {
    value.as_ref().and_then(truthy_text)
}

/// 调用方原始的 Authorization 头
pub(crate) fn caller_credential(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct SampleBody {
        key: Option<String>,
    }

    #[test]
    fn empty_body_parses_as_empty_object() {
        let sample: SampleBody = parse_body(&Bytes::from_static(b"  ")).unwrap();
        assert!(sample.key.is_none());
    }

    #[test]
    fn invalid_json_is_bad_request() {
        let err = parse_body::<SampleBody>(&Bytes::from_static(b"{not json")).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().starts_with("Invalid JSON body"));
    }

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::NotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Upstream {
                error: "e".into(),
                details: "d".into()
            }
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(StoreError::EmptyInsert).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn presence_filters() {
        use serde_json::json;

        assert!(present_text(Some(json!(""))).is_none());
        assert!(present_text(Some(json!(null))).is_none());
        assert!(present_text(None).is_none());
        assert_eq!(present_text(Some(json!(123))).as_deref(), Some("123"));
        assert!(present_id(Some(json!(0))).is_none());
        assert!(present_id(Some(json!(false))).is_none());
        assert_eq!(present_id(Some(json!(7))), Some(Identifier::Number(7)));
        assert_eq!(present_id(Some(json!("u1"))), Some(Identifier::from("u1")));
        assert_eq!(present_id(Some(json!(true))), Some(Identifier::from("true")));
    }

    #[test]
    fn credential_is_taken_verbatim() {
        let mut headers = HeaderMap::new();
        assert!(caller_credential(&headers).is_none());
        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(caller_credential(&headers).as_deref(), Some("Bearer abc"));
    }
}
