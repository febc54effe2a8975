//! Supabase 存储实现
//!
//! 通过 PostgREST（`/rest/v1`）读写 direct_messages 表，通过 GoTrue
//! （`/auth/v1/user`）解析调用方身份。地址和密钥在每次调用时从配置源重新读取。

use async_trait::async_trait;
use http::{header, Method};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::sync::Arc;

use super::{
    Identifier, IdentityResolver, KeyTier, Message, MessageStore, NewMessage, Session, StoreError,
};
use crate::config::{ConfigProvider, SUPABASE_ANON_KEY, SUPABASE_SERVICE_ROLE_KEY, SUPABASE_URL};

const MESSAGES_TABLE: &str = "direct_messages";

/// 单次调用的 Supabase 端点
struct Endpoint {
    base_url: String,
    api_key: String,
}

impl Endpoint {
    /// 从配置源读取地址和指定级别的密钥
    fn resolve(config: &dyn ConfigProvider, tier: KeyTier) -> Result<Self, StoreError> {
        let base_url = config
            .get_non_empty(SUPABASE_URL)
            .ok_or(StoreError::NotConfigured(SUPABASE_URL))?;

        let key_name = match tier {
            KeyTier::Anon => SUPABASE_ANON_KEY,
            KeyTier::Service => SUPABASE_SERVICE_ROLE_KEY,
        };
        let api_key = config
            .get_non_empty(key_name)
            .ok_or(StoreError::NotConfigured(key_name))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// 构建请求；有调用方凭证时透传，否则以密钥本身作为 bearer
    fn request(
        &self,
        client: &Client,
        method: Method,
        path: &str,
        credential: Option<&str>,
    ) -> RequestBuilder {
        let authorization = credential
            .map(str::to_string)
            .unwrap_or_else(|| format!("Bearer {}", self.api_key));

        client
            .request(method, format!("{}{}", self.base_url, path))
            .header("apikey", &self.api_key)
            .header(header::AUTHORIZATION, authorization)
    }
}

/// 读取错误响应体，优先取 PostgREST 的 `message` 字段
async fn api_error(response: reqwest::Response) -> StoreError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("msg"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.to_string()
            } else {
                body
            }
        });

    tracing::warn!(status = status.as_u16(), "store request failed");
    StoreError::Api(message)
}

/// PostgREST 过滤值加双引号，`,` `.` `(` `)` 在引号内不再是语法字符
fn quote_filter_value(id: &Identifier) -> String {
    let escaped = id.to_string().replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// 会话双方的 PostgREST `or` 过滤表达式
fn conversation_filter(user_a: &Identifier, user_b: &Identifier) -> String {
    format!(
        "(and(sender_id.eq.{a},recipient_id.eq.{b}),and(sender_id.eq.{b},recipient_id.eq.{a}))",
        a = quote_filter_value(user_a),
        b = quote_filter_value(user_b)
    )
}

/// Supabase 消息表
pub struct SupabaseStore {
    config: Arc<dyn ConfigProvider>,
    client: Client,
}

impl SupabaseStore {
    pub fn new(config: Arc<dyn ConfigProvider>, client: Client) -> Self {
        Self { config, client }
    }

    fn request(
        &self,
        session: &Session,
        method: Method,
        path: &str,
    ) -> Result<RequestBuilder, StoreError> {
        let endpoint = Endpoint::resolve(self.config.as_ref(), session.tier)?;
        Ok(endpoint.request(&self.client, method, path, session.credential.as_deref()))
    }
}

#[async_trait]
impl MessageStore for SupabaseStore {
    async fn insert(&self, session: &Session, message: NewMessage) -> Result<Message, StoreError> {
        let path = format!("/rest/v1/{MESSAGES_TABLE}");
        let response = self
            .request(session, Method::POST, &path)?
            .header("Prefer", "return=representation")
            .json(&[message])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let rows: Vec<Message> = response.json().await?;
        rows.into_iter().next().ok_or(StoreError::EmptyInsert)
    }

    async fn delete(
        &self,
        session: &Session,
        id: &Identifier,
        sender_id: &Identifier,
    ) -> Result<(), StoreError> {
        let path = format!("/rest/v1/{MESSAGES_TABLE}");
        let response = self
            .request(session, Method::DELETE, &path)?
            .query(&[
                ("id", format!("eq.{id}")),
                ("sender_id", format!("eq.{sender_id}")),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }

    async fn conversation(
        &self,
        session: &Session,
        user_a: &Identifier,
        user_b: &Identifier,
    ) -> Result<Vec<Message>, StoreError> {
        let path = format!("/rest/v1/{MESSAGES_TABLE}");
        let response = self
            .request(session, Method::GET, &path)?
            .query(&[
                ("select", "*".to_string()),
                ("or", conversation_filter(user_a, user_b)),
                ("order", "created_at.asc".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(response.json().await?)
    }
}

/// Supabase Auth 身份解析
pub struct SupabaseAuth {
    config: Arc<dyn ConfigProvider>,
    client: Client,
}

impl SupabaseAuth {
    pub fn new(config: Arc<dyn ConfigProvider>, client: Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl IdentityResolver for SupabaseAuth {
    async fn resolve(&self, credential: &str) -> Result<Option<String>, StoreError> {
        let endpoint = Endpoint::resolve(self.config.as_ref(), KeyTier::Anon)?;
        let response = endpoint
            .request(&self.client, Method::GET, "/auth/v1/user", Some(credential))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(None);
        }
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "identity lookup failed");
            return Ok(None);
        }

        let user: Value = response.json().await?;
        Ok(user
            .get("id")
            .and_then(|id| id.as_str())
            .filter(|id| !id.is_empty())
            .map(str::to_string))
    }
}
