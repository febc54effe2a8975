//! 路由级测试的替身实现和辅助函数

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use crate::config::{ConfigProvider, StaticConfig};
use crate::gateway::{build_router, AppState};
use crate::store::{
    Identifier, IdentityResolver, KeyTier, Message, MessageStore, NewMessage, Session, StoreError,
};

/// 标识符与行中的列值是否相同（类型也须一致）
fn is_value(id: &Identifier, value: Option<&Value>) -> bool {
    value == Some(&json!(id))
}

/// 固定 token -> 用户映射的身份解析
#[derive(Default)]
pub struct FakeIdentity {
    users: HashMap<String, String>,
    pub calls: AtomicUsize,
}

impl FakeIdentity {
    pub fn with_user(mut self, token: &str, user_id: &str) -> Self {
        self.users
            .insert(format!("Bearer {token}"), user_id.to_string());
        self
    }
}

#[async_trait]
impl IdentityResolver for FakeIdentity {
    async fn resolve(&self, credential: &str) -> Result<Option<String>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.users.get(credential).cloned())
    }
}

/// 内存消息表，记录每类调用次数和最近一次的密钥级别
#[derive(Default)]
pub struct FakeStore {
    rows: Mutex<Vec<Message>>,
    next_id: AtomicUsize,
    pub inserts: AtomicUsize,
    pub deletes: AtomicUsize,
    pub reads: AtomicUsize,
    pub last_tier: Mutex<Option<KeyTier>>,
    pub fail_with: Option<String>,
}

impl FakeStore {
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn seed(&self, sender: &str, recipient: &str, text: &str, created_at: &str) -> Identifier {
        let id = self.next_id();
        self.push(json!({
            "id": &id,
            "sender_id": sender,
            "recipient_id": recipient,
            "message": text,
            "item_id": null,
            "is_read": false,
            "created_at": created_at,
        }));
        id
    }

    /// 直接写入一行，用于构造带额外列或空值的行
    pub fn push(&self, row: Value) {
        if let Value::Object(row) = row {
            self.rows.lock().unwrap().push(row);
        }
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .any(|m| is_value(id, m.get("id")))
    }

    fn next_id(&self) -> Identifier {
        Identifier::Number(self.next_id.fetch_add(1, Ordering::SeqCst) as i64 + 1)
    }

    pub fn writes(&self) -> usize {
        self.inserts.load(Ordering::SeqCst) + self.deletes.load(Ordering::SeqCst)
    }

    fn check(&self, session: &Session) -> Result<(), StoreError> {
        *self.last_tier.lock().unwrap() = Some(session.tier);
        match &self.fail_with {
            Some(message) => Err(StoreError::Api(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MessageStore for FakeStore {
    async fn insert(&self, session: &Session, message: NewMessage) -> Result<Message, StoreError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.check(session)?;

        let mut row = match serde_json::to_value(&message) {
            Ok(Value::Object(row)) => row,
            _ => return Err(StoreError::EmptyInsert),
        };
        row.insert("id".into(), json!(self.next_id()));
        row.insert("created_at".into(), json!("2024-01-01T00:00:00Z"));
        self.rows.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn delete(
        &self,
        session: &Session,
        id: &Identifier,
        sender_id: &Identifier,
    ) -> Result<(), StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.check(session)?;

        self.rows
            .lock()
            .unwrap()
            .retain(|m| !(is_value(id, m.get("id")) && is_value(sender_id, m.get("sender_id"))));
        Ok(())
    }

    async fn conversation(
        &self,
        session: &Session,
        user_a: &Identifier,
        user_b: &Identifier,
    ) -> Result<Vec<Message>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check(session)?;

        let mut messages: Vec<Message> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|m| {
                let (sender, recipient) = (m.get("sender_id"), m.get("recipient_id"));
                (is_value(user_a, sender) && is_value(user_b, recipient))
                    || (is_value(user_b, sender) && is_value(user_a, recipient))
            })
            .cloned()
            .collect();
        let created_at = |m: &Message| m.get("created_at").and_then(Value::as_str).map(str::to_string);
        messages.sort_by_key(created_at);
        Ok(messages)
    }
}

/// 测试用的 gateway
pub struct TestApp {
    pub router: Router,
    pub identity: Arc<FakeIdentity>,
    pub store: Arc<FakeStore>,
}

impl TestApp {
    pub fn new(config: StaticConfig) -> Self {
        Self::with_parts(config, FakeIdentity::default(), FakeStore::default())
    }

    pub fn with_parts(config: StaticConfig, identity: FakeIdentity, store: FakeStore) -> Self {
        let identity = Arc::new(identity);
        let store = Arc::new(store);
        let config: Arc<dyn ConfigProvider> = Arc::new(config);
        let state = AppState::new(config, identity.clone(), store.clone(), Client::new());

        Self {
            router: build_router(state),
            identity,
            store,
        }
    }

    /// 发送 POST 请求，返回状态码、响应头和 JSON 响应体
    pub async fn post(
        &self,
        path: &str,
        body: Value,
        token: Option<&str>,
    ) -> (StatusCode, axum::http::HeaderMap, Value) {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, body)
    }
}
