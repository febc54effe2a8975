//! Gateway 应用状态
//!
//! 只持有能力接口（配置源、身份解析、消息存储）和共享的 HTTP 传输层，
//! 不保存任何请求数据。

use reqwest::Client;
use std::sync::Arc;

use crate::config::ConfigProvider;
use crate::store::{IdentityResolver, MessageStore};

/// Gateway 应用状态
#[derive(Clone)]
pub struct AppState {
    config: Arc<dyn ConfigProvider>,
    identity: Arc<dyn IdentityResolver>,
    store: Arc<dyn MessageStore>,
    http: Client,
}

impl AppState {
    pub fn new(
        config: Arc<dyn ConfigProvider>,
        identity: Arc<dyn IdentityResolver>,
        store: Arc<dyn MessageStore>,
        http: Client,
    ) -> Self {
        Self {
            config,
            identity,
            store,
            http,
        }
    }

    pub fn config(&self) -> &dyn ConfigProvider {
        self.config.as_ref()
    }

    pub fn identity(&self) -> &dyn IdentityResolver {
        self.identity.as_ref()
    }

    pub fn store(&self) -> &dyn MessageStore {
        self.store.as_ref()
    }

    /// 调用第三方 API 使用的 HTTP 客户端
    pub fn http(&self) -> &Client {
        &self.http
    }
}
