//! 消息存储抽象层
//!
//! 定义消息表的读写接口和调用方身份解析接口。处理器只依赖这里的 trait，
//! 具体实现见 [`supabase`]。

pub mod supabase;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub use supabase::{SupabaseAuth, SupabaseStore};

/// 记录标识符
///
/// 上游可能使用 UUID 字符串或自增整数，两者都原样保留。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Text(String),
    Number(i64),
}

impl Identifier {
    /// 与已解析的用户身份比较
    pub fn matches(&self, identity: &str) -> bool {
        match self {
            Identifier::Text(s) => s == identity,
            Identifier::Number(n) => n.to_string() == identity,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Text(s) => f.write_str(s),
            Identifier::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier::Text(value.to_string())
    }
}

/// direct_messages 表中的一行
///
/// 行结构归存储所有，这里不做解码，原样转发全部列（包括 `null` 和新增列）。
pub type Message = Map<String, Value>;

/// 待插入的消息
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewMessage {
    pub sender_id: Identifier,
    pub recipient_id: Identifier,
    pub message: String,
    pub item_id: Option<Identifier>,
    pub is_read: bool,
}

/// 访问存储时使用的密钥级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTier {
    /// 受限的匿名密钥，行级策略生效
    Anon,
    /// service role 密钥，绕过行级策略
    Service,
}

/// 单次请求的存储会话
///
/// 每次调用都新建，不跨请求复用。
#[derive(Debug, Clone)]
pub struct Session {
    pub tier: KeyTier,
    /// 调用方原始的 Authorization 头
    pub credential: Option<String>,
}

impl Session {
    pub fn new(tier: KeyTier, credential: Option<String>) -> Self {
        Self { tier, credential }
    }
}

/// 存储层错误
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Store request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// 存储返回的错误信息（原样透传）
    #[error("{0}")]
    Api(String),

    #[error("Insert returned no rows")]
    EmptyInsert,
}

/// 调用方身份解析
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// 根据原始凭证解析用户身份，无法识别时返回 `Ok(None)`
    async fn resolve(&self, credential: &str) -> Result<Option<String>, StoreError>;
}

/// 消息表读写接口
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// 插入一条消息并返回插入后的行
    async fn insert(&self, session: &Session, message: NewMessage) -> Result<Message, StoreError>;

    /// 删除 `id` 且发送者为 `sender_id` 的消息
    async fn delete(
        &self,
        session: &Session,
        id: &Identifier,
        sender_id: &Identifier,
    ) -> Result<(), StoreError>;

    /// 读取两人之间的全部消息，按创建时间升序
    async fn conversation(
        &self,
        session: &Session,
        user_a: &Identifier,
        user_b: &Identifier,
    ) -> Result<Vec<Message>, StoreError>;
}
