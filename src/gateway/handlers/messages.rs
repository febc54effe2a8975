//! 私信处理器
//!
//! - send-message / delete-message 需要调用方身份与请求中的操作者一致
//! - get-conversation 只透传调用方凭证，由存储的行级策略决定可见性

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{caller_credential, parse_body, present_id, present_text, ApiError};
use crate::config::MESSAGES_USE_SERVICE_ROLE;
use crate::gateway::state::AppState;
use crate::store::{Identifier, KeyTier, Message, NewMessage, Session};

#[derive(Debug, Deserialize)]
struct SendMessageRequest {
    sender_id: Option<Value>,
    recipient_id: Option<Value>,
    message_text: Option<Value>,
    item_id: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct DeleteMessageRequest {
    message_id: Option<Value>,
    user_id: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ConversationRequest {
    current_user_id: Option<Value>,
    other_user_id: Option<Value>,
}

/// 校验调用方凭证对应的身份是否为 `actor`
///
/// 返回通过校验的原始凭证，供后续存储调用透传。
async fn authorize(state: &AppState, headers: &HeaderMap, actor: &Identifier) -> Result<String, ApiError> {
    let credential = caller_credential(headers).ok_or(ApiError::Unauthorized)?;

    match state.identity().resolve(&credential).await? {
        Some(identity) if actor.matches(&identity) => Ok(credential),
        Some(_) => {
            tracing::warn!(actor = %actor, "caller identity does not match actor");
            Err(ApiError::Unauthorized)
        }
        None => {
            tracing::warn!(actor = %actor, "caller identity could not be resolved");
            Err(ApiError::Unauthorized)
        }
    }
}

/// POST /send-message
pub async fn handle_send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Message>, ApiError> {
    let request: SendMessageRequest = parse_body(&body)?;

    let (Some(sender_id), Some(recipient_id), Some(message_text)) = (
        present_id(request.sender_id),
        present_id(request.recipient_id),
        present_text(request.message_text),
    ) else {
        return Err(ApiError::BadRequest(
            "Sender ID, recipient ID, and message text are required".to_string(),
        ));
    };

    let credential = authorize(&state, &headers, &sender_id).await?;

    let tier = if state.config().flag(MESSAGES_USE_SERVICE_ROLE) {
        KeyTier::Service
    } else {
        KeyTier::Anon
    };
    let session = Session::new(tier, Some(credential));

    let message = NewMessage {
        sender_id,
        recipient_id,
        message: message_text,
        item_id: present_id(request.item_id),
        is_read: false,
    };

    let inserted = state.store().insert(&session, message).await.map_err(|e| {
        tracing::error!("Message send error: {}", e);
        ApiError::from(e)
    })?;

    tracing::info!(
        id = ?inserted.get("id"),
        sender = ?inserted.get("sender_id"),
        recipient = ?inserted.get("recipient_id"),
        "message sent"
    );

    Ok(Json(inserted))
}

/// POST /delete-message
pub async fn handle_delete_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: DeleteMessageRequest = parse_body(&body)?;

    let (Some(message_id), Some(user_id)) =
        (present_id(request.message_id), present_id(request.user_id))
    else {
        return Err(ApiError::BadRequest(
            "Message ID and user ID are required".to_string(),
        ));
    };

    let credential = authorize(&state, &headers, &user_id).await?;
    let session = Session::new(KeyTier::Anon, Some(credential));

    state
        .store()
        .delete(&session, &message_id, &user_id)
        .await?;

    tracing::info!(id = %message_id, user = %user_id, "message deleted");

    Ok(Json(json!({ "success": true })))
}

/// POST /get-conversation
pub async fn handle_get_conversation(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Vec<Message>>, ApiError> {
    let request: ConversationRequest = parse_body(&body)?;

    let (Some(current_user_id), Some(other_user_id)) = (
        present_id(request.current_user_id),
        present_id(request.other_user_id),
    ) else {
        return Err(ApiError::BadRequest("Both user IDs are required".to_string()));
    };

    let session = Session::new(KeyTier::Anon, caller_credential(&headers));
    let messages = state
        .store()
        .conversation(&session, &current_user_id, &other_user_id)
        .await?;

    tracing::debug!(count = messages.len(), "conversation loaded");

    Ok(Json(messages))
}
