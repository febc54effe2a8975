//! 图片识别处理器

use axum::{body::Bytes, extract::State, Json};
use serde::Deserialize;
use serde_json::Value;

use super::{parse_body, present_text, ApiError};
use crate::gateway::state::AppState;
use crate::providers::{FirearmAnalysis, UpstreamError, VisionClient};

#[derive(Debug, Deserialize)]
struct AnalyzeImageRequest {
    #[serde(rename = "imageUrl")]
    image_url: Option<Value>,
}

/// POST /analyze-image
pub async fn handle_analyze_image(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<FirearmAnalysis>, ApiError> {
    let request: AnalyzeImageRequest = parse_body(&body)?;
    let image_url = present_text(request.image_url)
        .ok_or_else(|| ApiError::BadRequest("No image URL provided".to_string()))?;

    // 只记录前缀，data URL 可能非常长
    let preview: String = image_url.chars().take(30).collect();
    tracing::info!(image = %preview, "analyzing image");

    let vision = VisionClient::from_config(state.config(), state.http()).map_err(|e| match e {
        UpstreamError::MissingKey(_) => ApiError::Config("OpenAI API key not configured".into()),
        other => other.into(),
    })?;

    let analysis = vision.analyze(&image_url).await.map_err(|e| match e {
        UpstreamError::Status { status, body } => {
            tracing::error!(status = status.as_u16(), "OpenAI API error: {}", body);
            ApiError::Upstream {
                error: "Error calling OpenAI API".to_string(),
                details: body,
            }
        }
        other => {
            tracing::error!("analyze-image failed: {}", other);
            other.into()
        }
    })?;

    tracing::info!(
        make = %analysis.make,
        model = %analysis.model,
        confidence = analysis.confidence,
        "analysis complete"
    );

    Ok(Json(analysis))
}
