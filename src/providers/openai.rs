//! OpenAI 视觉模型
//!
//! 用固定提示词让模型以 JSON 对象回答，再把答案投影为固定字段的
//! [`FirearmAnalysis`]。模型答案本身是无类型的 map，不会向外传播。

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{status_error, UpstreamError};
use crate::config::{ConfigProvider, OPENAI_API_BASE, OPENAI_API_KEY, OPENAI_VISION_MODEL};
use crate::utils::{is_truthy, truthy_text};

pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_VISION_MODEL: &str = "gpt-4-vision-preview";

const MAX_TOKENS: u32 = 500;
const TEMPERATURE: f64 = 0.3;

/// 模型未给出置信度时的默认值
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

const SYSTEM_PROMPT: &str = "You are a firearms identification expert assistant. \
Your task is to identify firearms from images with high precision. \
Focus on determining the make, model, caliber, and type of the firearm. \
Provide confidence levels for your identifications.";

const USER_PROMPT: &str = "Identify this firearm. Include the make (manufacturer), model, \
caliber if visible, and type of firearm (pistol, rifle, shotgun, etc.). \
If you're unsure about any detail, indicate your confidence level.";

/// 枪支识别结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirearmAnalysis {
    pub make: String,
    pub model: String,
    pub caliber: String,
    #[serde(rename = "type")]
    pub firearm_type: String,
    /// 0.0 - 1.0
    pub confidence: f64,
    #[serde(rename = "additionalInfo")]
    pub additional_info: String,
}

impl FirearmAnalysis {
    /// 将模型答案投影为固定结构，缺失字段使用默认值
    pub fn from_answer(answer: &Map<String, Value>) -> Self {
        let text = |key: &str| answer.get(key).and_then(truthy_text);

        let confidence = answer
            .get("confidence")
            .and_then(number_value)
            .map(|c| c.clamp(0.0, 1.0))
            .unwrap_or(DEFAULT_CONFIDENCE);

        Self {
            make: text("make").unwrap_or_default(),
            model: text("model").unwrap_or_default(),
            caliber: text("caliber").unwrap_or_default(),
            firearm_type: text("type").unwrap_or_default(),
            confidence,
            additional_info: text("additional_info")
                .or_else(|| text("notes"))
                .unwrap_or_default(),
        }
    }
}

fn number_value(value: &Value) -> Option<f64> {
    if !is_truthy(value) {
        return None;
    }
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// 单次请求的视觉模型客户端
pub struct VisionClient<'a> {
    client: &'a Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl<'a> VisionClient<'a> {
    /// 从配置源读取密钥和地址
    ///
    /// 密钥缺失时直接返回 [`UpstreamError::MissingKey`]。
    pub fn from_config(config: &dyn ConfigProvider, client: &'a Client) -> Result<Self, UpstreamError> {
        let api_key = config
            .get_non_empty(OPENAI_API_KEY)
            .ok_or(UpstreamError::MissingKey(OPENAI_API_KEY))?;

        let base_url = config
            .get_non_empty(OPENAI_API_BASE)
            .unwrap_or_else(|| DEFAULT_OPENAI_API_BASE.to_string());

        let model = config
            .get_non_empty(OPENAI_VISION_MODEL)
            .unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string());

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        })
    }

    fn build_request(&self, image_url: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": USER_PROMPT },
                        { "type": "image_url", "image_url": { "url": image_url } }
                    ]
                }
            ],
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
            "response_format": { "type": "json_object" }
        })
    }

    /// 识别图片中的枪支
    pub async fn analyze(&self, image_url: &str) -> Result<FirearmAnalysis, UpstreamError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.build_request(image_url))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let completion: Value = response.json().await?;
        let answer = parse_answer(&completion)?;
        Ok(FirearmAnalysis::from_answer(&answer))
    }
}

/// 取出 `choices[0].message.content` 并解析为 JSON 对象
fn parse_answer(completion: &Value) -> Result<Map<String, Value>, UpstreamError> {
    let content = completion
        .pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .ok_or_else(|| UpstreamError::Decode("missing choices[0].message.content".into()))?;

    match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(UpstreamError::Decode("model answer is not a JSON object".into())),
        Err(e) => Err(UpstreamError::Decode(format!("model answer is not JSON: {e}"))),
    }
}
