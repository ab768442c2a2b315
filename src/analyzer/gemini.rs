//! Gemini API連携
//!
//! 画像1枚をinline_dataとして送り、生テキストを返す。
//! HTTPステータスを InferenceFailure に対応付ける（再試行判定は invoker 側）。

use super::invoker::{InferenceFailure, InferenceService};
use crate::error::{Result, ScoreboardAiError};
use crate::scanner::ImagePayload;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini APIリクエスト
#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

/// Gemini APIレスポンス
#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// # Arguments
    /// * `api_key` - Gemini API key
    /// * `model` - モデル名（例: gemini-2.0-flash）
    /// * `timeout` - HTTPタイムアウト（invoker の試行タイムアウトとは別の上限）
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("scoreboard-ai/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ScoreboardAiError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            model,
            base_url: GEMINI_API_BASE.to_string(),
        })
    }

    /// 接続先を差し替える（ローカルのモックサーバー用）
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.base_url.trim_end_matches('/'), self.model)
    }

    fn build_request(prompt: &str, image: &ImagePayload) -> GeminiRequest {
        GeminiRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: prompt.to_string(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: image.mime_type.to_string(),
                            data: image.to_base64(),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: 0.1,
                response_mime_type: "application/json".to_string(),
            },
        }
    }
}

/// HTTPステータスの分類
fn classify_status(status: StatusCode, body: &str) -> InferenceFailure {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            InferenceFailure::Unauthorized(format!("HTTP {}", status.as_u16()))
        }
        // 無効なキーは 400 + API_KEY_INVALID で返る
        StatusCode::BAD_REQUEST if body.contains("API_KEY_INVALID") || body.contains("API key not valid") => {
            InferenceFailure::Unauthorized("API key not valid".into())
        }
        StatusCode::TOO_MANY_REQUESTS => InferenceFailure::RateLimited,
        StatusCode::REQUEST_TIMEOUT => InferenceFailure::Timeout,
        s if s.is_server_error() => InferenceFailure::Server(s.as_u16()),
        s => {
            let snippet: String = body.chars().take(200).collect();
            InferenceFailure::InvalidRequest(format!("HTTP {}: {}", s.as_u16(), snippet))
        }
    }
}

fn classify_transport(error: reqwest::Error) -> InferenceFailure {
    if error.is_timeout() {
        InferenceFailure::Timeout
    } else {
        InferenceFailure::Network(error.to_string())
    }
}

/// レスポンス本文から最初の候補テキストを取り出す
fn extract_text(payload: GeminiResponse) -> Option<String> {
    payload
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .map(|p| p.text)
        .find(|t| !t.trim().is_empty())
}

impl InferenceService for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn infer(&self, prompt: &str, image: &ImagePayload) -> std::result::Result<String, InferenceFailure> {
        let request = Self::build_request(prompt, image);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let payload: GeminiResponse = response.json().await.map_err(classify_transport)?;

        // 候補なし（安全フィルタ等）は空文字として後段で EmptyExtraction/UnparsableResponse にする
        Ok(extract_text(payload).unwrap_or_default())
    }
}
