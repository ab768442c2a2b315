//! 失敗の分類
//!
//! 各段階の失敗を ErrorKind に対応付け、利用者向けの詳細文を作る。
//! 詳細文からは認証情報と画像データ（base64）を除去する。

use super::invoker::{InferenceFailure, InvokeFailure};
use lazy_static::lazy_static;
use regex::Regex;
use scoreboard_ai_common::{Error as CommonError, ErrorKind, ScoreboardAnalysisError};

/// 詳細文の最大文字数
const MAX_DETAIL_CHARS: usize = 500;

/// 応答の先頭として詳細に含める文字数
const RESPONSE_PREVIEW_CHARS: usize = 120;

lazy_static! {
    static ref KEY_PARAM: Regex =
        Regex::new(r"(?i)\b(api[_-]?key|key|token|secret|access_token)=[^&\s]+").unwrap();
    static ref KEY_HEADER: Regex =
        Regex::new(r"(?i)\b(x-goog-api-key|x-api-key|authorization)\s*:\s*\S+").unwrap();
    static ref BEARER: Regex = Regex::new(r"(?i)\bbearer\s+[A-Za-z0-9._~+/=-]+").unwrap();
    static ref API_KEY: Regex =
        Regex::new(r"\b(AIza[0-9A-Za-z_-]{20,}|sk-[A-Za-z0-9_-]{16,})").unwrap();
    static ref BASE64_BLOB: Regex =
        Regex::new(r"(data:[a-z]+/[a-z0-9.+-]+;base64,)?[A-Za-z0-9+/]{100,}={0,2}").unwrap();
}

/// 認証情報と画像データを伏せ字にする
pub fn redact(text: &str) -> String {
    let text = KEY_PARAM.replace_all(text, "$1=[REDACTED]");
    let text = KEY_HEADER.replace_all(&text, "$1: [REDACTED]");
    let text = BEARER.replace_all(&text, "Bearer [REDACTED]");
    let text = API_KEY.replace_all(&text, "[REDACTED]");
    let text = BASE64_BLOB.replace_all(&text, "[image data]");
    truncate(text.trim(), MAX_DETAIL_CHARS)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

/// 推論呼び出しの失敗
pub fn from_invoke_failure(service: &str, failure: &InvokeFailure) -> ScoreboardAnalysisError {
    let attempts = match failure.attempts {
        1 => "1 attempt".to_string(),
        n => format!("{} attempts", n),
    };

    let (kind, details) = match &failure.failure {
        InferenceFailure::Unauthorized(msg) => (
            ErrorKind::ServiceAuthFailure,
            format!("{} rejected the credentials ({})", service, msg),
        ),
        InferenceFailure::InvalidRequest(msg) => (
            ErrorKind::InvalidImage,
            format!("{} rejected the request: {}", service, msg),
        ),
        transient => {
            let retry_note = if failure.exhausted {
                "retries exhausted"
            } else {
                "not retried"
            };
            (
                ErrorKind::ServiceUnavailable,
                format!("{}: {} after {}; {}", service, transient, attempts, retry_note),
            )
        }
    };

    ScoreboardAnalysisError::new(kind, redact(&details))
}

/// パース失敗
pub fn from_parse_error(error: &CommonError, response: &str) -> ScoreboardAnalysisError {
    let preview = truncate(response.trim(), RESPONSE_PREVIEW_CHARS);
    let details = if preview.is_empty() {
        format!("{}; the service returned an empty response", error)
    } else {
        format!("{}; response began with: {}", error, preview)
    };
    ScoreboardAnalysisError::new(ErrorKind::UnparsableResponse, redact(&details))
}

/// 正規化の失敗
pub fn from_normalize_error(error: &CommonError) -> ScoreboardAnalysisError {
    match error {
        CommonError::EmptyExtraction(msg) => {
            ScoreboardAnalysisError::new(ErrorKind::EmptyExtraction, redact(msg))
        }
        other => ScoreboardAnalysisError::new(ErrorKind::UnparsableResponse, redact(&other.to_string())),
    }
}
