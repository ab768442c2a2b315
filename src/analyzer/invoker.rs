//! 推論呼び出しモジュール
//!
//! InferenceService（外部Visionサービス）への呼び出しを再試行ポリシー付きで行う。
//! - 1回ごとにタイムアウト（タイムアウトも1回分として数える）
//! - 一時的な失敗のみ指数バックオフで再試行
//! - 恒久的な失敗（認証・不正リクエスト）は即座に返す
//!
//! 呼び出し前後で状態を持たないため、再試行は同じリクエストをそのまま繰り返す。

use crate::config::Config;
use crate::scanner::ImagePayload;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// 推論サービスの失敗
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InferenceFailure {
    #[error("request timed out")]
    Timeout,

    #[error("rate limited by the service")]
    RateLimited,

    #[error("service error (HTTP {0})")]
    Server(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("credentials rejected: {0}")]
    Unauthorized(String),

    #[error("request rejected: {0}")]
    InvalidRequest(String),
}

impl InferenceFailure {
    /// 再試行で回復しうる失敗か
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            InferenceFailure::Timeout
                | InferenceFailure::RateLimited
                | InferenceFailure::Server(_)
                | InferenceFailure::Network(_)
        )
    }
}

/// 外部Visionサービス
pub trait InferenceService: Send + Sync {
    /// ログ用の名前
    fn name(&self) -> &str;

    /// プロンプトと画像1枚から生テキストを得る
    fn infer(
        &self,
        prompt: &str,
        image: &ImagePayload,
    ) -> impl Future<Output = Result<String, InferenceFailure>> + Send;
}

/// 再試行ポリシー
#[derive(Clone, Copy)]
pub struct RetryPolicy {
    /// 初回を含む試行回数の上限
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// 1回の試行のタイムアウト
    pub attempt_timeout: Duration,
    /// 再試行対象の判定
    pub retryable: fn(&InferenceFailure) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
            attempt_timeout: Duration::from_secs(60),
            retryable: InferenceFailure::is_transient,
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("initial_backoff", &self.initial_backoff)
            .field("max_backoff", &self.max_backoff)
            .field("attempt_timeout", &self.attempt_timeout)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.retry.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.retry.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.retry.max_backoff_ms),
            attempt_timeout: config.timeout(),
            ..Default::default()
        }
    }

    /// n回目の再試行前の待ち時間: min(initial × 2^(n-1), max)
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// 成功した呼び出し
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub text: String,
    pub attempts: u32,
}

/// 失敗した呼び出し
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeFailure {
    /// 最後の失敗
    pub failure: InferenceFailure,
    pub attempts: u32,
    /// 再試行を使い切ったか
    pub exhausted: bool,
}

pub struct Invoker<S> {
    service: S,
    policy: RetryPolicy,
}

impl<S: InferenceService> Invoker<S> {
    pub fn new(service: S, policy: RetryPolicy) -> Self {
        Self { service, policy }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// 再試行ポリシーに従って推論を呼び出す
    ///
    /// # Arguments
    /// * `prompt` - 抽出プロンプト
    /// * `image` - チェック済み画像
    ///
    /// # Returns
    /// * `Ok(Invocation)` - 生テキストと試行回数
    /// * `Err(InvokeFailure)` - 最後の失敗と試行回数
    pub async fn invoke(
        &self,
        prompt: &str,
        image: &ImagePayload,
    ) -> Result<Invocation, InvokeFailure> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let outcome = match tokio::time::timeout(
                self.policy.attempt_timeout,
                self.service.infer(prompt, image),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(InferenceFailure::Timeout),
            };

            let failure = match outcome {
                Ok(text) => {
                    debug!(
                        service = self.service.name(),
                        image = %image.fingerprint,
                        attempt,
                        response_len = text.len(),
                        "推論成功"
                    );
                    return Ok(Invocation {
                        text,
                        attempts: attempt,
                    });
                }
                Err(failure) => failure,
            };

            if !(self.policy.retryable)(&failure) {
                return Err(InvokeFailure {
                    failure,
                    attempts: attempt,
                    exhausted: false,
                });
            }

            if attempt >= max_attempts {
                return Err(InvokeFailure {
                    failure,
                    attempts: attempt,
                    exhausted: true,
                });
            }

            let delay = self.policy.backoff_for(attempt);
            warn!(
                service = self.service.name(),
                image = %image.fingerprint,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "推論呼び出し失敗、再試行します"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
