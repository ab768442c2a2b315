//! スコアボード解析パイプライン
//!
//! 画像 → 推論呼び出し → パース → 正規化 の順に1方向で進む。
//! 各段階の遷移は tracing で記録し、失敗は必ず ScoreboardAnalysisError として返す。

pub mod classify;
pub mod claude_cli;
pub mod gemini;
pub mod invoker;

pub use claude_cli::ClaudeCliClient;
pub use gemini::GeminiClient;
pub use invoker::{
    InferenceFailure, InferenceService, Invocation, InvokeFailure, Invoker, RetryPolicy,
};

use crate::ai_provider::AiProvider;
use crate::config::Config;
use crate::error::Result;
use crate::scanner::{ImageInfo, ImagePayload};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use scoreboard_ai_common::{
    build_scoreboard_prompt, normalize_candidate, parse_candidate, ErrorKind, GameVersion,
    NormalizeOptions, ScoreboardAnalysisError, ScoreboardAnalysisResult,
};
use serde::Serialize;
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// リクエストの処理段階（後戻りしない）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AnalysisStage {
    Pending,
    Invoking,
    Parsing,
    Normalizing,
    Succeeded,
    Failed,
}

impl fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnalysisStage::Pending => "pending",
            AnalysisStage::Invoking => "invoking",
            AnalysisStage::Parsing => "parsing",
            AnalysisStage::Normalizing => "normalizing",
            AnalysisStage::Succeeded => "succeeded",
            AnalysisStage::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// 画像1枚の解析結果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisOutcome {
    Success(ScoreboardAnalysisResult),
    Failure(ScoreboardAnalysisError),
}

impl AnalysisOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisOutcome::Success(_))
    }

    /// 成功したが一部欠落あり
    pub fn is_partial(&self) -> bool {
        matches!(self, AnalysisOutcome::Success(r) if r.is_partial())
    }

    pub fn into_result(self) -> std::result::Result<ScoreboardAnalysisResult, ScoreboardAnalysisError> {
        match self {
            AnalysisOutcome::Success(result) => Ok(result),
            AnalysisOutcome::Failure(error) => Err(error),
        }
    }
}

/// 段階遷移の記録
struct StageTracker<'a> {
    file_name: &'a str,
    fingerprint: Option<String>,
    stage: AnalysisStage,
}

impl<'a> StageTracker<'a> {
    fn new(file_name: &'a str) -> Self {
        Self {
            file_name,
            fingerprint: None,
            stage: AnalysisStage::Pending,
        }
    }

    fn advance(&mut self, next: AnalysisStage) {
        debug_assert!(next > self.stage, "stage went backwards: {} -> {}", self.stage, next);
        debug!(
            file = self.file_name,
            image = self.fingerprint.as_deref().unwrap_or("-"),
            from = %self.stage,
            to = %next,
            "stage transition"
        );
        self.stage = next;
    }

    fn fail(mut self, error: ScoreboardAnalysisError) -> AnalysisOutcome {
        let failed_at = self.stage;
        self.advance(AnalysisStage::Failed);
        error!(
            file = self.file_name,
            image = self.fingerprint.as_deref().unwrap_or("-"),
            stage = %failed_at,
            error = %error,
            "解析失敗"
        );
        AnalysisOutcome::Failure(error)
    }

    fn succeed(mut self, result: ScoreboardAnalysisResult, attempts: u32) -> AnalysisOutcome {
        self.advance(AnalysisStage::Succeeded);
        info!(
            file = self.file_name,
            image = self.fingerprint.as_deref().unwrap_or("-"),
            mode = %result.mode,
            teams = result.teams.len(),
            players = result.player_count(),
            confidence = %result.confidence,
            partial = result.is_partial(),
            attempts,
            "解析完了"
        );
        AnalysisOutcome::Success(result)
    }
}

/// 設定で選ばれた推論サービス
pub enum Backend {
    Gemini(GeminiClient),
    Claude(ClaudeCliClient),
}

impl Backend {
    pub fn from_config(provider: AiProvider, config: &Config) -> Result<Self> {
        match provider {
            AiProvider::Gemini => {
                let api_key = config.get_api_key(provider)?;
                let client = GeminiClient::new(api_key, config.model.clone(), config.timeout())?;
                Ok(Backend::Gemini(client))
            }
            AiProvider::Claude => {
                // Gemini用の既定モデル名はCLIに渡さない
                let model = Some(config.model.clone()).filter(|m| m.starts_with("claude"));
                Ok(Backend::Claude(ClaudeCliClient::new(model)?))
            }
        }
    }
}

impl InferenceService for Backend {
    fn name(&self) -> &str {
        match self {
            Backend::Gemini(client) => client.name(),
            Backend::Claude(client) => client.name(),
        }
    }

    async fn infer(
        &self,
        prompt: &str,
        image: &ImagePayload,
    ) -> std::result::Result<String, InferenceFailure> {
        match self {
            Backend::Gemini(client) => client.infer(prompt, image).await,
            Backend::Claude(client) => client.infer(prompt, image).await,
        }
    }
}

/// フォルダ解析の1件
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntry {
    pub file_name: String,
    pub outcome: AnalysisOutcome,
}

/// フォルダ解析のレポート
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub generated_at: String,
    pub service: String,
    pub total: usize,
    pub succeeded: usize,
    pub partial: usize,
    pub failed: usize,
    /// 途中でキャンセルされた（未処理の画像は entries に含まれない）
    pub cancelled: bool,
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    fn new(service: &str, total: usize, entries: Vec<BatchEntry>, cancelled: bool) -> Self {
        let succeeded = entries.iter().filter(|e| e.outcome.is_success()).count();
        let partial = entries.iter().filter(|e| e.outcome.is_partial()).count();
        Self {
            generated_at: chrono::Local::now().to_rfc3339(),
            service: service.to_string(),
            total,
            succeeded,
            partial,
            failed: entries.len() - succeeded,
            cancelled,
            entries,
        }
    }
}

pub struct ScoreboardAnalyzer<S> {
    invoker: Invoker<S>,
    options: NormalizeOptions,
    max_image_bytes: u64,
}

impl<S: InferenceService> ScoreboardAnalyzer<S> {
    pub fn new(service: S, policy: RetryPolicy, options: NormalizeOptions, max_image_bytes: u64) -> Self {
        Self {
            invoker: Invoker::new(service, policy),
            options,
            max_image_bytes,
        }
    }

    pub fn from_config(service: S, config: &Config) -> Self {
        Self::new(
            service,
            RetryPolicy::from_config(config),
            config.salvage.clone(),
            config.max_image_bytes,
        )
    }

    pub fn service(&self) -> &S {
        self.invoker.service()
    }

    /// 画像1枚を解析
    ///
    /// # Arguments
    /// * `file_name` - ログ・エラー表示用の名前
    /// * `bytes` - 画像データ
    /// * `version_hint` - タイトルが分かっている場合に指定
    ///
    /// # Returns
    /// 正規化済みの結果（partial の場合あり）またはエラー1件
    pub async fn analyze(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        version_hint: Option<GameVersion>,
    ) -> AnalysisOutcome {
        let mut stage = StageTracker::new(file_name);

        let image = match ImagePayload::new(file_name, bytes, self.max_image_bytes) {
            Ok(image) => image,
            Err(error) => return stage.fail(error),
        };
        stage.fingerprint = Some(image.fingerprint.clone());

        stage.advance(AnalysisStage::Invoking);
        let prompt = build_scoreboard_prompt(version_hint);
        let invocation = match self.invoker.invoke(&prompt, &image).await {
            Ok(invocation) => invocation,
            Err(failure) => {
                let error = classify::from_invoke_failure(self.invoker.service().name(), &failure);
                return stage.fail(error);
            }
        };

        stage.advance(AnalysisStage::Parsing);
        let candidate = match parse_candidate(&invocation.text) {
            Ok(candidate) => candidate,
            Err(e) => return stage.fail(classify::from_parse_error(&e, &invocation.text)),
        };

        stage.advance(AnalysisStage::Normalizing);
        match normalize_candidate(&candidate, version_hint, &self.options) {
            Ok(result) => stage.succeed(result, invocation.attempts),
            Err(e) => stage.fail(classify::from_normalize_error(&e)),
        }
    }

    /// キャンセル可能な解析
    ///
    /// キャンセル時は呼び出し中の推論を破棄し None を返す（部分結果は返さない）
    pub async fn analyze_with_cancel(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        version_hint: Option<GameVersion>,
        cancel: &CancellationToken,
    ) -> Option<AnalysisOutcome> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(file = file_name, "解析をキャンセルしました");
                None
            }
            outcome = self.analyze(file_name, bytes, version_hint) => Some(outcome),
        }
    }

    /// ファイルを読み込んで解析
    pub async fn analyze_file(&self, info: &ImageInfo, version_hint: Option<GameVersion>) -> AnalysisOutcome {
        match tokio::fs::read(&info.path).await {
            Ok(bytes) => self.analyze(&info.file_name, bytes, version_hint).await,
            Err(e) => {
                error!(file = %info.path.display(), error = %e, "画像読み込み失敗");
                AnalysisOutcome::Failure(ScoreboardAnalysisError::new(
                    ErrorKind::InvalidImage,
                    format!("{}: could not be read ({})", info.file_name, e),
                ))
            }
        }
    }

    /// 複数画像を並列に解析（結果は入力順）
    ///
    /// # Arguments
    /// * `images` - scan_folder の結果
    /// * `concurrency` - 同時に処理する枚数
    /// * `cancel` - キャンセル時は未完了の画像を結果に含めない
    /// * `show_progress` - 進捗バーを表示するか
    pub async fn analyze_batch(
        &self,
        images: &[ImageInfo],
        version_hint: Option<GameVersion>,
        concurrency: usize,
        cancel: &CancellationToken,
        show_progress: bool,
    ) -> BatchReport {
        let bar = show_progress.then(|| {
            let bar = ProgressBar::new(images.len() as u64);
            bar.set_style(
                ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar
        });
        let bar_ref = bar.as_ref();

        let entries: Vec<Option<BatchEntry>> = stream::iter(images)
            .map(|info| async move {
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    outcome = self.analyze_file(info, version_hint) => Some(outcome),
                };
                if let Some(bar) = bar_ref {
                    bar.set_message(info.file_name.clone());
                    bar.inc(1);
                }
                outcome.map(|outcome| BatchEntry {
                    file_name: info.file_name.clone(),
                    outcome,
                })
            })
            .buffered(concurrency.max(1))
            .collect()
            .await;

        if let Some(bar) = &bar {
            bar.finish_and_clear();
        }

        let cancelled = cancel.is_cancelled();
        let entries: Vec<BatchEntry> = entries.into_iter().flatten().collect();
        let report = BatchReport::new(self.service().name(), images.len(), entries, cancelled);

        info!(
            total = report.total,
            succeeded = report.succeeded,
            partial = report.partial,
            failed = report.failed,
            cancelled = report.cancelled,
            "フォルダ解析完了"
        );
        report
    }
}

/// 保存済みのAI応答をパース・正規化（推論呼び出しなし）
pub fn analyze_response(
    response: &str,
    version_hint: Option<GameVersion>,
    options: &NormalizeOptions,
) -> AnalysisOutcome {
    let candidate = match parse_candidate(response) {
        Ok(candidate) => candidate,
        Err(e) => return AnalysisOutcome::Failure(classify::from_parse_error(&e, response)),
    };
    match normalize_candidate(&candidate, version_hint, options) {
        Ok(result) => AnalysisOutcome::Success(result),
        Err(e) => AnalysisOutcome::Failure(classify::from_normalize_error(&e)),
    }
}

/// 保存済みの結果JSONを再正規化
pub fn renormalize_value(value: &serde_json::Value, options: &NormalizeOptions) -> AnalysisOutcome {
    match value.as_object() {
        Some(candidate) => match normalize_candidate(candidate, None, options) {
            Ok(result) => AnalysisOutcome::Success(result),
            Err(e) => AnalysisOutcome::Failure(classify::from_normalize_error(&e)),
        },
        None => AnalysisOutcome::Failure(ScoreboardAnalysisError::new(
            ErrorKind::UnparsableResponse,
            "the result file is not a JSON object",
        )),
    }
}
