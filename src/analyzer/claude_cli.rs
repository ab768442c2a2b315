//! Claude CLI連携モジュール
//!
//! 画像を temp-images に呼び出しごとの一時ファイルとして書き出し、
//! `claude -p` にファイルパス付きプロンプトを渡す。
//! 子プロセスは kill_on_drop で起動する。呼び出し側が future を破棄すると
//! 子プロセスは終了し、一時ファイルも削除される。

use super::invoker::{InferenceFailure, InferenceService};
use crate::error::Result;
use crate::scanner::ImagePayload;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::process::Command;

pub struct ClaudeCliClient {
    temp_dir: PathBuf,
    model: Option<String>,
}

impl ClaudeCliClient {
    pub fn new(model: Option<String>) -> Result<Self> {
        Ok(Self {
            temp_dir: get_temp_dir()?,
            model,
        })
    }

    /// 呼び出しごとに一意な一時ファイルへ画像を書き出す
    ///
    /// 返り値を drop するとファイルは削除される（タイムアウト・キャンセル時も含む）
    fn write_temp_image(&self, image: &ImagePayload) -> std::io::Result<NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix(&format!("{}-", image.fingerprint))
            .suffix(&format!(".{}", image.extension()))
            .tempfile_in(&self.temp_dir)?;
        file.write_all(&image.bytes)?;
        file.flush()?;
        Ok(file)
    }
}

fn get_temp_dir() -> Result<PathBuf> {
    let temp_dir = std::env::current_dir()?.join("temp-images");
    std::fs::create_dir_all(&temp_dir)?;
    Ok(temp_dir)
}

/// CLIへ渡すプロンプト（改行をスペースに置換してcmd経由でも渡せるようにする）
fn build_cli_prompt(image_path: &Path, prompt: &str) -> String {
    let raw_prompt = format!(
        "Read the following image file and analyze it: {}\n\n{}",
        image_path.display().to_string().replace('\\', "/"),
        prompt
    );
    raw_prompt.replace('\n', " ").replace('"', "\\\"")
}

/// 終了コードと stderr から失敗を分類
fn classify_exit(code: Option<i32>, stderr: &str) -> InferenceFailure {
    let lower = stderr.to_lowercase();
    if lower.contains("rate limit") || lower.contains("429") || lower.contains("overloaded") {
        InferenceFailure::RateLimited
    } else if lower.contains("api key")
        || lower.contains("unauthorized")
        || lower.contains("401")
        || lower.contains("login")
    {
        InferenceFailure::Unauthorized(format!("Claude CLI failed (code {:?})", code))
    } else if stderr.trim().is_empty() {
        InferenceFailure::Server(code.map(|c| c.clamp(0, 999) as u16).unwrap_or(0))
    } else {
        InferenceFailure::Network(stderr.trim().chars().take(300).collect())
    }
}

impl InferenceService for ClaudeCliClient {
    fn name(&self) -> &str {
        "claude"
    }

    async fn infer(&self, prompt: &str, image: &ImagePayload) -> std::result::Result<String, InferenceFailure> {
        let temp_image = self.write_temp_image(image).map_err(|e| {
            InferenceFailure::InvalidRequest(format!("一時ファイル作成エラー: {}", e))
        })?;
        let local_path = std::fs::canonicalize(temp_image.path())
            .unwrap_or_else(|_| temp_image.path().to_path_buf());
        let full_prompt = build_cli_prompt(&local_path, prompt);

        // Claude CLI呼び出し（Windowsではcmd /c経由）
        #[cfg(windows)]
        let mut command = {
            let mut c = Command::new("cmd");
            c.args(["/c", "claude"]);
            c
        };
        #[cfg(not(windows))]
        let mut command = Command::new("claude");

        command
            .args(["-p", full_prompt.as_str(), "--output-format", "text"])
            .kill_on_drop(true);
        if let Some(model) = &self.model {
            command.arg("--model").arg(model);
        }

        let output = command.output().await;
        drop(temp_image);

        let output = output.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                InferenceFailure::InvalidRequest("claude コマンドが見つかりません".into())
            } else {
                InferenceFailure::Network(format!("Claude CLI実行エラー: {}", e))
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_exit(output.status.code(), &stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}
