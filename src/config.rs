use crate::ai_provider::AiProvider;
use crate::error::{Result, ScoreboardAiError};
use scoreboard_ai_common::NormalizeOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 再試行設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_backoff_ms: 500,
            max_backoff_ms: 8000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: String,
    pub provider: AiProvider,
    /// これを超える画像は推論前に拒否
    pub max_image_bytes: u64,
    /// 1回の推論呼び出しのタイムアウト
    pub timeout_seconds: u64,
    pub retry: RetrySettings,
    pub salvage: NormalizeOptions,
    /// フォルダ解析の同時実行数
    pub concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.0-flash".into(),
            provider: AiProvider::Gemini,
            max_image_bytes: 8 * 1024 * 1024,
            timeout_seconds: 60,
            retry: RetrySettings::default(),
            salvage: NormalizeOptions::default(),
            concurrency: 4,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// 指定パスから読み込み（存在しなければ既定値）
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| ScoreboardAiError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("scoreboard-ai").join("config.json"))
    }

    fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(ScoreboardAiError::Config(
                "retry.max_attempts は1以上にしてください".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.salvage.max_unrecoverable_ratio) {
            return Err(ScoreboardAiError::Config(
                "salvage.max_unrecoverable_ratio は0.0〜1.0で指定してください".into(),
            ));
        }
        if self.concurrency == 0 {
            return Err(ScoreboardAiError::Config("concurrency は1以上にしてください".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn get_api_key(&self, provider: AiProvider) -> Result<String> {
        // 環境変数を優先
        if let Ok(key) = std::env::var(provider.api_key_env()) {
            if !key.trim().is_empty() {
                return Ok(key);
            }
        }

        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ScoreboardAiError::MissingApiKey(provider.api_key_env()))
    }

    pub fn set_api_key(&mut self, key: String) -> Result<()> {
        self.api_key = Some(key);
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.max_image_bytes, 8 * 1024 * 1024);
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.salvage.max_unrecoverable_ratio, 0.5);
        assert_eq!(config.provider, AiProvider::Gemini);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"timeout_seconds": 10, "retry": {"max_attempts": 4}}"#).unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.initial_backoff_ms, 500);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.model, "gemini-2.0-flash");
    }

    #[test]
    fn test_provider_serialize() {
        let config = Config {
            provider: AiProvider::Claude,
            ..Default::default()
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["provider"], "claude");
    }
}
