use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    #[default]
    Gemini,
    Claude,
}

impl AiProvider {
    pub fn command_name(&self) -> &'static str {
        match self {
            AiProvider::Gemini => "gemini",
            AiProvider::Claude => "claude",
        }
    }

    /// APIキーを読む環境変数（設定ファイルより優先）
    pub fn api_key_env(&self) -> &'static str {
        match self {
            AiProvider::Gemini => "GEMINI_API_KEY",
            AiProvider::Claude => "ANTHROPIC_API_KEY",
        }
    }

    /// Claude は CLI 側の認証を使うためキー不要
    pub fn requires_api_key(&self) -> bool {
        matches!(self, AiProvider::Gemini)
    }
}

impl std::fmt::Display for AiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.command_name())
    }
}
