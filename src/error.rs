use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoreboardAiError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("APIキーが設定されていません。`scoreboard-ai config --set-api-key YOUR_KEY` または {0} で設定してください")]
    MissingApiKey(&'static str),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("画像が見つかりません: {0}")]
    NoImagesFound(String),

    #[error("解析結果の読み込みに失敗: {0}")]
    InvalidResult(#[from] scoreboard_ai_common::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTPクライアント初期化エラー: {0}")]
    HttpClient(String),
}

pub type Result<T> = std::result::Result<T, ScoreboardAiError>;
