use crate::ai_provider::AiProvider;
use clap::{Parser, Subcommand};
use scoreboard_ai_common::GameVersion;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "scoreboard-ai")]
#[command(about = "CoDスコアボード画像のAI解析・正規化ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// AIプロバイダ (gemini/claude)。省略時は設定ファイルの値
    #[arg(long, global = true)]
    pub ai_provider: Option<AiProvider>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// スクリーンショット（ファイルまたはフォルダ）を解析してJSONを出力
    Analyze {
        /// 画像ファイルまたはフォルダのパス
        #[arg(required = true)]
        path: PathBuf,

        /// タイトル (bo6/mw3/mw2/cw/vanguard)
        #[arg(short, long)]
        game_version: Option<GameVersion>,

        /// 出力JSONファイル（省略時は標準出力）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// フォルダ解析の同時実行数（省略時は設定ファイルの値）
        #[arg(short, long)]
        concurrency: Option<usize>,
    },

    /// 保存済みのAI応答テキストをパース・正規化
    Parse {
        /// AI応答テキストファイル
        #[arg(required = true)]
        response: PathBuf,

        /// タイトル (bo6/mw3/mw2/cw/vanguard)
        #[arg(short, long)]
        game_version: Option<GameVersion>,

        /// 出力JSONファイル（省略時は標準出力）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 解析結果JSONを再正規化
    Normalize {
        /// 入力JSONファイル
        #[arg(required = true)]
        input: PathBuf,

        /// 出力ファイル（省略時は標準出力）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 設定を表示/編集
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}
