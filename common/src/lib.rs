//! Scoreboard AI Common Library
//!
//! CLI・永続化層・UIで共有するワイヤ契約と、AI出力の解析・正規化。
//! I/Oを持たない純粋な処理のみを置く。

pub mod error;
pub mod normalizer;
pub mod parser;
pub mod prompts;
pub mod types;

pub use error::{Error, Result};
pub use normalizer::{normalize_candidate, normalize_response, renormalize, NormalizeOptions};
pub use parser::{close_truncated, extract_json, parse_candidate, repair_json};
pub use prompts::build_scoreboard_prompt;
pub use types::{
    ConfidenceLevel, ControlStats, DebugInfo, ErrorKind, GameMode, GameVersion, HardpointStats,
    MatchStatus, ModeStats, PlayerScoreboardData, ScoreboardAnalysisError,
    ScoreboardAnalysisResult, ScoreboardMetadata, ScoreboardType, ScreenshotQuality,
    SearchAndDestroyStats, StatTime, TeamScoreboardData,
};
