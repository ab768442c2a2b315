//! Scoreboard AI
//!
//! CoDスコアボードのスクリーンショットをVisionサービスで読み取り、
//! 検証済みの成績データ（ScoreboardAnalysisResult）に変換する。

pub mod ai_provider;
pub mod analyzer;
pub mod cli;
pub mod config;
pub mod error;
pub mod scanner;

pub use scoreboard_ai_common as common;
