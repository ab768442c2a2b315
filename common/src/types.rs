//! スコアボード解析結果の型定義
//!
//! 永続化・UI側と共有するワイヤ契約:
//! - 列挙型: GameMode, GameVersion, ConfidenceLevel, ScreenshotQuality, MatchStatus, ScoreboardType
//! - PlayerScoreboardData / TeamScoreboardData: 選手・チーム単位の成績
//! - ScoreboardAnalysisResult: 正規化済みの最終出力
//! - ScoreboardAnalysisError: 失敗時の出力
//!
//! 結果型は Serialize のみ。AI出力の取り込みは必ず normalizer を経由する。

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// 英数字以外を除去して小文字化（表記揺れの吸収用）
fn lenient_key(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '&')
        .collect::<String>()
        .to_lowercase()
}

/// ゲームモード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameMode {
    Hardpoint,
    #[serde(rename = "Search & Destroy")]
    SearchAndDestroy,
    Control,
}

impl GameMode {
    pub const ALL: [GameMode; 3] = [
        GameMode::Hardpoint,
        GameMode::SearchAndDestroy,
        GameMode::Control,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Hardpoint => "Hardpoint",
            GameMode::SearchAndDestroy => "Search & Destroy",
            GameMode::Control => "Control",
        }
    }

    /// 表記揺れを許容してモード名を解釈
    ///
    /// "S&D", "snd", "Search and Destroy", "HP" なども受け付ける
    pub fn parse_lenient(value: &str) -> Option<Self> {
        match lenient_key(value).as_str() {
            "hardpoint" | "hardpoints" | "hp" => Some(GameMode::Hardpoint),
            "searchanddestroy" | "search&destroy" | "searchdestroy" | "s&d" | "snd" | "sd" => {
                Some(GameMode::SearchAndDestroy)
            }
            "control" | "ctrl" => Some(GameMode::Control),
            _ => None,
        }
    }

    /// このモードでのみ有効な選手スタッツのキー（ワイヤ上の名前）
    pub fn stat_keys(&self) -> &'static [&'static str] {
        match self {
            GameMode::Hardpoint => &["hillTime", "objectiveKills", "contestedHillTime"],
            GameMode::SearchAndDestroy => &["defuses", "plants"],
            GameMode::Control => &["captures", "zoneTime"],
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// タイトル（ゲームバージョン）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameVersion {
    #[serde(rename = "Black Ops 6")]
    BlackOps6,
    #[serde(rename = "Modern Warfare III")]
    ModernWarfare3,
    #[serde(rename = "Modern Warfare II")]
    ModernWarfare2,
    #[serde(rename = "Black Ops Cold War")]
    BlackOpsColdWar,
    Vanguard,
}

impl GameVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameVersion::BlackOps6 => "Black Ops 6",
            GameVersion::ModernWarfare3 => "Modern Warfare III",
            GameVersion::ModernWarfare2 => "Modern Warfare II",
            GameVersion::BlackOpsColdWar => "Black Ops Cold War",
            GameVersion::Vanguard => "Vanguard",
        }
    }

    /// 正式名称・略称（bo6, mw3 など）を解釈
    pub fn parse_lenient(value: &str) -> Option<Self> {
        match lenient_key(value).as_str() {
            "blackops6" | "bo6" | "codbo6" => Some(GameVersion::BlackOps6),
            "modernwarfareiii" | "modernwarfare3" | "mw3" | "mwiii" => {
                Some(GameVersion::ModernWarfare3)
            }
            "modernwarfareii" | "modernwarfare2" | "mw2" | "mwii" => {
                Some(GameVersion::ModernWarfare2)
            }
            "blackopscoldwar" | "coldwar" | "bocw" | "cw" => Some(GameVersion::BlackOpsColdWar),
            "vanguard" | "vg" => Some(GameVersion::Vanguard),
            _ => None,
        }
    }
}

impl fmt::Display for GameVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for GameVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GameVersion::parse_lenient(s).ok_or_else(|| {
            format!(
                "Unknown game version: {}. Use bo6, mw3, mw2, cw, or vanguard",
                s
            )
        })
    }
}

/// 抽出値の信頼度
///
/// 宣言順に Low < Medium < High（最小値で集約する）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// 1段階下げる（Lowはそのまま）
    pub fn downgrade(self) -> Self {
        match self {
            ConfidenceLevel::High => ConfidenceLevel::Medium,
            _ => ConfidenceLevel::Low,
        }
    }

    pub fn parse_lenient(value: &str) -> Option<Self> {
        match lenient_key(value).as_str() {
            "high" | "h" => Some(ConfidenceLevel::High),
            "medium" | "med" | "m" | "moderate" => Some(ConfidenceLevel::Medium),
            "low" | "l" => Some(ConfidenceLevel::Low),
            _ => None,
        }
    }

    /// 最小値（悲観的集約）。空なら None
    pub fn min_of(levels: impl IntoIterator<Item = ConfidenceLevel>) -> Option<Self> {
        levels.into_iter().min()
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceLevel::High => write!(f, "high"),
            ConfidenceLevel::Medium => write!(f, "medium"),
            ConfidenceLevel::Low => write!(f, "low"),
        }
    }
}

/// スクリーンショット品質
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenshotQuality {
    Good,
    #[default]
    Medium,
    Poor,
}

impl ScreenshotQuality {
    pub fn parse_lenient(value: &str) -> Option<Self> {
        match lenient_key(value).as_str() {
            "good" | "high" | "clear" | "excellent" => Some(ScreenshotQuality::Good),
            "medium" | "fair" | "ok" | "average" | "moderate" => Some(ScreenshotQuality::Medium),
            "poor" | "low" | "bad" | "blurry" => Some(ScreenshotQuality::Poor),
            _ => None,
        }
    }
}

/// 試合状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "in-progress")]
    InProgress,
}

impl MatchStatus {
    pub fn parse_lenient(value: &str) -> Option<Self> {
        match lenient_key(value).as_str() {
            "completed" | "complete" | "final" | "finished" | "ended" | "over" => {
                Some(MatchStatus::Completed)
            }
            "inprogress" | "ongoing" | "live" | "active" | "midgame" => {
                Some(MatchStatus::InProgress)
            }
            _ => None,
        }
    }
}

/// スコアボードの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreboardType {
    #[serde(rename = "end-of-match")]
    EndOfMatch,
    #[serde(rename = "mid-game")]
    MidGame,
}

impl ScoreboardType {
    pub fn parse_lenient(value: &str) -> Option<Self> {
        match lenient_key(value).as_str() {
            "endofmatch" | "postgame" | "postmatch" | "matchend" | "final" | "endgame" => {
                Some(ScoreboardType::EndOfMatch)
            }
            "midgame" | "ingame" | "live" | "inprogress" | "midmatch" => {
                Some(ScoreboardType::MidGame)
            }
            _ => None,
        }
    }
}

/// 時間系スタッツ（秒）。ワイヤ上は "m:ss"
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct StatTime(pub u32);

impl StatTime {
    /// "3:12", "1:02:03", "95s", "95" を秒として解釈
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }

        if trimmed.contains(':') {
            let mut total: u32 = 0;
            for (i, part) in trimmed.split(':').enumerate() {
                let n: u32 = part.trim().parse().ok()?;
                // 先頭以外の分・秒は 0〜59
                if i > 0 && n >= 60 {
                    return None;
                }
                total = total.checked_mul(60)?.checked_add(n)?;
            }
            return Some(StatTime(total));
        }

        let digits = trimmed.trim_end_matches(['s', 'S']).trim();
        let secs: f64 = digits.parse().ok()?;
        if !secs.is_finite() || secs < 0.0 {
            return None;
        }
        Some(StatTime(secs.round() as u32))
    }
}

impl fmt::Display for StatTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl Serialize for StatTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StatTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Seconds(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Seconds(secs) => Ok(StatTime(secs)),
            Raw::Text(text) => StatTime::parse(&text)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid time: {}", text))),
        }
    }
}

/// Hardpoint専用スタッツ
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardpointStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hill_time: Option<StatTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objective_kills: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contested_hill_time: Option<StatTime>,
}

/// Search & Destroy専用スタッツ
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchAndDestroyStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defuses: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plants: Option<u32>,
}

/// Control専用スタッツ
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captures: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_time: Option<StatTime>,
}

/// モード別スタッツ（モードをタグとするバリアント）
///
/// ワイヤ上では選手オブジェクトにフラットに展開される
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ModeStats {
    Hardpoint(HardpointStats),
    SearchAndDestroy(SearchAndDestroyStats),
    Control(ControlStats),
}

/// 選手単位の成績
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerScoreboardData {
    pub name: String,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damage: Option<u32>,
    #[serde(flatten)]
    pub mode_stats: ModeStats,
    /// kills / max(deaths, 1)（小数2桁）。入力値は使わない
    pub ratio: f64,
    pub confidence: ConfidenceLevel,
}

impl PlayerScoreboardData {
    pub fn compute_ratio(kills: u32, deaths: u32) -> f64 {
        let raw = kills as f64 / deaths.max(1) as f64;
        (raw * 100.0).round() / 100.0
    }
}

/// チーム単位の成績
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamScoreboardData {
    pub team_name: String,
    pub score: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<bool>,
    /// 部分キャプチャでチームが隠れている場合 false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    /// 所属選手の信頼度の最小値
    pub confidence: ConfidenceLevel,
    pub players: Vec<PlayerScoreboardData>,
}

/// デバッグ情報
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DebugInfo {
    pub difficult_areas: Vec<String>,
    pub suggestions: Vec<String>,
    pub ocr_corrections: Vec<String>,
}

impl DebugInfo {
    pub fn add_difficult_area(&mut self, note: impl Into<String>) {
        push_unique(&mut self.difficult_areas, note.into());
    }

    pub fn add_suggestion(&mut self, note: impl Into<String>) {
        push_unique(&mut self.suggestions, note.into());
    }

    pub fn add_ocr_correction(&mut self, note: impl Into<String>) {
        push_unique(&mut self.ocr_corrections, note.into());
    }
}

fn push_unique(list: &mut Vec<String>, note: String) {
    if !note.is_empty() && !list.contains(&note) {
        list.push(note);
    }
}

/// スコアボードのメタデータ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreboardMetadata {
    pub quality: ScreenshotQuality,
    pub match_status: MatchStatus,
    pub scoreboard_type: ScoreboardType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_variant: Option<String>,
    pub partial: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub debug: DebugInfo,
}

impl Default for ScoreboardMetadata {
    fn default() -> Self {
        Self {
            quality: ScreenshotQuality::default(),
            match_status: MatchStatus::InProgress,
            scoreboard_type: ScoreboardType::MidGame,
            season: None,
            event: None,
            map_variant: None,
            partial: false,
            notes: None,
            debug: DebugInfo::default(),
        }
    }
}

/// 正規化済みの解析結果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreboardAnalysisResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_version: Option<GameVersion>,
    pub mode: GameMode,
    pub map: String,
    /// 全チームの信頼度の最小値
    pub confidence: ConfidenceLevel,
    pub teams: Vec<TeamScoreboardData>,
    pub metadata: ScoreboardMetadata,
}

impl ScoreboardAnalysisResult {
    pub fn player_count(&self) -> usize {
        self.teams.iter().map(|t| t.players.len()).sum()
    }

    pub fn is_partial(&self) -> bool {
        self.metadata.partial
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerScoreboardData> {
        self.teams.iter().flat_map(|t| t.players.iter())
    }
}

/// エラー分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    ImageTooLarge,
    InvalidImage,
    ServiceUnavailable,
    ServiceAuthFailure,
    UnparsableResponse,
    EmptyExtraction,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::ImageTooLarge => "ImageTooLarge",
            ErrorKind::InvalidImage => "InvalidImage",
            ErrorKind::ServiceUnavailable => "ServiceUnavailable",
            ErrorKind::ServiceAuthFailure => "ServiceAuthFailure",
            ErrorKind::UnparsableResponse => "UnparsableResponse",
            ErrorKind::EmptyExtraction => "EmptyExtraction",
        }
    }}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// 解析失敗時の出力
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreboardAnalysisError {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ScoreboardAnalysisError {
    pub fn new(kind: ErrorKind, details: impl Into<String>) -> Self {
        let details = details.into();
        Self {
            error: kind.code().to_string(),
            details: if details.is_empty() { None } else { Some(details) },
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        [
            ErrorKind::ImageTooLarge,
            ErrorKind::InvalidImage,
            ErrorKind::ServiceUnavailable,
            ErrorKind::ServiceAuthFailure,
            ErrorKind::UnparsableResponse,
            ErrorKind::EmptyExtraction,
        ]
        .into_iter()
        .find(|k| k.code() == self.error)
    }
}

impl fmt::Display for ScoreboardAnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.details {
            Some(details) => write!(f, "{}: {}", self.error, details),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for ScoreboardAnalysisError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_player(mode_stats: ModeStats) -> PlayerScoreboardData {
        PlayerScoreboardData {
            name: "Ace".to_string(),
            kills: 20,
            deaths: 15,
            assists: 3,
            damage: None,
            mode_stats,
            ratio: PlayerScoreboardData::compute_ratio(20, 15),
            confidence: ConfidenceLevel::High,
        }
    }

    #[test]
    fn test_game_mode_parse_lenient() {
        assert_eq!(GameMode::parse_lenient("Hardpoint"), Some(GameMode::Hardpoint));
        assert_eq!(GameMode::parse_lenient("HP"), Some(GameMode::Hardpoint));
        assert_eq!(GameMode::parse_lenient("S&D"), Some(GameMode::SearchAndDestroy));
        assert_eq!(
            GameMode::parse_lenient("Search and Destroy"),
            Some(GameMode::SearchAndDestroy)
        );
        assert_eq!(GameMode::parse_lenient("control"), Some(GameMode::Control));
        assert_eq!(GameMode::parse_lenient("Deathmatch"), None);
    }

    #[test]
    fn test_game_mode_serialize() {
        let json = serde_json::to_string(&GameMode::SearchAndDestroy).unwrap();
        assert_eq!(json, "\"Search & Destroy\"");
    }

    #[test]
    fn test_game_version_from_str() {
        assert_eq!("bo6".parse::<GameVersion>().unwrap(), GameVersion::BlackOps6);
        assert_eq!("MW III".parse::<GameVersion>().unwrap(), GameVersion::ModernWarfare3);
        assert!("halo".parse::<GameVersion>().is_err());
    }

    #[test]
    fn test_confidence_ordering_and_min() {
        assert!(ConfidenceLevel::Low < ConfidenceLevel::Medium);
        assert!(ConfidenceLevel::Medium < ConfidenceLevel::High);
        let min = ConfidenceLevel::min_of([
            ConfidenceLevel::High,
            ConfidenceLevel::Medium,
            ConfidenceLevel::Low,
        ]);
        assert_eq!(min, Some(ConfidenceLevel::Low));
        assert_eq!(ConfidenceLevel::min_of([]), None);
    }

    #[test]
    fn test_confidence_downgrade() {
        assert_eq!(ConfidenceLevel::High.downgrade(), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::Medium.downgrade(), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::Low.downgrade(), ConfidenceLevel::Low);
    }

    #[test]
    fn test_stat_time_parse() {
        assert_eq!(StatTime::parse("3:12"), Some(StatTime(192)));
        assert_eq!(StatTime::parse("1:02:03"), Some(StatTime(3723)));
        assert_eq!(StatTime::parse("95s"), Some(StatTime(95)));
        assert_eq!(StatTime::parse("45"), Some(StatTime(45)));
        assert_eq!(StatTime::parse("abc"), None);
        assert_eq!(StatTime::parse("3:75"), None);
        assert_eq!(StatTime::parse("1:60:00"), None);
        assert_eq!(StatTime::parse("75:00"), Some(StatTime(4500)));
        assert_eq!(StatTime::parse(""), None);
    }

    #[test]
    fn test_stat_time_display() {
        assert_eq!(StatTime(192).to_string(), "3:12");
        assert_eq!(StatTime(5).to_string(), "0:05");
        assert_eq!(StatTime(3723).to_string(), "62:03");
    }

    #[test]
    fn test_compute_ratio() {
        assert_eq!(PlayerScoreboardData::compute_ratio(10, 0), 10.0);
        assert_eq!(PlayerScoreboardData::compute_ratio(20, 15), 1.33);
        assert_eq!(PlayerScoreboardData::compute_ratio(2, 3), 0.67);
        assert_eq!(PlayerScoreboardData::compute_ratio(0, 0), 0.0);
    }

    #[test]
    fn test_player_serialize_flattens_mode_stats() {
        let player = sample_player(ModeStats::Hardpoint(HardpointStats {
            hill_time: Some(StatTime(192)),
            objective_kills: Some(4),
            contested_hill_time: None,
        }));

        let json = serde_json::to_value(&player).unwrap();
        assert_eq!(json["hillTime"], "3:12");
        assert_eq!(json["objectiveKills"], 4);
        assert_eq!(json["ratio"], 1.33);
        assert_eq!(json["confidence"], "high");
        assert!(json.get("contestedHillTime").is_none());
        assert!(json.get("damage").is_none());
        assert!(json.get("captures").is_none());
    }

    #[test]
    fn test_metadata_serialize() {
        let metadata = ScoreboardMetadata {
            partial: true,
            ..Default::default()
        };
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["quality"], "medium");
        assert_eq!(json["matchStatus"], "in-progress");
        assert_eq!(json["scoreboardType"], "mid-game");
        assert_eq!(json["partial"], true);
        assert!(json["debug"]["ocrCorrections"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_debug_info_deduplicates() {
        let mut debug = DebugInfo::default();
        debug.add_suggestion("mode assumed");
        debug.add_suggestion("mode assumed");
        debug.add_suggestion("");
        assert_eq!(debug.suggestions.len(), 1);
    }

    #[test]
    fn test_analysis_error_wire_format() {
        let error = ScoreboardAnalysisError::new(ErrorKind::EmptyExtraction, "no players");
        let json = serde_json::to_string(&error).unwrap();
        assert_eq!(json, r#"{"error":"EmptyExtraction","details":"no players"}"#);
        assert_eq!(error.kind(), Some(ErrorKind::EmptyExtraction));

        let bare = ScoreboardAnalysisError::new(ErrorKind::ImageTooLarge, "");
        assert_eq!(serde_json::to_string(&bare).unwrap(), r#"{"error":"ImageTooLarge"}"#);
    }
}
