//! スコアボード正規化モジュール
//!
//! パース済みの候補オブジェクト（型なし）を検証し、ワイヤ契約どおりの
//! ScoreboardAnalysisResult に変換する。AI出力の許容・救済はすべてここで行う。
//!
//! ## 処理順（再現性のため固定）
//! 1. モード解決（推定した場合は suggestions に記録し信頼度を1段階下げる）
//! 2. モード外のスタッツを破棄
//! 3. 数値変換。読めない必須項目は信頼度 low、過半数が読めない選手は破棄
//! 4. K/D比の再計算
//! 5. スコアと勝敗の整合
//! 6. 信頼度の集約（選手 → チーム → 結果）
//! 7. partial・品質・試合状態のフラグ

pub mod coerce;
pub mod confidence;
pub mod mode;

use crate::error::{Error, Result};
use crate::parser::parse_candidate;
use crate::types::{
    ConfidenceLevel, ControlStats, DebugInfo, GameMode, GameVersion, HardpointStats, MatchStatus,
    ModeStats, PlayerScoreboardData, ScoreboardAnalysisResult, ScoreboardMetadata,
    ScoreboardType, ScreenshotQuality, SearchAndDestroyStats, StatTime, TeamScoreboardData,
};
use coerce::{coerce_count, coerce_time, Coerced};
use confidence::{aggregate, PlayerAssessment};
use mode::resolve_mode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Display;

/// 必須の数値フィールド
const REQUIRED_STATS: [&str; 3] = ["kills", "deaths", "assists"];

/// 結果に含めるチーム数の上限
const MAX_TEAMS: usize = 2;

/// 正規化オプション（救済の閾値）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    /// 必須項目のうち読めない割合がこれを超えた選手は破棄
    pub max_unrecoverable_ratio: f64,
    /// モードを推定できない場合のモード
    pub default_mode: GameMode,
    /// OCRの取り違え文字（O→0 など）を補正するか
    pub ocr_substitutions: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            max_unrecoverable_ratio: 0.5, // 過半数で破棄
            default_mode: GameMode::Hardpoint,
            ocr_substitutions: true,
        }
    }
}

/// camelCase のキーを snake_case に変換
fn snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// キーの表記揺れ（camelCase / snake_case / 小文字）を許容して値を取得
///
/// null は「値なし」として扱う
pub(crate) fn lookup<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| {
        obj.get(*key)
            .or_else(|| obj.get(&snake_case(key)))
            .or_else(|| obj.get(&key.to_lowercase()))
            .filter(|v| !v.is_null())
    })
}

/// 文字列フィールド（空文字は値なし、数値は文字列化）
fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    match lookup(obj, keys)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// 文字列の配列（単一文字列も許容）
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

/// metadata オブジェクト優先、なければトップレベルから取得
fn meta_lookup<'a>(
    meta: Option<&'a Map<String, Value>>,
    candidate: &'a Map<String, Value>,
    keys: &[&str],
) -> Option<&'a Value> {
    meta.and_then(|m| lookup(m, keys))
        .or_else(|| lookup(candidate, keys))
}

/// チームの下書き（勝敗判定前）
struct TeamDraft {
    team: TeamScoreboardData,
    claimed_winner: Option<bool>,
}

/// 正規化中の状態（1リクエスト内でのみ使う）
struct Salvage<'a> {
    mode: GameMode,
    mode_ambiguous: bool,
    options: &'a NormalizeOptions,
    debug: DebugInfo,
    dropped_players: usize,
    dropped_teams: usize,
}

impl Salvage<'_> {
    fn record<T: Display>(&mut self, who: &str, field: &str, coerced: &Coerced<T>, required: bool) {
        match coerced {
            Coerced::Exact(_) => {}
            Coerced::Corrected(value, raw) => self
                .debug
                .add_ocr_correction(format!("{} {}: read '{}' as {}", who, field, raw, value)),
            Coerced::Missing if required => self
                .debug
                .add_difficult_area(format!("{} {}: missing", who, field)),
            Coerced::Missing => {}
            Coerced::Invalid(raw) => self
                .debug
                .add_difficult_area(format!("{} {}: unreadable value '{}'", who, field, raw)),
        }
    }

    fn optional_count(
        &mut self,
        who: &str,
        field: &str,
        obj: &Map<String, Value>,
        assessment: &mut PlayerAssessment,
    ) -> Option<u32> {
        let coerced = coerce_count(lookup(obj, &[field]), self.options.ocr_substitutions);
        self.record(who, field, &coerced, false);
        if matches!(coerced, Coerced::Corrected(..)) {
            assessment.corrected = true;
        }
        coerced.value()
    }

    fn optional_time(
        &mut self,
        who: &str,
        field: &str,
        obj: &Map<String, Value>,
        assessment: &mut PlayerAssessment,
    ) -> Option<StatTime> {
        let coerced = coerce_time(lookup(obj, &[field]), self.options.ocr_substitutions);
        self.record(who, field, &coerced, false);
        if matches!(coerced, Coerced::Corrected(..)) {
            assessment.corrected = true;
        }
        coerced.value()
    }

    /// 解決済みモードのスタッツだけを読む（他モードのキーは読まずに捨てる）
    fn mode_stats(
        &mut self,
        who: &str,
        obj: &Map<String, Value>,
        assessment: &mut PlayerAssessment,
    ) -> ModeStats {
        match self.mode {
            GameMode::Hardpoint => ModeStats::Hardpoint(HardpointStats {
                hill_time: self.optional_time(who, "hillTime", obj, assessment),
                objective_kills: self.optional_count(who, "objectiveKills", obj, assessment),
                contested_hill_time: self.optional_time(who, "contestedHillTime", obj, assessment),
            }),
            GameMode::SearchAndDestroy => ModeStats::SearchAndDestroy(SearchAndDestroyStats {
                defuses: self.optional_count(who, "defuses", obj, assessment),
                plants: self.optional_count(who, "plants", obj, assessment),
            }),
            GameMode::Control => ModeStats::Control(ControlStats {
                captures: self.optional_count(who, "captures", obj, assessment),
                zone_time: self.optional_time(who, "zoneTime", obj, assessment),
            }),
        }
    }

    fn player(&mut self, team: &str, index: usize, raw: &Value) -> Option<PlayerScoreboardData> {
        let Some(obj) = raw.as_object() else {
            self.debug.add_ocr_correction(format!(
                "dropped unreadable player entry #{} on {}",
                index + 1,
                team
            ));
            self.dropped_players += 1;
            return None;
        };

        let mut assessment = PlayerAssessment {
            claimed: lookup(obj, &["confidence"])
                .and_then(Value::as_str)
                .and_then(ConfidenceLevel::parse_lenient),
            mode_ambiguous: self.mode_ambiguous,
            ..Default::default()
        };

        let name = match text_field(obj, &["name", "playerName", "gamertag", "player"]) {
            Some(name) => name,
            None => {
                let placeholder = format!("Player {}", index + 1);
                self.debug.add_difficult_area(format!(
                    "player #{} on {}: name unreadable, using '{}'",
                    index + 1,
                    team,
                    placeholder
                ));
                assessment.missing_name = true;
                placeholder
            }
        };
        let who = format!("'{}' ({})", name, team);

        let mut required = [0u32; REQUIRED_STATS.len()];
        for (slot, field) in REQUIRED_STATS.iter().enumerate() {
            let coerced = coerce_count(lookup(obj, &[*field]), self.options.ocr_substitutions);
            self.record(&who, field, &coerced, true);
            if coerced.is_unrecoverable() {
                assessment.unrecoverable += 1;
            }
            if matches!(coerced, Coerced::Corrected(..)) {
                assessment.corrected = true;
            }
            required[slot] = coerced.value().unwrap_or(0);
        }

        let unreadable_ratio = assessment.unrecoverable as f64 / REQUIRED_STATS.len() as f64;
        if unreadable_ratio > self.options.max_unrecoverable_ratio {
            self.debug.add_ocr_correction(format!(
                "dropped player {}: {} of {} required stats unreadable",
                who,
                assessment.unrecoverable,
                REQUIRED_STATS.len()
            ));
            self.dropped_players += 1;
            return None;
        }

        let [kills, deaths, assists] = required;
        let damage = self.optional_count(&who, "damage", obj, &mut assessment);
        let mode_stats = self.mode_stats(&who, obj, &mut assessment);

        // AI申告のK/D比は使わない
        let ratio = PlayerScoreboardData::compute_ratio(kills, deaths);
        if let Some(reported) = lookup(obj, &["ratio", "kd", "kdRatio"]).and_then(Value::as_f64) {
            if (reported - ratio).abs() > 0.005 {
                self.debug.add_suggestion(format!(
                    "{} reported ratio {} replaced by {:.2}",
                    who, reported, ratio
                ));
            }
        }

        Some(PlayerScoreboardData {
            name,
            kills,
            deaths,
            assists,
            damage,
            mode_stats,
            ratio,
            confidence: assessment.level(),
        })
    }

    fn team(&mut self, index: usize, raw: &Value) -> Option<TeamDraft> {
        let Some(obj) = raw.as_object() else {
            self.debug
                .add_difficult_area(format!("team #{} is not a readable object", index + 1));
            self.dropped_teams += 1;
            return None;
        };

        let team_name = text_field(obj, &["teamName", "name", "team"]).unwrap_or_else(|| {
            let placeholder = format!("Team {}", index + 1);
            self.debug.add_difficult_area(format!(
                "team #{} name unreadable, using '{}'",
                index + 1,
                placeholder
            ));
            placeholder
        });
        let visible = lookup(obj, &["visible"]).and_then(Value::as_bool);

        let mut players = Vec::new();
        match lookup(obj, &["players"]).and_then(Value::as_array) {
            Some(list) => {
                for (i, raw_player) in list.iter().enumerate() {
                    if let Some(player) = self.player(&team_name, i, raw_player) {
                        players.push(player);
                    }
                }
            }
            None => self
                .debug
                .add_difficult_area(format!("{}: no readable player list", team_name)),
        }

        if players.is_empty() {
            let reason = if visible == Some(false) {
                "hidden in capture"
            } else {
                "no salvageable players"
            };
            self.debug
                .add_difficult_area(format!("{}: {}, team omitted", team_name, reason));
            self.dropped_teams += 1;
            return None;
        }

        let score = match coerce_count(lookup(obj, &["score"]), self.options.ocr_substitutions) {
            Coerced::Exact(v) => v,
            Coerced::Corrected(v, raw) => {
                self.debug
                    .add_ocr_correction(format!("{} score: read '{}' as {}", team_name, raw, v));
                v
            }
            Coerced::Missing => {
                self.debug
                    .add_difficult_area(format!("{} score: missing, using 0", team_name));
                0
            }
            Coerced::Invalid(raw) => {
                self.debug.add_difficult_area(format!(
                    "{} score: unreadable value '{}', using 0",
                    team_name, raw
                ));
                0
            }
        };

        let confidence = aggregate(players.iter().map(|p| p.confidence));
        let claimed_winner = lookup(obj, &["winner"]).and_then(Value::as_bool);

        Some(TeamDraft {
            team: TeamScoreboardData {
                team_name,
                score,
                winner: None,
                visible,
                confidence,
                players,
            },
            claimed_winner,
        })
    }

    fn game_version(
        &mut self,
        candidate: &Map<String, Value>,
        hint: Option<GameVersion>,
    ) -> Option<GameVersion> {
        let Some(raw) = text_field(candidate, &["gameVersion", "game"]) else {
            return hint;
        };

        match GameVersion::parse_lenient(&raw) {
            Some(version) => {
                if let Some(hinted) = hint.filter(|h| *h != version) {
                    self.debug.add_suggestion(format!(
                        "screenshot reports {} but {} was requested; kept {}",
                        version, hinted, version
                    ));
                }
                Some(version)
            }
            None => {
                self.debug
                    .add_suggestion(format!("game version '{}' not recognized", raw));
                hint
            }
        }
    }

    /// 勝敗の判定（2チーム・試合終了・スコア差ありの場合のみ）
    fn assign_winners(&mut self, drafts: &mut [TeamDraft], status: MatchStatus) {
        let decided = status == MatchStatus::Completed
            && drafts.len() == 2
            && drafts[0].team.score != drafts[1].team.score;

        let top = drafts.iter().map(|d| d.team.score).max().unwrap_or(0);

        for draft in drafts.iter_mut() {
            let computed = decided.then_some(draft.team.score == top);
            if draft.claimed_winner == Some(true) && computed != Some(true) {
                let reason = if !decided {
                    "no decided result"
                } else {
                    "lower score"
                };
                self.debug.add_suggestion(format!(
                    "{} winner flag ignored: {}",
                    draft.team.team_name, reason
                ));
            }
            draft.team.winner = computed;
        }
    }
}

/// 候補オブジェクトを正規化
///
/// # Arguments
/// * `candidate` - parse_candidate の出力
/// * `version_hint` - 呼び出し側が指定したタイトル
/// * `options` - 救済の閾値
///
/// # Returns
/// * `Ok(ScoreboardAnalysisResult)` - 1人以上救済できた（partial の場合あり）
/// * `Err(Error::EmptyExtraction)` - 救済できる選手が0人
pub fn normalize_candidate(
    candidate: &Map<String, Value>,
    version_hint: Option<GameVersion>,
    options: &NormalizeOptions,
) -> Result<ScoreboardAnalysisResult> {
    let meta = lookup(candidate, &["metadata"]).and_then(Value::as_object);
    let meta_value = |keys: &[&str]| meta_lookup(meta, candidate, keys);

    // 既存のデバッグ情報を引き継ぐ（再正規化で同じ結果になるように）
    let mut debug = DebugInfo::default();
    if let Some(raw_debug) = meta_value(&["debug"]).and_then(Value::as_object) {
        for note in string_list(lookup(raw_debug, &["difficultAreas"])) {
            debug.add_difficult_area(note);
        }
        for note in string_list(lookup(raw_debug, &["suggestions"])) {
            debug.add_suggestion(note);
        }
        for note in string_list(lookup(raw_debug, &["ocrCorrections"])) {
            debug.add_ocr_correction(note);
        }
    }

    // 1. モード解決
    let resolution = resolve_mode(candidate, options.default_mode);
    if let Some(note) = &resolution.ambiguity {
        debug.add_suggestion(note.clone());
    }

    let mut salvage = Salvage {
        mode: resolution.mode,
        mode_ambiguous: resolution.is_ambiguous(),
        options,
        debug,
        dropped_players: 0,
        dropped_teams: 0,
    };

    let game_version = salvage.game_version(candidate, version_hint);
    let map = text_field(candidate, &["map", "mapName"]).unwrap_or_else(|| {
        salvage.debug.add_difficult_area("map name unreadable");
        "Unknown".to_string()
    });

    // 2〜4. チーム・選手の救済
    let raw_teams: &[Value] = match lookup(candidate, &["teams"]).and_then(Value::as_array) {
        Some(list) => list,
        None => {
            salvage.debug.add_difficult_area("no readable team list");
            &[]
        }
    };

    let mut drafts: Vec<TeamDraft> = raw_teams
        .iter()
        .enumerate()
        .filter_map(|(i, raw)| salvage.team(i, raw))
        .collect();

    if drafts.len() > MAX_TEAMS {
        salvage.debug.add_suggestion(format!(
            "{} teams reported; kept the first {}",
            drafts.len(),
            MAX_TEAMS
        ));
        salvage.dropped_teams += drafts.len() - MAX_TEAMS;
        drafts.truncate(MAX_TEAMS);
    }

    if drafts.is_empty() {
        return Err(Error::EmptyExtraction(format!(
            "no salvageable players ({} player entries and {} teams dropped)",
            salvage.dropped_players, salvage.dropped_teams
        )));
    }

    // 7. 試合状態（勝敗判定に必要なので先に読む）
    let explicit_type = meta_value(&["scoreboardType"])
        .and_then(Value::as_str)
        .and_then(ScoreboardType::parse_lenient);
    let explicit_status = meta_value(&["matchStatus", "status"])
        .and_then(Value::as_str)
        .and_then(MatchStatus::parse_lenient);

    let scoreboard_type = explicit_type.unwrap_or(match explicit_status {
        Some(MatchStatus::Completed) => ScoreboardType::EndOfMatch,
        _ => ScoreboardType::MidGame,
    });
    let match_status = explicit_status.unwrap_or(match scoreboard_type {
        ScoreboardType::EndOfMatch => MatchStatus::Completed,
        ScoreboardType::MidGame => MatchStatus::InProgress,
    });
    if explicit_type == Some(ScoreboardType::MidGame) && explicit_status == Some(MatchStatus::Completed) {
        salvage
            .debug
            .add_suggestion("mid-game scoreboard reported as completed; kept both values");
    }

    // 5. 勝敗
    salvage.assign_winners(&mut drafts, match_status);
    let teams: Vec<TeamScoreboardData> = drafts.into_iter().map(|d| d.team).collect();

    // 6. 信頼度の集約
    let confidence = aggregate(teams.iter().map(|t| t.confidence));

    // 7. partial / 品質
    let quality = meta_value(&["quality", "screenshotQuality"])
        .and_then(Value::as_str)
        .and_then(ScreenshotQuality::parse_lenient)
        .unwrap_or_default();
    let claimed_partial = meta_value(&["partial"]).and_then(Value::as_bool) == Some(true);
    let visible_teams = teams.iter().filter(|t| t.visible != Some(false)).count();
    let partial = claimed_partial
        || quality == ScreenshotQuality::Poor
        || visible_teams < MAX_TEAMS
        || salvage.dropped_players > 0
        || salvage.dropped_teams > 0;

    let notes = match meta_value(&["notes"]) {
        Some(Value::Array(_)) => {
            let joined = string_list(meta_value(&["notes"])).join("; ");
            (!joined.is_empty()).then_some(joined)
        }
        _ => meta.and_then(|m| text_field(m, &["notes"])),
    };

    let metadata = ScoreboardMetadata {
        quality,
        match_status,
        scoreboard_type,
        season: meta.and_then(|m| text_field(m, &["season"])),
        event: meta.and_then(|m| text_field(m, &["event"])),
        map_variant: meta.and_then(|m| text_field(m, &["mapVariant"])),
        partial,
        notes,
        debug: salvage.debug,
    };

    Ok(ScoreboardAnalysisResult {
        game_version,
        mode: resolution.mode,
        map,
        confidence,
        teams,
        metadata,
    })
}

/// レスポンス文字列をパースして正規化
pub fn normalize_response(
    response: &str,
    version_hint: Option<GameVersion>,
    options: &NormalizeOptions,
) -> Result<ScoreboardAnalysisResult> {
    let candidate = parse_candidate(response)?;
    normalize_candidate(&candidate, version_hint, options)
}

/// 正規化済みの結果を再度正規化（保存済み結果の検証用）
pub fn renormalize(
    result: &ScoreboardAnalysisResult,
    options: &NormalizeOptions,
) -> Result<ScoreboardAnalysisResult> {
    let value = serde_json::to_value(result)?;
    let candidate = value
        .as_object()
        .ok_or_else(|| Error::Parse("結果がJSONオブジェクトではありません".into()))?;
    normalize_candidate(candidate, result.game_version, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize(value: Value) -> Result<ScoreboardAnalysisResult> {
        let candidate = value.as_object().cloned().unwrap();
        normalize_candidate(&candidate, None, &NormalizeOptions::default())
    }

    fn player(name: &str, kills: u32, deaths: u32, assists: u32) -> Value {
        json!({"name": name, "kills": kills, "deaths": deaths, "assists": assists})
    }

    // =============================================
    // 代表シナリオ
    // =============================================

    #[test]
    fn test_single_team_hardpoint_scenario() {
        let response = r#"{"mode":"Hardpoint","map":"Skidrow","teams":[{"teamName":"Alpha","score":250,"players":[{"name":"Ace","kills":20,"deaths":15,"assists":3,"hillTime":"3:12"}]}]}"#;
        let result = normalize_response(response, None, &NormalizeOptions::default()).unwrap();

        let ace = &result.teams[0].players[0];
        assert_eq!(ace.ratio, 1.33);
        assert_eq!(ace.confidence, ConfidenceLevel::High);
        assert_eq!(result.confidence, ConfidenceLevel::High);
        assert!(result.metadata.partial);
        assert_eq!(result.map, "Skidrow");
        match &ace.mode_stats {
            ModeStats::Hardpoint(stats) => assert_eq!(stats.hill_time, Some(StatTime(192))),
            other => panic!("unexpected stats: {:?}", other),
        }
    }

    #[test]
    fn test_unrecognized_mode_scenario() {
        let result = normalize(json!({
            "mode": "Deathmatch",
            "map": "Rio",
            "teams": [
                {"teamName": "A", "score": 10, "players": [player("a1", 5, 5, 1)]},
                {"teamName": "B", "score": 8, "players": [player("b1", 4, 6, 0)]}
            ]
        }))
        .unwrap();

        assert_eq!(result.mode, GameMode::Hardpoint);
        assert_eq!(result.confidence, ConfidenceLevel::Medium);
        assert!(result
            .metadata
            .debug
            .suggestions
            .iter()
            .any(|s| s.contains("Deathmatch")));
    }

    #[test]
    fn test_ratio_is_recomputed() {
        let result = normalize(json!({
            "mode": "Control",
            "teams": [{"teamName": "A", "players": [
                {"name": "z", "kills": 10, "deaths": 0, "assists": 0, "ratio": 99.9}
            ]}]
        }))
        .unwrap();

        assert_eq!(result.teams[0].players[0].ratio, 10.0);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["teams"][0]["players"][0]["ratio"], 10.0);
    }

    #[test]
    fn test_team_confidence_is_minimum() {
        let mut p1 = player("h", 1, 1, 1);
        p1["confidence"] = json!("high");
        let mut p2 = player("m", 1, 1, 1);
        p2["confidence"] = json!("medium");
        let mut p3 = player("l", 1, 1, 1);
        p3["confidence"] = json!("low");

        let result = normalize(json!({
            "mode": "Hardpoint",
            "teams": [{"teamName": "A", "score": 1, "players": [p1, p2, p3]}]
        }))
        .unwrap();

        assert_eq!(result.teams[0].confidence, ConfidenceLevel::Low);
        assert_eq!(result.confidence, ConfidenceLevel::Low);
    }

    #[test]
    fn test_garbage_team_gives_partial_single_team() {
        let result = normalize(json!({
            "mode": "Search & Destroy",
            "teams": [
                {"teamName": "A", "score": 6, "players": [player("a1", 9, 3, 2)]},
                "%%% unreadable %%%"
            ],
            "metadata": {"quality": "good", "matchStatus": "completed"}
        }))
        .unwrap();

        assert_eq!(result.teams.len(), 1);
        assert!(result.metadata.partial);
        assert_eq!(result.teams[0].winner, None);
    }

    #[test]
    fn test_zero_players_is_error() {
        let result = normalize(json!({
            "mode": "Hardpoint",
            "teams": [{"teamName": "A", "players": [
                {"name": "x", "kills": "??", "deaths": "abc"},
                "garbage"
            ]}]
        }));
        assert!(matches!(result, Err(Error::EmptyExtraction(_))));

        assert!(matches!(normalize(json!({"mode": "Control"})), Err(Error::EmptyExtraction(_))));
    }

    // =============================================
    // フィールド適用・数値変換
    // =============================================

    #[test]
    fn test_inapplicable_fields_are_dropped() {
        let result = normalize(json!({
            "mode": "Hardpoint",
            "teams": [{"teamName": "A", "players": [{
                "name": "p", "kills": 3, "deaths": 2, "assists": 1,
                "hillTime": "1:05", "captures": 4, "zoneTime": "0:50", "plants": 2, "defuses": 1
            }]}]
        }))
        .unwrap();

        let json = serde_json::to_value(&result.teams[0].players[0]).unwrap();
        assert_eq!(json["hillTime"], "1:05");
        for key in ["captures", "zoneTime", "plants", "defuses"] {
            assert!(json.get(key).is_none(), "{} should be absent", key);
        }
    }

    #[test]
    fn test_control_player_has_no_hardpoint_fields() {
        let result = normalize(json!({
            "mode": "Control",
            "teams": [{"teamName": "A", "players": [{
                "name": "p", "kills": 3, "deaths": 2, "assists": 1,
                "captures": 2, "hillTime": "2:00", "objectiveKills": 5
            }]}]
        }))
        .unwrap();

        let json = serde_json::to_value(&result.teams[0].players[0]).unwrap();
        assert_eq!(json["captures"], 2);
        assert!(json.get("hillTime").is_none());
        assert!(json.get("objectiveKills").is_none());
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let result = normalize(json!({
            "mode": "Hardpoint",
            "teams": [{"teamName": "A", "score": "150", "players": [
                {"name": "p", "kills": "12", "deaths": "4", "assists": "2", "damage": "2,450"}
            ]}]
        }))
        .unwrap();

        let p = &result.teams[0].players[0];
        assert_eq!((p.kills, p.deaths, p.assists), (12, 4, 2));
        assert_eq!(p.damage, Some(2450));
        assert_eq!(p.ratio, 3.0);
        assert_eq!(p.confidence, ConfidenceLevel::High);
        assert_eq!(result.teams[0].score, 150);
    }

    #[test]
    fn test_one_unreadable_required_field_forces_low() {
        let result = normalize(json!({
            "mode": "Hardpoint",
            "teams": [{"teamName": "A", "players": [
                {"name": "p", "kills": 7, "deaths": "?x?", "assists": 1}
            ]}]
        }))
        .unwrap();

        let p = &result.teams[0].players[0];
        assert_eq!(p.confidence, ConfidenceLevel::Low);
        assert_eq!(p.deaths, 0);
        assert_eq!(p.ratio, 7.0);
        assert!(result
            .metadata
            .debug
            .difficult_areas
            .iter()
            .any(|d| d.contains("deaths")));
    }

    #[test]
    fn test_majority_unreadable_player_is_dropped() {
        let result = normalize(json!({
            "mode": "Hardpoint",
            "teams": [{"teamName": "A", "players": [
                player("keep", 5, 5, 5),
                {"name": "lost", "kills": 3}
            ]}]
        }))
        .unwrap();

        assert_eq!(result.teams[0].players.len(), 1);
        assert!(result.metadata.partial);
        assert!(result
            .metadata
            .debug
            .ocr_corrections
            .iter()
            .any(|n| n.contains("dropped player 'lost'")));
    }

    #[test]
    fn test_ocr_correction_caps_medium() {
        let result = normalize(json!({
            "mode": "Hardpoint",
            "teams": [{"teamName": "A", "players": [
                {"name": "p", "kills": "1O", "deaths": 5, "assists": 0}
            ]}]
        }))
        .unwrap();

        let p = &result.teams[0].players[0];
        assert_eq!(p.kills, 10);
        assert_eq!(p.confidence, ConfidenceLevel::Medium);
        assert_eq!(result.metadata.debug.ocr_corrections.len(), 1);
    }

    #[test]
    fn test_threshold_is_configurable() {
        let candidate = json!({
            "mode": "Hardpoint",
            "teams": [{"teamName": "A", "players": [
                player("keep", 5, 5, 5),
                {"name": "strict", "kills": 3, "deaths": 1}
            ]}]
        });
        let options = NormalizeOptions {
            max_unrecoverable_ratio: 0.0,
            ..Default::default()
        };
        let result =
            normalize_candidate(candidate.as_object().unwrap(), None, &options).unwrap();
        assert_eq!(result.teams[0].players.len(), 1);
    }

    // =============================================
    // 勝敗・メタデータ
    // =============================================

    #[test]
    fn test_winner_requires_completed_and_different_scores() {
        let two_teams = |a: u32, b: u32, status: &str| {
            json!({
                "mode": "Control",
                "teams": [
                    {"teamName": "A", "score": a, "winner": true, "players": [player("a", 1, 1, 1)]},
                    {"teamName": "B", "score": b, "winner": true, "players": [player("b", 1, 1, 1)]}
                ],
                "metadata": {"matchStatus": status}
            })
        };

        let decided = normalize(two_teams(3, 1, "completed")).unwrap();
        assert_eq!(decided.teams[0].winner, Some(true));
        assert_eq!(decided.teams[1].winner, Some(false));
        assert_eq!(decided.metadata.scoreboard_type, ScoreboardType::EndOfMatch);

        let tied = normalize(two_teams(2, 2, "completed")).unwrap();
        assert_eq!(tied.teams[0].winner, None);
        assert_eq!(tied.teams[1].winner, None);

        let live = normalize(two_teams(3, 1, "in-progress")).unwrap();
        assert_eq!(live.teams[0].winner, None);
        assert_eq!(live.metadata.scoreboard_type, ScoreboardType::MidGame);
    }

    #[test]
    fn test_scoreboard_type_defaults_to_mid_game() {
        let result = normalize(json!({
            "mode": "Hardpoint",
            "teams": [
                {"teamName": "A", "score": 250, "players": [player("a", 1, 1, 1)]},
                {"teamName": "B", "score": 200, "players": [player("b", 1, 1, 1)]}
            ]
        }))
        .unwrap();

        assert_eq!(result.metadata.scoreboard_type, ScoreboardType::MidGame);
        assert_eq!(result.metadata.match_status, MatchStatus::InProgress);
        assert!(!result.metadata.partial);
        assert_eq!(result.teams[0].winner, None);
    }

    #[test]
    fn test_poor_quality_sets_partial() {
        let result = normalize(json!({
            "mode": "Hardpoint",
            "teams": [
                {"teamName": "A", "score": 1, "players": [player("a", 1, 1, 1)]},
                {"teamName": "B", "score": 2, "players": [player("b", 1, 1, 1)]}
            ],
            "metadata": {"quality": "poor", "season": "Season 3", "notes": ["glare", "cropped"]}
        }))
        .unwrap();

        assert!(result.metadata.partial);
        assert_eq!(result.metadata.quality, ScreenshotQuality::Poor);
        assert_eq!(result.metadata.season.as_deref(), Some("Season 3"));
        assert_eq!(result.metadata.notes.as_deref(), Some("glare; cropped"));
    }

    #[test]
    fn test_hidden_team_sets_partial() {
        let result = normalize(json!({
            "mode": "Control",
            "teams": [
                {"teamName": "A", "score": 2, "visible": true, "players": [player("a", 3, 1, 1)]},
                {"teamName": "B", "score": 1, "visible": false, "players": [player("b", 1, 3, 0)]}
            ],
            "metadata": {"quality": "good"}
        }))
        .unwrap();

        assert_eq!(result.teams.len(), 2);
        assert_eq!(result.teams[1].visible, Some(false));
        assert!(result.metadata.partial);
    }

    #[test]
    fn test_bare_single_team_array_is_salvaged() {
        let response = r#"[{"teamName":"Alpha","score":3,"players":[{"name":"a","kills":1,"deaths":1,"assists":1}]}]"#;
        let result = normalize_response(response, None, &NormalizeOptions::default()).unwrap();

        assert_eq!(result.teams.len(), 1);
        assert_eq!(result.teams[0].team_name, "Alpha");
        assert_eq!(result.teams[0].players[0].name, "a");
        assert!(result.metadata.partial);
    }

    #[test]
    fn test_more_than_two_teams_are_truncated() {
        let result = normalize(json!({
            "mode": "Hardpoint",
            "teams": [
                {"teamName": "A", "players": [player("a", 1, 1, 1)]},
                {"teamName": "B", "players": [player("b", 1, 1, 1)]},
                {"teamName": "C", "players": [player("c", 1, 1, 1)]}
            ]
        }))
        .unwrap();

        assert_eq!(result.teams.len(), 2);
        assert!(result.metadata.partial);
    }

    #[test]
    fn test_game_version_hint() {
        let candidate = json!({
            "mode": "Hardpoint",
            "teams": [{"teamName": "A", "players": [player("a", 1, 1, 1)]}]
        });
        let result = normalize_candidate(
            candidate.as_object().unwrap(),
            Some(GameVersion::BlackOps6),
            &NormalizeOptions::default(),
        )
        .unwrap();
        assert_eq!(result.game_version, Some(GameVersion::BlackOps6));

        let reported = json!({
            "gameVersion": "MW3",
            "mode": "Hardpoint",
            "teams": [{"teamName": "A", "players": [player("a", 1, 1, 1)]}]
        });
        let result = normalize_candidate(
            reported.as_object().unwrap(),
            Some(GameVersion::BlackOps6),
            &NormalizeOptions::default(),
        )
        .unwrap();
        assert_eq!(result.game_version, Some(GameVersion::ModernWarfare3));
        assert_eq!(result.metadata.debug.suggestions.len(), 1);
    }

    #[test]
    fn test_snake_case_keys_are_accepted() {
        let result = normalize(json!({
            "mode": "Hardpoint",
            "map_name": "Vista",
            "teams": [{"team_name": "A", "players": [
                {"name": "p", "kills": 2, "deaths": 1, "assists": 0, "hill_time": "0:40"}
            ]}]
        }))
        .unwrap();

        assert_eq!(result.map, "Vista");
        assert_eq!(result.teams[0].team_name, "A");
    }

    // =============================================
    // 冪等性
    // =============================================

    #[test]
    fn test_renormalize_is_idempotent() {
        let messy = json!({
            "mode": "Domination",
            "teams": [
                {"teamName": "A", "score": "25O", "winner": true, "players": [
                    {"name": "a", "kills": "l2", "deaths": 3, "assists": 1, "captures": 2, "ratio": 7},
                    {"kills": 4, "deaths": 4, "assists": 4},
                    {"name": "gone", "kills": "?"}
                ]},
                {"teamName": "B", "score": 180, "visible": true, "players": [
                    {"name": "b", "kills": 5, "deaths": "x", "assists": 2, "zoneTime": 95}
                ]},
                "garbage"
            ],
            "metadata": {"quality": "medium", "scoreboardType": "end-of-match"}
        });

        let first = normalize(messy).unwrap();
        let second = renormalize(&first, &NormalizeOptions::default()).unwrap();
        assert_eq!(first, second);

        let third = renormalize(&second, &NormalizeOptions::default()).unwrap();
        assert_eq!(second, third);
    }
}
