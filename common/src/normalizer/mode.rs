//! ゲームモードの解決
//!
//! 申告されたモード名を解釈し、解釈できない場合は
//! 選手スタッツのキーから推定する（推定もできなければ既定モード）。

use super::lookup;
use crate::types::GameMode;
use serde_json::{Map, Value};

/// モード解決結果
#[derive(Debug, Clone, PartialEq)]
pub struct ModeResolution {
    pub mode: GameMode,
    /// 推定で決めた場合の説明（suggestions に記録する）
    pub ambiguity: Option<String>,
}

impl ModeResolution {
    pub fn is_ambiguous(&self) -> bool {
        self.ambiguity.is_some()
    }
}

/// 候補オブジェクトからモードを決定
///
/// # Arguments
/// * `candidate` - パース済み候補オブジェクト
/// * `default_mode` - 推定材料がない場合のモード
pub fn resolve_mode(candidate: &Map<String, Value>, default_mode: GameMode) -> ModeResolution {
    let raw = lookup(candidate, &["mode", "gameMode"]);

    if let Some(mode) = raw.and_then(Value::as_str).and_then(GameMode::parse_lenient) {
        return ModeResolution { mode, ambiguity: None };
    }

    let (mode, basis) = match infer_from_stats(candidate) {
        Some(mode) => (mode, "inferred from player stat fields"),
        None => (default_mode, "default mode"),
    };

    let reported = match raw {
        Some(Value::String(s)) => format!("mode '{}' is not supported", s),
        Some(other) => format!("mode {} is not a mode name", other),
        None => "mode not reported".to_string(),
    };

    ModeResolution {
        mode,
        ambiguity: Some(format!("{}; assumed {} ({})", reported, mode, basis)),
    }
}

/// 選手オブジェクトに現れるモード専用キーを数えて最多のモードを返す
fn infer_from_stats(candidate: &Map<String, Value>) -> Option<GameMode> {
    let teams = lookup(candidate, &["teams"]).and_then(Value::as_array)?;

    let players: Vec<&Map<String, Value>> = teams
        .iter()
        .filter_map(|t| lookup(t.as_object()?, &["players"])?.as_array())
        .flatten()
        .filter_map(Value::as_object)
        .collect();

    GameMode::ALL
        .iter()
        .map(|mode| {
            let hits = players
                .iter()
                .map(|p| mode.stat_keys().iter().filter(|k| lookup(p, &[**k]).is_some()).count())
                .sum::<usize>();
            (*mode, hits)
        })
        .filter(|(_, hits)| *hits > 0)
        // 同数なら ALL の並び順で先のモード
        .fold(None, |best: Option<(GameMode, usize)>, (mode, hits)| match best {
            Some((_, best_hits)) if best_hits >= hits => best,
            _ => Some((mode, hits)),
        })
        .map(|(mode, _)| mode)
}
