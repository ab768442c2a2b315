//! プロンプト生成モジュール
//!
//! Vision APIへ送るスコアボード抽出プロンプトを生成する。
//! 出力形式はワイヤ契約（types.rs）と同じキー名を指示する。

use crate::types::{GameMode, GameVersion};

/// 対応モード一覧（プロンプト埋め込み用）
pub fn supported_modes() -> String {
    GameMode::ALL
        .iter()
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// スコアボード抽出プロンプト生成
///
/// # Arguments
/// * `version_hint` - 呼び出し側が把握しているタイトル（任意）
///
/// # Returns
/// 画像1枚に対する抽出プロンプト文字列
pub fn build_scoreboard_prompt(version_hint: Option<GameVersion>) -> String {
    let modes = supported_modes();

    let version_line = version_hint
        .map(|v| format!("\nThe screenshot is from Call of Duty: {v}. Use \"{v}\" as gameVersion unless the image clearly shows otherwise."))
        .unwrap_or_default();

    format!(
        r#"You are reading a Call of Duty scoreboard screenshot. Extract every visible statistic.{version_line}

## Game modes
Choose exactly one of: {modes}

## Mode-specific player fields (include ONLY the ones for the chosen mode)
- Hardpoint: "hillTime" ("m:ss"), "objectiveKills", "contestedHillTime" ("m:ss")
- Search & Destroy: "defuses", "plants"
- Control: "captures", "zoneTime" ("m:ss")

## Output format (strictly this JSON object)
{{
  "gameVersion": "title if visible",
  "mode": "one of the game modes",
  "map": "map name",
  "teams": [
    {{
      "teamName": "team name",
      "score": 0,
      "visible": true,
      "players": [
        {{
          "name": "gamertag",
          "kills": 0,
          "deaths": 0,
          "assists": 0,
          "damage": 0,
          "confidence": "high | medium | low"
        }}
      ]
    }}
  ],
  "metadata": {{
    "quality": "good | medium | poor",
    "matchStatus": "completed | in-progress",
    "scoreboardType": "end-of-match | mid-game",
    "season": "season if shown",
    "event": "event or playlist if shown",
    "notes": "anything unusual",
    "debug": {{
      "difficultAreas": ["regions that were hard to read"],
      "suggestions": [],
      "ocrCorrections": []
    }}
  }}
}}

## Rules
- Copy numbers exactly as shown; never estimate or compute values
- Do not output K/D ratios; they are computed downstream
- If only one team is visible, output that team only and set "visible": true on it
- Use "end-of-match" only when the screen shows a final result (VICTORY / DEFEAT / final score)
- Mark a player "low" confidence when any of their numbers is hard to read
- Output the JSON object only. No explanations"#
    )
}
