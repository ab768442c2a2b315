//! APIレスポンスパーサー
//!
//! Vision APIのレスポンス文字列からJSON部分を抽出し、
//! 書式の崩れを修復して候補オブジェクト（型なし）に変換する。
//!
//! スキーマ違反はここでは拒否しない。欠損・不正値の救済は normalizer が担当する。

use crate::error::{Error, Result};
use serde_json::{Map, Value};

/// 文字列リテラルの開始文字に対応する終了文字
fn closing_quotes(open: char) -> &'static [char] {
    match open {
        '"' => &['"'],
        '\'' => &['\''],
        '\u{201C}' => &['\u{201D}', '"'],
        '\u{2018}' => &['\u{2019}', '\''],
        _ => &[],
    }
}

fn is_quote_open(c: char) -> bool {
    matches!(c, '"' | '\'' | '\u{201C}' | '\u{2018}')
}

/// コードフェンス（```json ... ``` / ``` ... ```）の中身を取り出す
///
/// 閉じフェンスがない場合は開始フェンス以降を返す
fn strip_code_fence(response: &str) -> &str {
    let Some(start_marker) = response.find("```") else {
        return response;
    };

    let after = &response[start_marker + 3..];
    // 言語タグ（json など）を読み飛ばす
    let body_start = after
        .find('\n')
        .filter(|&nl| after[..nl].trim().chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|nl| nl + 1)
        .unwrap_or(0);
    let body = &after[body_start..];

    match body.find("```") {
        Some(end) => &body[..end],
        None => body,
    }
}

/// 開始位置から対応する閉じ括弧までの範囲を探す（文字列リテラル内は無視）
///
/// 見つからなければ None（途中で切れたレスポンス）
fn find_balanced_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if closing_quotes(open).contains(&c) {
                quote = None;
            }
            continue;
        }

        match c {
            c if is_quote_open(c) => quote = Some(c),
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(start + offset + c.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}

/// JSONらしき範囲（括弧の開始から対応する閉じ括弧まで）
struct Region<'a> {
    text: &'a str,
    /// 閉じ括弧まで揃っているか
    complete: bool,
}

/// 本文中の括弧範囲を先頭から順に列挙する
///
/// 閉じていない範囲（途中切れ）で列挙を終える
fn json_regions(body: &str) -> Vec<Region<'_>> {
    let mut regions = Vec::new();
    let mut from = 0;

    while let Some(offset) = body[from..].find(['{', '[']) {
        let start = from + offset;
        match find_balanced_end(body, start) {
            Some(end) => {
                regions.push(Region {
                    text: body[start..end].trim(),
                    complete: true,
                });
                from = end;
            }
            None => {
                regions.push(Region {
                    text: body[start..].trim(),
                    complete: false,
                });
                break;
            }
        }
    }

    regions
}

/// APIレスポンスからJSON部分を抽出
///
/// 抽出手順:
/// 1. コードフェンスがあればその中身に限定
/// 2. `{` または `[` から対応する閉じ括弧までの範囲を先頭から順に調べ、
///    そのまま（または修復して）読める最初の範囲を返す
/// 3. 読める範囲がなければ最初の範囲（途中切れは parse_candidate で修復）
///
/// # Arguments
/// * `response` - APIレスポンス文字列
///
/// # Returns
/// * `Ok(&str)` - 抽出されたJSON文字列
/// * `Err` - JSONらしき構造が見つからない場合
///
/// # Examples
/// ```
/// use scoreboard_ai_common::extract_json;
///
/// let response = "Here you go: {\"mode\": \"Control\"} Good luck!";
/// let json = extract_json(response).unwrap();
/// assert_eq!(json, "{\"mode\": \"Control\"}");
///
/// let noisy = "Mode [Hardpoint] detected: {\"mode\": \"Hardpoint\"}";
/// assert_eq!(extract_json(noisy).unwrap(), "{\"mode\": \"Hardpoint\"}");
/// ```
pub fn extract_json(response: &str) -> Result<&str> {
    let regions = json_regions(strip_code_fence(response));

    regions
        .iter()
        .find(|r| parse_region(r.text).is_ok())
        .or_else(|| regions.iter().find(|r| !r.complete))
        .or_else(|| regions.first())
        .map(|r| r.text)
        .ok_or_else(|| Error::Parse("JSONが見つかりません".into()))
}

/// 緩い書式のJSONを厳密なJSONに修復
///
/// - 全角引用符（“ ” ‘ ’）→ ASCII
/// - シングルクォート文字列 → ダブルクォート
/// - 末尾カンマの除去
/// - Pythonリテラル（True/False/None）→ JSON
/// - `//` 行コメントの除去
/// - 文字列内の生改行 → `\n`
pub fn repair_json(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if is_quote_open(c) {
            i = copy_string_literal(&chars, i, &mut out);
            continue;
        }

        match c {
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(',');
                }
                i += 1;
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                out.push_str(match word.as_str() {
                    "True" | "TRUE" => "true",
                    "False" | "FALSE" => "false",
                    "None" | "NULL" | "Null" | "undefined" => "null",
                    other => other,
                });
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// 文字列リテラルを1つ読み、ダブルクォート文字列として出力する
///
/// 戻り値は読み終えた次の位置
fn copy_string_literal(chars: &[char], start: usize, out: &mut String) -> usize {
    let open = chars[start];
    let closers = closing_quotes(open);
    let single = matches!(open, '\'' | '\u{2018}');
    let mut i = start + 1;

    out.push('"');
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            match chars.get(i + 1) {
                // \' はJSONでは不正
                Some('\'') => out.push('\''),
                Some(next) => {
                    out.push('\\');
                    out.push(*next);
                }
                None => {}
            }
            i += 2;
            continue;
        }
        if closers.contains(&c) {
            out.push('"');
            return i + 1;
        }
        match c {
            '"' if single => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
        i += 1;
    }

    // 閉じ引用符なし（途中切れ）
    i
}

/// 途中で切れたJSONを、最後に完結した要素までで閉じる
///
/// カンマ直前と閉じ括弧直後を切断候補とし、
/// 最後の候補で切って開いている括弧を閉じる
pub fn close_truncated(text: &str) -> Option<String> {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut cut: Option<(usize, Vec<char>)> = None;

    for (idx, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                stack.pop();
                if !stack.is_empty() {
                    cut = Some((idx + 1, stack.clone()));
                }
            }
            ',' if !stack.is_empty() => cut = Some((idx, stack.clone())),
            _ => {}
        }
    }

    if stack.is_empty() && !in_string {
        return None;
    }

    let (end, open) = cut?;
    let mut closed = text[..end].trim_end().trim_end_matches(',').to_string();
    for closer in open.iter().rev() {
        closed.push(*closer);
    }
    Some(closed)
}

fn is_team_object(item: &Value) -> bool {
    item.get("players").is_some() || item.get("teamName").is_some()
}

/// 配列レスポンスを候補オブジェクトへ整形
fn into_candidate(value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Array(items) => {
            let looks_like_teams = !items.is_empty() && items.iter().all(is_team_object);
            if looks_like_teams {
                let mut map = Map::new();
                map.insert("teams".to_string(), Value::Array(items));
                return Ok(map);
            }
            if items.len() == 1 && items[0].is_object() {
                return into_candidate(items.into_iter().next().unwrap_or(Value::Null));
            }
            Err(Error::Parse("予期しないJSON配列構造です".into()))
        }
        other => Err(Error::Parse(format!(
            "JSONオブジェクトではありません: {}",
            type_name(&other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// レスポンスをパースして候補オブジェクトを返す
///
/// 厳密パース → 修復後パース → 途中切れ修復後パース の順に試す
///
/// # Arguments
/// * `response` - Vision APIのレスポンス文字列
///
/// # Returns
/// * `Ok(Map)` - 候補オブジェクト（スキーマ未検証）
/// * `Err` - JSONが見つからないか、修復しても構文エラーの場合
pub fn parse_candidate(response: &str) -> Result<Map<String, Value>> {
    let regions = json_regions(strip_code_fence(response));
    let mut first_err: Option<Error> = None;

    for region in &regions {
        match parse_region(region.text) {
            Ok(candidate) => return Ok(candidate),
            Err(e) => {
                first_err.get_or_insert(e);
            }
        }
    }

    Err(first_err.unwrap_or_else(|| Error::Parse("JSONが見つかりません".into())))
}

/// 1つの範囲を 厳密パース → 修復後パース → 途中切れ修復後パース の順に試す
fn parse_region(json_str: &str) -> Result<Map<String, Value>> {
    if let Ok(value) = serde_json::from_str::<Value>(json_str) {
        return into_candidate(value);
    }

    let repaired = repair_json(json_str);
    let strict_err = match serde_json::from_str::<Value>(&repaired) {
        Ok(value) => return into_candidate(value),
        Err(e) => e,
    };

    if let Some(closed) = close_truncated(&repaired) {
        if let Ok(value) = serde_json::from_str::<Value>(&closed) {
            return into_candidate(value);
        }
    }

    Err(Error::Parse(format!("スコアボードJSONパースエラー: {}", strict_err)))
}
