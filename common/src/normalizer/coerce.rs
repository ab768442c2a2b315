//! 数値の型変換（AI出力の文字列・小数・OCR誤認識を吸収）

use crate::types::StatTime;
use regex::Regex;
use serde_json::Value;

/// 変換結果
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced<T> {
    /// そのまま数値として読めた
    Exact(T),
    /// 補正して読めた（元の表記を保持）
    Corrected(T, String),
    /// 値がない
    Missing,
    /// 数値として読めない（元の表記を保持）
    Invalid(String),
}

impl<T: Copy> Coerced<T> {
    pub fn value(&self) -> Option<T> {
        match self {
            Coerced::Exact(v) | Coerced::Corrected(v, _) => Some(*v),
            Coerced::Missing | Coerced::Invalid(_) => None,
        }
    }

    /// 回復不能（欠損または不正）か
    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, Coerced::Missing | Coerced::Invalid(_))
    }
}

lazy_static::lazy_static! {
    static ref PLAIN_INT_RE: Regex = Regex::new(r"^\d+$").unwrap();
    static ref THOUSANDS_RE: Regex = Regex::new(r"^\d{1,3}([,.' ]\d{3})+$").unwrap();
    static ref DECIMAL_RE: Regex = Regex::new(r"^\d+\.\d+$").unwrap();
    static ref PLACEHOLDER_RE: Regex = Regex::new(r"^(-+|—|–|n/?a|null|none|\?+)$").unwrap();
}

/// OCRで数字と取り違えやすい文字を置換（O→0, l/I→1, S→5, B→8）
///
/// 数字を1文字も含まない語は置換しない
fn substitute_lookalikes(text: &str) -> Option<String> {
    if !text.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(
        text.chars()
            .map(|c| match c {
                'O' => '0',
                'l' | 'I' => '1',
                'S' => '5',
                'B' => '8',
                other => other,
            })
            .collect(),
    )
}

fn from_float(value: f64, raw: &str) -> Coerced<u32> {
    if !value.is_finite() || value < 0.0 || value > u32::MAX as f64 {
        return Coerced::Invalid(raw.to_string());
    }
    if value.fract() == 0.0 {
        Coerced::Exact(value as u32)
    } else {
        Coerced::Corrected(value.round() as u32, raw.to_string())
    }
}

/// 非負整数へ変換（kills, deaths, score など）
///
/// # Arguments
/// * `value` - 候補オブジェクトの値
/// * `ocr_substitutions` - 取り違え文字の置換を試すか
pub fn coerce_count(value: Option<&Value>, ocr_substitutions: bool) -> Coerced<u32> {
    let Some(value) = value else {
        return Coerced::Missing;
    };

    match value {
        Value::Null => Coerced::Missing,
        Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                return u32::try_from(v)
                    .map(Coerced::Exact)
                    .unwrap_or_else(|_| Coerced::Invalid(n.to_string()));
            }
            match n.as_f64() {
                Some(f) => from_float(f, &n.to_string()),
                None => Coerced::Invalid(n.to_string()),
            }
        }
        Value::String(s) => coerce_count_text(s, ocr_substitutions),
        other => Coerced::Invalid(other.to_string()),
    }
}

fn coerce_count_text(raw: &str, ocr_substitutions: bool) -> Coerced<u32> {
    let text = raw.trim();
    if text.is_empty() || PLACEHOLDER_RE.is_match(&text.to_lowercase()) {
        return Coerced::Missing;
    }

    if PLAIN_INT_RE.is_match(text) {
        return text
            .parse::<u32>()
            .map(Coerced::Exact)
            .unwrap_or_else(|_| Coerced::Invalid(raw.to_string()));
    }

    if THOUSANDS_RE.is_match(text) {
        let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
        return digits
            .parse::<u32>()
            .map(Coerced::Exact)
            .unwrap_or_else(|_| Coerced::Invalid(raw.to_string()));
    }

    if DECIMAL_RE.is_match(text) {
        return match text.parse::<f64>() {
            Ok(f) => from_float(f, raw),
            Err(_) => Coerced::Invalid(raw.to_string()),
        };
    }

    if ocr_substitutions {
        if let Some(substituted) = substitute_lookalikes(text) {
            if PLAIN_INT_RE.is_match(&substituted) {
                if let Ok(v) = substituted.parse::<u32>() {
                    return Coerced::Corrected(v, raw.to_string());
                }
            }
        }
    }

    Coerced::Invalid(raw.to_string())
}

/// 時間スタッツへ変換（hillTime, zoneTime など）
///
/// 数値は秒として扱う
pub fn coerce_time(value: Option<&Value>, ocr_substitutions: bool) -> Coerced<StatTime> {
    let Some(value) = value else {
        return Coerced::Missing;
    };

    match value {
        Value::Null => Coerced::Missing,
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.is_finite() && f >= 0.0 => Coerced::Exact(StatTime(f.round() as u32)),
            _ => Coerced::Invalid(n.to_string()),
        },
        Value::String(s) => {
            let text = s.trim();
            if text.is_empty() || PLACEHOLDER_RE.is_match(&text.to_lowercase()) {
                return Coerced::Missing;
            }
            if let Some(t) = StatTime::parse(text) {
                return Coerced::Exact(t);
            }
            if ocr_substitutions {
                if let Some(t) = substitute_lookalikes(text).and_then(|t| StatTime::parse(&t)) {
                    return Coerced::Corrected(t, s.clone());
                }
            }
            Coerced::Invalid(s.clone())
        }
        other => Coerced::Invalid(other.to_string()),
    }
}
