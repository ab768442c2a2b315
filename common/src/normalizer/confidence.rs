//! 信頼度の判定と集約
//!
//! 選手単位で判定し、チーム → 結果全体へ最小値で伝播する。
//! AIが申告した信頼度は上限としてのみ扱う。

use crate::types::ConfidenceLevel;

/// 選手1人分の判定材料
#[derive(Debug, Clone, Default)]
pub struct PlayerAssessment {
    /// AIが申告した信頼度
    pub claimed: Option<ConfidenceLevel>,
    /// 回復不能だった必須フィールド数
    pub unrecoverable: usize,
    /// 補正して読んだフィールドがある
    pub corrected: bool,
    /// 名前が読めなかった
    pub missing_name: bool,
    /// モードを推定で決めた
    pub mode_ambiguous: bool,
}

impl PlayerAssessment {
    pub fn level(&self) -> ConfidenceLevel {
        let mut assessed = if self.unrecoverable > 0 || self.missing_name {
            ConfidenceLevel::Low
        } else if self.corrected {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::High
        };

        if self.mode_ambiguous {
            assessed = assessed.downgrade();
        }

        match self.claimed {
            Some(claimed) => claimed.min(assessed),
            None => assessed,
        }
    }
}

/// 構成要素の最小値（空なら Low）
pub fn aggregate(levels: impl IntoIterator<Item = ConfidenceLevel>) -> ConfidenceLevel {
    ConfidenceLevel::min_of(levels).unwrap_or(ConfidenceLevel::Low)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_player_is_high() {
        assert_eq!(PlayerAssessment::default().level(), ConfidenceLevel::High);
    }

    #[test]
    fn test_unrecoverable_field_forces_low() {
        let assessment = PlayerAssessment {
            unrecoverable: 1,
            claimed: Some(ConfidenceLevel::High),
            ..Default::default()
        };
        assert_eq!(assessment.level(), ConfidenceLevel::Low);
    }

    #[test]
    fn test_corrected_field_caps_at_medium() {
        let assessment = PlayerAssessment {
            corrected: true,
            ..Default::default()
        };
        assert_eq!(assessment.level(), ConfidenceLevel::Medium);
    }

    #[test]
    fn test_claimed_confidence_is_upper_bound() {
        let assessment = PlayerAssessment {
            claimed: Some(ConfidenceLevel::Medium),
            ..Default::default()
        };
        assert_eq!(assessment.level(), ConfidenceLevel::Medium);
    }

    #[test]
    fn test_mode_ambiguity_downgrades_one_level() {
        let assessment = PlayerAssessment {
            mode_ambiguous: true,
            ..Default::default()
        };
        assert_eq!(assessment.level(), ConfidenceLevel::Medium);

        let corrected = PlayerAssessment {
            mode_ambiguous: true,
            corrected: true,
            ..Default::default()
        };
        assert_eq!(corrected.level(), ConfidenceLevel::Low);
    }

    #[test]
    fn test_aggregate_is_minimum() {
        let team = aggregate([
            ConfidenceLevel::High,
            ConfidenceLevel::Medium,
            ConfidenceLevel::Low,
        ]);
        assert_eq!(team, ConfidenceLevel::Low);
        assert_eq!(aggregate([ConfidenceLevel::High]), ConfidenceLevel::High);
        assert_eq!(aggregate(Vec::new()), ConfidenceLevel::Low);
    }
}
