use super::expense::Category;
use serde::{Deserialize, Serialize};
use std::fmt;

/// ポリシー違反の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    /// カテゴリ合計が支出上限を超過
    SpendingLimit,
    /// 金額・カテゴリ・日付が一致する重複疑い
    Duplicate,
    /// 単一経費が上限の50%を超過
    HighAmount,
}

impl ViolationType {
    /// ストレージ表現（snake_case）を取得する
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationType::SpendingLimit => "spending_limit",
            ViolationType::Duplicate => "duplicate",
            ViolationType::HighAmount => "high_amount",
        }
    }

    /// ストレージ表現から種別を復元する
    ///
    /// # 戻り値
    /// 対応する種別。未知の値は `None`
    pub fn from_db(value: &str) -> Option<ViolationType> {
        match value {
            "spending_limit" => Some(ViolationType::SpendingLimit),
            "duplicate" => Some(ViolationType::Duplicate),
            "high_amount" => Some(ViolationType::HighAmount),
            _ => None,
        }
    }

    /// 種別ごとに固定された重大度を取得する
    pub fn severity(&self) -> ViolationSeverity {
        match self {
            ViolationType::SpendingLimit => ViolationSeverity::High,
            ViolationType::Duplicate => ViolationSeverity::Medium,
            ViolationType::HighAmount => ViolationSeverity::Low,
        }
    }
}

impl fmt::Display for ViolationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ポリシー違反の重大度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationSeverity {
    High,
    Medium,
    Low,
}

impl ViolationSeverity {
    /// ストレージ表現（小文字）を取得する
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationSeverity::High => "high",
            ViolationSeverity::Medium => "medium",
            ViolationSeverity::Low => "low",
        }
    }

    /// ストレージ表現から重大度を復元する
    pub fn from_db(value: &str) -> Option<ViolationSeverity> {
        match value {
            "high" => Some(ViolationSeverity::High),
            "medium" => Some(ViolationSeverity::Medium),
            "low" => Some(ViolationSeverity::Low),
            _ => None,
        }
    }
}

impl fmt::Display for ViolationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ポリシー違反レコード
///
/// 違反リストは経費セット全体からの純粋な射影であり、判定のたびに
/// 丸ごと再計算される。個別に保存・更新されることはない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    #[serde(rename = "type")]
    pub violation_type: ViolationType,
    pub severity: ViolationSeverity,
    pub message: String,
    /// 支出上限違反の対象カテゴリ
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// 支出上限違反の超過額
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    /// 重複・高額違反の対象経費ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expense_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_severity_per_type() {
        // 重大度は種別ごとに固定
        assert_eq!(
            ViolationType::SpendingLimit.severity(),
            ViolationSeverity::High
        );
        assert_eq!(ViolationType::Duplicate.severity(), ViolationSeverity::Medium);
        assert_eq!(ViolationType::HighAmount.severity(), ViolationSeverity::Low);
    }

    #[test]
    fn test_type_roundtrip() {
        for violation_type in [
            ViolationType::SpendingLimit,
            ViolationType::Duplicate,
            ViolationType::HighAmount,
        ] {
            assert_eq!(
                ViolationType::from_db(violation_type.as_str()),
                Some(violation_type)
            );
        }
        assert_eq!(ViolationType::from_db("policy"), None);
    }

    #[test]
    fn test_violation_json_shape() {
        // JSON表現のキー名を確認（typeにリネームされる）
        let violation = Violation {
            violation_type: ViolationType::Duplicate,
            severity: ViolationSeverity::Medium,
            message: "Potential duplicate expense: ₹100 for food on 2024-02-01".to_string(),
            category: None,
            amount: None,
            expense_id: Some(2),
        };

        let json = serde_json::to_value(&violation).unwrap();
        assert_eq!(json["type"], "duplicate");
        assert_eq!(json["severity"], "medium");
        assert_eq!(json["expense_id"], 2);
        // 未設定のオプションフィールドは出力されない
        assert!(json.get("category").is_none());
    }
}
