use crate::models::{Category, Expense, Violation, ViolationType};
use crate::services::policy::{format_amount, PolicyConfig};
use std::collections::HashSet;

/// ポリシーコンプライアンス判定
///
/// 経費セット全体とポリシー設定から違反リストを計算する純粋関数。
/// I/Oも副作用も持たず、同じ入力に対して常に同じリストを返す。
///
/// # 引数
/// * `expenses` - 経費の列（登録順であること）
/// * `policy` - ポリシー設定
///
/// # 戻り値
/// 違反リスト。順序はルール優先で固定される:
/// 1. 支出上限違反（カテゴリの初出順）
/// 2. 重複違反（経費の登録順）
/// 3. 高額違反（経費の登録順）
///
/// この順序は違反リストをそのまま表示する消費側との互換性のために
/// 維持する。
///
/// # 判定ルール
/// 各ルールは独立に評価され、1件の経費が複数のルールに該当しうる。
/// - 支出上限: カテゴリ別合計が上限を「厳密に」超えた場合のみ違反。
///   合計が上限と等しい場合は違反にならない。
/// - 重複: 金額・カテゴリ・日付の組が一致する2件目以降を違反とし、
///   後から登録された経費のIDを参照する。キーに説明や時刻は含まない
///   （同日同額の正当な経費と真の重複を区別できないのは既知の精度
///   限界であり、仕様として維持する）。
/// - 高額: 単一経費の金額がカテゴリ上限の50%を超えた場合。支出上限
///   違反の有無とは無関係に発火する。
///
/// 上限テーブルに存在しないカテゴリはフォールバック上限で判定され、
/// この関数が失敗することはない。
pub fn check_policy_compliance(expenses: &[Expense], policy: &PolicyConfig) -> Vec<Violation> {
    let mut violations = Vec::new();

    // ルール1: カテゴリ別の支出上限チェック
    // 集計はカテゴリの初出順を保持する（表示順の互換性のため）
    let mut category_totals: Vec<(Category, f64)> = Vec::new();
    for expense in expenses {
        match category_totals
            .iter_mut()
            .find(|(category, _)| *category == expense.category)
        {
            Some((_, total)) => *total += expense.amount,
            None => category_totals.push((expense.category, expense.amount)),
        }
    }

    for (category, total) in &category_totals {
        let limit = policy.limit(*category);
        if *total > limit {
            violations.push(Violation {
                violation_type: ViolationType::SpendingLimit,
                severity: ViolationType::SpendingLimit.severity(),
                message: format!(
                    "{} spending (₹{}) exceeds limit (₹{})",
                    category,
                    format_amount(*total),
                    format_amount(limit)
                ),
                category: Some(*category),
                amount: Some(total - limit),
                expense_id: None,
            });
        }
    }

    // ルール2: 重複経費のチェック（金額・カテゴリ・日付が一致）
    let mut seen: HashSet<(u64, Category, &str)> = HashSet::new();
    for expense in expenses {
        let key = (
            expense.amount.to_bits(),
            expense.category,
            expense.date.as_str(),
        );
        if !seen.insert(key) {
            violations.push(Violation {
                violation_type: ViolationType::Duplicate,
                severity: ViolationType::Duplicate.severity(),
                message: format!(
                    "Potential duplicate expense: ₹{} for {} on {}",
                    expense.amount, expense.category, expense.date
                ),
                category: None,
                amount: None,
                expense_id: Some(expense.id),
            });
        }
    }

    // ルール3: 単一経費の高額チェック（上限の50%超）
    for expense in expenses {
        let limit = policy.limit(expense.category);
        if expense.amount > limit * 0.5 {
            violations.push(Violation {
                violation_type: ViolationType::HighAmount,
                severity: ViolationType::HighAmount.severity(),
                message: format!(
                    "High expense amount: ₹{} for {}",
                    format_amount(expense.amount),
                    expense.category
                ),
                category: None,
                amount: None,
                expense_id: Some(expense.id),
            });
        }
    }

    violations
}
