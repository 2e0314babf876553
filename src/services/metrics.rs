use crate::models::{Category, Expense, ExpenseStatus, Violation};
use serde::{Deserialize, Serialize};

/// 炭素オフセット単価（₹/kg CO2）
const CARBON_OFFSET_RATE: f64 = 50.0;

/// 仕入税額控除として申告可能と見なすGSTの割合
const INPUT_TAX_CREDIT_RATIO: f64 = 0.8;

/// コンプライアンスサマリー
///
/// 経費セットと違反リストから丸ごと再計算される集計値。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceSummary {
    /// コンプライアンススコア（0〜100）
    pub compliance_score: f64,
    /// 炭素排出量の合計（kg CO2）
    pub total_carbon_footprint: f64,
    /// 必要な炭素オフセット費用
    pub carbon_offset_cost: f64,
    /// GST額の合計
    pub total_gst: f64,
    /// 仕入税額控除の見込み額
    pub input_tax_credit: f64,
    /// 経費件数
    pub expense_count: i64,
    /// 違反件数
    pub violation_count: i64,
}

/// ダッシュボード用のサマリー
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    /// 経費金額の合計
    pub total_amount: f64,
    /// 承認待ち件数
    pub pending_approvals: i64,
    /// 炭素排出量の合計（kg CO2）
    pub total_carbon_footprint: f64,
    /// 違反件数
    pub policy_violations: i64,
}

/// ステータス別の件数内訳
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBreakdown {
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
}

/// コンプライアンスサマリーを計算する
///
/// # 引数
/// * `expenses` - 経費の列
/// * `violations` - 現在の違反リスト
///
/// # 戻り値
/// 集計済みのサマリー
///
/// スコアは `max(0, 100 - 違反件数 / 経費件数 × 100)`。経費が1件も
/// ない場合は100とする。
pub fn compute_compliance_summary(
    expenses: &[Expense],
    violations: &[Violation],
) -> ComplianceSummary {
    let expense_count = expenses.len() as i64;
    let violation_count = violations.len() as i64;

    let compliance_score = if expense_count > 0 {
        (100.0 - violation_count as f64 / expense_count as f64 * 100.0).max(0.0)
    } else {
        100.0
    };

    let total_carbon_footprint: f64 = expenses.iter().map(|e| e.carbon_footprint).sum();
    let total_gst: f64 = expenses.iter().map(|e| e.gst).sum();

    ComplianceSummary {
        compliance_score,
        total_carbon_footprint,
        carbon_offset_cost: total_carbon_footprint * CARBON_OFFSET_RATE,
        total_gst,
        input_tax_credit: total_gst * INPUT_TAX_CREDIT_RATIO,
        expense_count,
        violation_count,
    }
}

/// ダッシュボード用サマリーを計算する
///
/// # 引数
/// * `expenses` - 経費の列
/// * `violation_count` - 現在の違反件数
pub fn compute_dashboard_summary(expenses: &[Expense], violation_count: i64) -> DashboardSummary {
    DashboardSummary {
        total_amount: expenses.iter().map(|e| e.amount).sum(),
        pending_approvals: expenses
            .iter()
            .filter(|e| e.status == ExpenseStatus::Pending)
            .count() as i64,
        total_carbon_footprint: expenses.iter().map(|e| e.carbon_footprint).sum(),
        policy_violations: violation_count,
    }
}

/// 月別の経費合計を集計する
///
/// # 戻り値
/// (YYYY-MM, 合計金額) のリスト。月の並びは初出順
pub fn monthly_totals(expenses: &[Expense]) -> Vec<(String, f64)> {
    let mut totals: Vec<(String, f64)> = Vec::new();

    for expense in expenses {
        // 日付はYYYY-MM-DD形式なので先頭7文字が月
        let month = expense.date.chars().take(7).collect::<String>();
        match totals.iter_mut().find(|(m, _)| *m == month) {
            Some((_, total)) => *total += expense.amount,
            None => totals.push((month, expense.amount)),
        }
    }

    totals
}

/// カテゴリ別の経費合計を集計する
///
/// # 戻り値
/// (カテゴリ, 合計金額) のリスト。カテゴリの並びは初出順
pub fn category_totals(expenses: &[Expense]) -> Vec<(Category, f64)> {
    let mut totals: Vec<(Category, f64)> = Vec::new();

    for expense in expenses {
        match totals.iter_mut().find(|(c, _)| *c == expense.category) {
            Some((_, total)) => *total += expense.amount,
            None => totals.push((expense.category, expense.amount)),
        }
    }

    totals
}

/// ステータス別の件数を集計する
pub fn status_breakdown(expenses: &[Expense]) -> StatusBreakdown {
    let mut breakdown = StatusBreakdown {
        pending: 0,
        approved: 0,
        rejected: 0,
    };

    for expense in expenses {
        match expense.status {
            ExpenseStatus::Pending => breakdown.pending += 1,
            ExpenseStatus::Approved => breakdown.approved += 1,
            ExpenseStatus::Rejected => breakdown.rejected += 1,
        }
    }

    breakdown
}
