use crate::db::{compliance_operations, connection, expense_operations};
use crate::models::{
    Category, CreateExpenseDto, Expense, ExpenseStatus, UpdateExpenseDto, Violation,
};
use crate::services::compliance::check_policy_compliance;
use crate::services::metrics::{self, ComplianceSummary, DashboardSummary, StatusBreakdown};
use crate::services::policy::PolicyConfig;
use crate::services::report::ComplianceReport;
use crate::shared::errors::{AppError, AppResult};
use chrono::{NaiveDate, Utc};
use chrono_tz::Asia::Kolkata;
use log::info;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// 経費台帳
///
/// データベース接続とポリシー設定を保持する明示的な状態オブジェクト。
/// すべての操作はこの台帳を経由し、グローバル状態には触れない。
///
/// 経費の登録・更新・削除のたびにコンプライアンス判定を実行し、
/// 違反スナップショットとサマリーを保存し直す。違反リストは常に
/// 現在の経費セットからの純粋な射影として維持される。
pub struct Ledger {
    db: Mutex<Connection>,
    policy: PolicyConfig,
}

impl Ledger {
    /// 接続とポリシー設定から台帳を作成する
    pub fn new(conn: Connection, policy: PolicyConfig) -> Self {
        Ledger {
            db: Mutex::new(conn),
            policy,
        }
    }

    /// 既定の場所のデータベースで台帳を開く
    ///
    /// # 戻り値
    /// 初期化済みの台帳、または失敗時はエラー
    ///
    /// データベースの場所は実行環境（開発/本番）に応じて決まる。
    pub fn open() -> AppResult<Self> {
        let conn = connection::initialize_database()?;
        Ok(Ledger::new(conn, PolicyConfig::default()))
    }

    /// 指定パスのデータベースで台帳を開く
    ///
    /// # 引数
    /// * `path` - データベースファイルのパス
    pub fn open_at(path: &Path) -> AppResult<Self> {
        let conn = connection::open_database(path)?;
        Ok(Ledger::new(conn, PolicyConfig::default()))
    }

    /// インメモリデータベースで台帳を開く（テスト向け）
    pub fn in_memory() -> AppResult<Self> {
        let conn = connection::open_in_memory()?;
        Ok(Ledger::new(conn, PolicyConfig::default()))
    }

    /// ポリシー設定を差し替えた台帳を返す
    pub fn with_policy(mut self, policy: PolicyConfig) -> Self {
        self.policy = policy;
        self
    }

    /// 現在のポリシー設定を取得する
    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// データベース接続をロックする
    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|e| AppError::concurrency(format!("データベースロックエラー: {e}")))
    }

    /// 経費を登録する
    ///
    /// # 引数
    /// * `dto` - 経費作成用DTO
    ///
    /// # 戻り値
    /// 作成された経費、または失敗時はエラー
    ///
    /// 派生フィールド（炭素排出量・GST）はこの時点で一度だけ計算され、
    /// レコードに冗長に保存される。登録後はコンプライアンス判定が
    /// 実行され、違反スナップショットが更新される。
    pub fn add_expense(&self, dto: CreateExpenseDto) -> AppResult<Expense> {
        validate_amount(dto.amount)?;
        validate_date(&dto.date)?;
        validate_description(dto.description.as_deref())?;

        // 派生フィールドを作成時に計算
        let carbon_footprint = self
            .policy
            .calculate_carbon_footprint(dto.category, dto.amount);
        let gst = self.policy.calculate_gst(dto.category, dto.amount);

        let expense = {
            let db = self.lock()?;
            expense_operations::create_expense(&db, dto, carbon_footprint, gst)?
        };

        // 登録のたびにポリシー違反をチェックする
        self.check_compliance()?;

        Ok(expense)
    }

    /// 経費一覧を取得する（月・カテゴリ・ステータスでフィルタリング可能）
    ///
    /// # 引数
    /// * `month` - 月フィルター（YYYY-MM形式、オプション）
    /// * `category` - カテゴリフィルター（オプション）
    /// * `status` - ステータスフィルター（オプション）
    ///
    /// # 戻り値
    /// 新しい日付順の経費リスト、または失敗時はエラー
    pub fn expenses(
        &self,
        month: Option<&str>,
        category: Option<Category>,
        status: Option<ExpenseStatus>,
    ) -> AppResult<Vec<Expense>> {
        let db = self.lock()?;
        expense_operations::get_expenses(&db, month, category, status)
    }

    /// IDで経費を取得する
    pub fn expense(&self, id: i64) -> AppResult<Expense> {
        let db = self.lock()?;
        expense_operations::find_by_id(&db, id)
    }

    /// 経費を更新する
    ///
    /// # 引数
    /// * `id` - 経費ID
    /// * `dto` - 経費更新用DTO
    ///
    /// # 戻り値
    /// 更新された経費、または失敗時はエラー
    ///
    /// 金額またはカテゴリが変わる場合、冗長に保存された派生フィールドが
    /// 一貫性を失わないよう再計算する。更新後はコンプライアンス判定が
    /// 実行される。
    pub fn update_expense(&self, id: i64, dto: UpdateExpenseDto) -> AppResult<Expense> {
        if let Some(amount) = dto.amount {
            validate_amount(amount)?;
        }
        if let Some(ref date) = dto.date {
            validate_date(date)?;
        }
        validate_description(dto.description.as_deref())?;

        let updated = {
            let db = self.lock()?;

            // 既存の経費を取得してDTOとマージ
            let existing = expense_operations::find_by_id(&db, id)?;
            let mut merged = existing;
            if let Some(date) = dto.date {
                merged.date = date;
            }
            if let Some(amount) = dto.amount {
                merged.amount = amount;
            }
            if let Some(category) = dto.category {
                merged.category = category;
            }
            if let Some(description) = dto.description {
                merged.description = Some(description);
            }

            // 派生フィールドを再計算
            merged.carbon_footprint = self
                .policy
                .calculate_carbon_footprint(merged.category, merged.amount);
            merged.gst = self.policy.calculate_gst(merged.category, merged.amount);

            expense_operations::update_expense(&db, &merged)?
        };

        self.check_compliance()?;

        Ok(updated)
    }

    /// 経費の承認ステータスを変更する
    ///
    /// # 引数
    /// * `id` - 経費ID
    /// * `status` - 新しいステータス
    ///
    /// # 戻り値
    /// 更新された経費、または失敗時はエラー
    ///
    /// ステータスは承認フロー側の概念であり、コンプライアンス判定の
    /// 対象にならないため再判定は行わない。
    pub fn set_status(&self, id: i64, status: ExpenseStatus) -> AppResult<Expense> {
        let db = self.lock()?;
        expense_operations::update_status(&db, id, status)
    }

    /// 経費を削除する
    ///
    /// # 引数
    /// * `id` - 経費ID
    ///
    /// 削除後はコンプライアンス判定が実行され、削除された経費に起因する
    /// 違反はスナップショットに残らない。
    pub fn delete_expense(&self, id: i64) -> AppResult<()> {
        {
            let db = self.lock()?;
            expense_operations::delete_expense(&db, id)?;
        }

        self.check_compliance()?;

        Ok(())
    }

    /// コンプライアンス判定を実行する
    ///
    /// # 戻り値
    /// 新しい違反リスト、または失敗時はエラー
    ///
    /// 登録順の経費セット全体を評価し、違反スナップショットと
    /// サマリーを丸ごと保存し直す。
    pub fn check_compliance(&self) -> AppResult<Vec<Violation>> {
        let mut db = self.lock()?;

        let expenses = expense_operations::get_expenses_in_entry_order(&db)?;
        let violations = check_policy_compliance(&expenses, &self.policy);

        compliance_operations::replace_violations(&mut db, &violations)?;

        let summary = metrics::compute_compliance_summary(&expenses, &violations);
        compliance_operations::save_summary(&db, &summary)?;

        info!(
            "コンプライアンス判定を実行しました: 経費{}件、違反{}件",
            expenses.len(),
            violations.len()
        );

        Ok(violations)
    }

    /// 保存済みの違反スナップショットを取得する
    ///
    /// 表示側はこのリストを読み取り専用で消費する。
    pub fn violations(&self) -> AppResult<Vec<Violation>> {
        let db = self.lock()?;
        compliance_operations::load_violations(&db)
    }

    /// コンプライアンスサマリーを取得する
    ///
    /// # 戻り値
    /// 保存済みのサマリー。一度も判定が実行されていない場合は
    /// 現在の経費セットから計算した値
    pub fn compliance_summary(&self) -> AppResult<ComplianceSummary> {
        let db = self.lock()?;

        if let Some(summary) = compliance_operations::load_summary(&db)? {
            return Ok(summary);
        }

        let expenses = expense_operations::get_expenses_in_entry_order(&db)?;
        let violations = compliance_operations::load_violations(&db)?;
        Ok(metrics::compute_compliance_summary(&expenses, &violations))
    }

    /// ダッシュボード用サマリーを取得する
    pub fn dashboard_summary(&self) -> AppResult<DashboardSummary> {
        let db = self.lock()?;

        let expenses = expense_operations::get_expenses_in_entry_order(&db)?;
        let violations = compliance_operations::load_violations(&db)?;

        Ok(metrics::compute_dashboard_summary(&expenses, violations.len() as i64))
    }

    /// 月別の経費合計を取得する
    ///
    /// # 戻り値
    /// (YYYY-MM, 合計金額) のリスト。月の並びは登録上の初出順
    pub fn monthly_totals(&self) -> AppResult<Vec<(String, f64)>> {
        let db = self.lock()?;
        let expenses = expense_operations::get_expenses_in_entry_order(&db)?;
        Ok(metrics::monthly_totals(&expenses))
    }

    /// カテゴリ別の経費合計を取得する
    pub fn category_totals(&self) -> AppResult<Vec<(Category, f64)>> {
        let db = self.lock()?;
        let expenses = expense_operations::get_expenses_in_entry_order(&db)?;
        Ok(metrics::category_totals(&expenses))
    }

    /// ステータス別の件数内訳を取得する
    pub fn status_breakdown(&self) -> AppResult<StatusBreakdown> {
        let db = self.lock()?;
        let expenses = expense_operations::get_expenses_in_entry_order(&db)?;
        Ok(metrics::status_breakdown(&expenses))
    }

    /// コンプライアンス・ESGレポートを生成する
    ///
    /// # 戻り値
    /// 現在の経費セットと違反スナップショットから組み立てたレポート
    pub fn generate_report(&self) -> AppResult<ComplianceReport> {
        let db = self.lock()?;

        let expenses = expense_operations::get_expenses_in_entry_order(&db)?;
        let violations = compliance_operations::load_violations(&db)?;
        let summary = metrics::compute_compliance_summary(&expenses, &violations);

        let generated_on = today_kolkata().format("%Y-%m-%d").to_string();

        Ok(ComplianceReport::new(generated_on, summary, violations))
    }
}

/// インド標準時での今日の日付を取得する
fn today_kolkata() -> NaiveDate {
    Utc::now().with_timezone(&Kolkata).date_naive()
}

/// 金額のバリデーション
///
/// 正の数値かつ10桁以内であること。
fn validate_amount(amount: f64) -> AppResult<()> {
    if amount <= 0.0 {
        return Err(AppError::validation("金額は正の数値である必要があります"));
    }

    if amount > 9999999999.0 {
        return Err(AppError::validation("金額は10桁以内で入力してください"));
    }

    Ok(())
}

/// 日付のバリデーション
///
/// YYYY-MM-DD形式であり、未来の日付でないこと。
fn validate_date(date: &str) -> AppResult<()> {
    let expense_date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
        AppError::validation("日付の形式が正しくありません（YYYY-MM-DD形式で入力してください）")
    })?;

    if expense_date > today_kolkata() {
        return Err(AppError::validation("未来の日付は指定できません"));
    }

    Ok(())
}

/// 説明のバリデーション
///
/// 500文字以内であること。
fn validate_description(description: Option<&str>) -> AppResult<()> {
    if let Some(description) = description {
        if description.chars().count() > 500 {
            return Err(AppError::validation("説明は500文字以内で入力してください"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ViolationSeverity, ViolationType};

    fn dto(date: &str, amount: f64, category: Category) -> CreateExpenseDto {
        CreateExpenseDto {
            date: date.to_string(),
            amount,
            category,
            description: None,
        }
    }

    #[test]
    fn test_add_expense_computes_derived_fields() {
        let ledger = Ledger::in_memory().unwrap();

        let expense = ledger
            .add_expense(dto("2024-01-15", 15000.0, Category::Travel))
            .unwrap();

        // travel: (15000 / 10) * 0.21 = 315.0、GST 5% = 750.0
        assert_eq!(expense.carbon_footprint, 315.0);
        assert_eq!(expense.gst, 750.0);
        assert_eq!(expense.status, ExpenseStatus::Pending);
    }

    #[test]
    fn test_add_expense_validation() {
        let ledger = Ledger::in_memory().unwrap();

        // 金額は正の数値
        let result = ledger.add_expense(dto("2024-01-15", 0.0, Category::Food));
        assert!(matches!(result.unwrap_err(), AppError::Validation(_)));

        // 金額は10桁以内
        let result = ledger.add_expense(dto("2024-01-15", 10000000000.0, Category::Food));
        assert!(matches!(result.unwrap_err(), AppError::Validation(_)));

        // 日付はYYYY-MM-DD形式
        let result = ledger.add_expense(dto("15-01-2024", 100.0, Category::Food));
        assert!(matches!(result.unwrap_err(), AppError::Validation(_)));

        // 未来の日付は拒否される
        let tomorrow = (today_kolkata() + chrono::Duration::days(1))
            .format("%Y-%m-%d")
            .to_string();
        let result = ledger.add_expense(dto(&tomorrow, 100.0, Category::Food));
        assert!(matches!(result.unwrap_err(), AppError::Validation(_)));

        // 説明は500文字以内
        let mut long_dto = dto("2024-01-15", 100.0, Category::Food);
        long_dto.description = Some("あ".repeat(501));
        let result = ledger.add_expense(long_dto);
        assert!(matches!(result.unwrap_err(), AppError::Validation(_)));
    }

    #[test]
    fn test_submission_triggers_compliance_check() {
        let ledger = Ledger::in_memory().unwrap();

        ledger
            .add_expense(dto("2024-01-01", 30000.0, Category::Travel))
            .unwrap();
        ledger
            .add_expense(dto("2024-01-02", 30000.0, Category::Travel))
            .unwrap();

        // 登録のたびに判定が実行され、スナップショットが保存されている
        let violations = ledger.violations().unwrap();
        assert_eq!(violations.len(), 3);
        assert_eq!(violations[0].violation_type, ViolationType::SpendingLimit);
        assert_eq!(violations[0].amount, Some(10000.0));
        assert_eq!(violations[1].violation_type, ViolationType::HighAmount);
        assert_eq!(violations[2].violation_type, ViolationType::HighAmount);
    }

    #[test]
    fn test_recompute_clears_stale_violations() {
        let ledger = Ledger::in_memory().unwrap();

        let first = ledger
            .add_expense(dto("2024-02-01", 100.0, Category::Food))
            .unwrap();
        let second = ledger
            .add_expense(dto("2024-02-01", 100.0, Category::Food))
            .unwrap();

        // 重複違反が検出されている
        let violations = ledger.violations().unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].violation_type, ViolationType::Duplicate);
        assert_eq!(violations[0].expense_id, Some(second.id));

        // 重複の片方を削除すると違反は残らない
        ledger.delete_expense(second.id).unwrap();
        assert!(ledger.violations().unwrap().is_empty());

        // 元の経費は残っている
        assert!(ledger.expense(first.id).is_ok());
    }

    #[test]
    fn test_update_recomputes_derived_fields_and_violations() {
        let ledger = Ledger::in_memory().unwrap();

        let expense = ledger
            .add_expense(dto("2024-01-01", 100.0, Category::Food))
            .unwrap();
        assert!(ledger.violations().unwrap().is_empty());

        // 金額を上限の50%超に引き上げる
        let updated = ledger
            .update_expense(
                expense.id,
                UpdateExpenseDto {
                    amount: Some(1500.0),
                    ..UpdateExpenseDto::default()
                },
            )
            .unwrap();

        // 派生フィールドが再計算されている: food (1500 / 500) * 0.5 = 1.5
        assert_eq!(updated.carbon_footprint, 1.5);
        assert_eq!(updated.gst, 75.0);

        // 更新後の違反が検出されている
        let violations = ledger.violations().unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].violation_type, ViolationType::HighAmount);
        assert_eq!(violations[0].severity, ViolationSeverity::Low);
    }

    #[test]
    fn test_set_status_does_not_touch_violations() {
        let ledger = Ledger::in_memory().unwrap();

        let expense = ledger
            .add_expense(dto("2024-01-01", 30000.0, Category::Travel))
            .unwrap();
        let before = ledger.violations().unwrap();

        // ステータス遷移は判定結果に影響しない
        let approved = ledger
            .set_status(expense.id, ExpenseStatus::Approved)
            .unwrap();
        assert_eq!(approved.status, ExpenseStatus::Approved);
        assert_eq!(ledger.violations().unwrap(), before);
    }

    #[test]
    fn test_compliance_summary_after_checks() {
        let ledger = Ledger::in_memory().unwrap();

        // 空の台帳はスコア100
        let summary = ledger.compliance_summary().unwrap();
        assert_eq!(summary.compliance_score, 100.0);

        ledger
            .add_expense(dto("2024-01-01", 100.0, Category::Food))
            .unwrap();
        ledger
            .add_expense(dto("2024-02-01", 100.0, Category::Food))
            .unwrap();
        ledger
            .add_expense(dto("2024-02-01", 100.0, Category::Food))
            .unwrap();
        ledger
            .add_expense(dto("2024-03-01", 100.0, Category::Food))
            .unwrap();

        // 4件中1違反（重複） → スコア75
        let summary = ledger.compliance_summary().unwrap();
        assert_eq!(summary.expense_count, 4);
        assert_eq!(summary.violation_count, 1);
        assert_eq!(summary.compliance_score, 75.0);
    }

    #[test]
    fn test_dashboard_summary() {
        let ledger = Ledger::in_memory().unwrap();

        ledger
            .add_expense(dto("2024-01-01", 15000.0, Category::Travel))
            .unwrap();
        let second = ledger
            .add_expense(dto("2024-01-02", 2500.0, Category::Food))
            .unwrap();
        ledger
            .set_status(second.id, ExpenseStatus::Approved)
            .unwrap();

        let dashboard = ledger.dashboard_summary().unwrap();
        assert_eq!(dashboard.total_amount, 17500.0);
        assert_eq!(dashboard.pending_approvals, 1);
        // food 2500は合計が上限2000を超え、かつ単体でも上限の50%を超える
        assert_eq!(dashboard.policy_violations, 2);
    }

    #[test]
    fn test_generate_report() {
        let ledger = Ledger::in_memory().unwrap();

        ledger
            .add_expense(dto("2024-01-01", 30000.0, Category::Travel))
            .unwrap();

        let report = ledger.generate_report().unwrap();
        let text = report.render();

        assert!(text.contains("Compliance & ESG Report"));
        assert!(text.contains("1. High expense amount: ₹30,000 for travel"));
    }

    #[test]
    fn test_aggregation_views() {
        let ledger = Ledger::in_memory().unwrap();

        ledger
            .add_expense(dto("2024-01-10", 1000.0, Category::Travel))
            .unwrap();
        ledger
            .add_expense(dto("2024-02-05", 500.0, Category::Food))
            .unwrap();
        ledger
            .add_expense(dto("2024-01-20", 2000.0, Category::Travel))
            .unwrap();

        // 月別集計は初出順
        let monthly = ledger.monthly_totals().unwrap();
        assert_eq!(
            monthly,
            vec![
                ("2024-01".to_string(), 3000.0),
                ("2024-02".to_string(), 500.0)
            ]
        );

        // カテゴリ別集計も初出順
        let by_category = ledger.category_totals().unwrap();
        assert_eq!(
            by_category,
            vec![(Category::Travel, 3000.0), (Category::Food, 500.0)]
        );

        let breakdown = ledger.status_breakdown().unwrap();
        assert_eq!(breakdown.pending, 3);
        assert_eq!(breakdown.approved, 0);
    }

    #[test]
    fn test_custom_policy() {
        use std::collections::HashMap;

        // 上限テーブルを差し替えた台帳
        let limits = HashMap::from([(Category::Travel, 50000.0)]);
        let policy = PolicyConfig::with_limits(limits, 3000.0);
        let ledger = Ledger::in_memory().unwrap().with_policy(policy);

        // officeは上限テーブルにないのでフォールバック上限3000で判定される
        ledger
            .add_expense(dto("2024-01-01", 3500.0, Category::Office))
            .unwrap();

        let violations = ledger.violations().unwrap();
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].violation_type, ViolationType::SpendingLimit);
        assert_eq!(violations[0].amount, Some(500.0));
        assert_eq!(violations[1].violation_type, ViolationType::HighAmount);
    }
}
