use crate::db::current_timestamp;
use crate::models::{Category, CreateExpenseDto, Expense, ExpenseStatus};
use crate::shared::errors::{AppError, AppResult};
use rusqlite::{params, Connection, Row};

/// SELECT句の共通カラムリスト
const EXPENSE_COLUMNS: &str =
    "id, date, amount, category, description, status, carbon_footprint, gst, created_at, updated_at";

/// 行から経費モデルを復元する
fn map_expense_row(row: &Row<'_>) -> rusqlite::Result<Expense> {
    let category: String = row.get(3)?;
    let status: String = row.get(5)?;

    Ok(Expense {
        id: row.get(0)?,
        date: row.get(1)?,
        amount: row.get(2)?,
        category: Category::from_db(&category),
        description: row.get(4)?,
        status: ExpenseStatus::from_db(&status),
        carbon_footprint: row.get(6)?,
        gst: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

/// 経費を作成する
///
/// # 引数
/// * `conn` - データベース接続
/// * `dto` - 経費作成用DTO
/// * `carbon_footprint` - 作成時に計算済みの炭素排出量
/// * `gst` - 作成時に計算済みのGST額
///
/// # 戻り値
/// 作成された経費、または失敗時はエラー
///
/// ステータスは常に `pending` で作成される。派生フィールドの計算は
/// ポリシー設定を持つ呼び出し側の責務。
pub fn create_expense(
    conn: &Connection,
    dto: CreateExpenseDto,
    carbon_footprint: f64,
    gst: f64,
) -> AppResult<Expense> {
    let now = current_timestamp();

    conn.execute(
        "INSERT INTO expenses
            (date, amount, category, description, status, carbon_footprint, gst, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            dto.date,
            dto.amount,
            dto.category.as_str(),
            dto.description,
            ExpenseStatus::Pending.as_str(),
            carbon_footprint,
            gst,
            now,
            now
        ],
    )?;

    let id = conn.last_insert_rowid();
    find_by_id(conn, id)
}

/// IDで経費を取得する
///
/// # 引数
/// * `conn` - データベース接続
/// * `id` - 経費ID
///
/// # 戻り値
/// 経費、または失敗時はエラー
pub fn find_by_id(conn: &Connection, id: i64) -> AppResult<Expense> {
    conn.query_row(
        &format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = ?1"),
        params![id],
        map_expense_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => AppError::not_found("経費"),
        _ => AppError::Database(e),
    })
}

/// 経費一覧を取得する（月・カテゴリ・ステータスでフィルタリング可能）
///
/// # 引数
/// * `conn` - データベース接続
/// * `month` - 月フィルター（YYYY-MM形式、オプション）
/// * `category` - カテゴリフィルター（オプション）
/// * `status` - ステータスフィルター（オプション）
///
/// # 戻り値
/// 新しい日付順に並んだ経費のリスト、または失敗時はエラー
pub fn get_expenses(
    conn: &Connection,
    month: Option<&str>,
    category: Option<Category>,
    status: Option<ExpenseStatus>,
) -> AppResult<Vec<Expense>> {
    let mut query = format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE 1=1");

    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    // 月フィルター
    if let Some(m) = month {
        query.push_str(" AND date LIKE ?");
        params.push(Box::new(format!("{m}%")));
    }

    // カテゴリフィルター
    if let Some(c) = category {
        query.push_str(" AND category = ?");
        params.push(Box::new(c.as_str().to_string()));
    }

    // ステータスフィルター
    if let Some(s) = status {
        query.push_str(" AND status = ?");
        params.push(Box::new(s.as_str().to_string()));
    }

    query.push_str(" ORDER BY date DESC, id DESC");

    let mut stmt = conn.prepare(&query)?;
    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

    let expenses = stmt.query_map(param_refs.as_slice(), map_expense_row)?;

    expenses
        .collect::<Result<Vec<_>, _>>()
        .map_err(AppError::Database)
}

/// 経費一覧を登録順で取得する
///
/// コンプライアンス判定は登録順の経費列を前提とするため、
/// 表示用の `get_expenses` とは別に用意する。
///
/// # 引数
/// * `conn` - データベース接続
///
/// # 戻り値
/// 登録順（ID昇順）の経費のリスト、または失敗時はエラー
pub fn get_expenses_in_entry_order(conn: &Connection) -> AppResult<Vec<Expense>> {
    let mut stmt =
        conn.prepare(&format!("SELECT {EXPENSE_COLUMNS} FROM expenses ORDER BY id ASC"))?;

    let expenses = stmt.query_map([], map_expense_row)?;

    expenses
        .collect::<Result<Vec<_>, _>>()
        .map_err(AppError::Database)
}

/// 経費を更新する
///
/// # 引数
/// * `conn` - データベース接続
/// * `expense` - マージ済みのフィールドを持つ経費（IDで更新対象を特定）
///
/// # 戻り値
/// 更新された経費、または失敗時はエラー
///
/// DTOとのマージおよび派生フィールドの再計算は呼び出し側の責務。
pub fn update_expense(conn: &Connection, expense: &Expense) -> AppResult<Expense> {
    let now = current_timestamp();

    let affected_rows = conn.execute(
        "UPDATE expenses
         SET date = ?1, amount = ?2, category = ?3, description = ?4,
             carbon_footprint = ?5, gst = ?6, updated_at = ?7
         WHERE id = ?8",
        params![
            expense.date,
            expense.amount,
            expense.category.as_str(),
            expense.description,
            expense.carbon_footprint,
            expense.gst,
            now,
            expense.id
        ],
    )?;

    if affected_rows == 0 {
        return Err(AppError::not_found("経費"));
    }

    find_by_id(conn, expense.id)
}

/// 経費の承認ステータスを更新する
///
/// # 引数
/// * `conn` - データベース接続
/// * `id` - 経費ID
/// * `status` - 新しいステータス
///
/// # 戻り値
/// 更新された経費、または失敗時はエラー
pub fn update_status(conn: &Connection, id: i64, status: ExpenseStatus) -> AppResult<Expense> {
    let now = current_timestamp();

    let affected_rows = conn.execute(
        "UPDATE expenses SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now, id],
    )?;

    if affected_rows == 0 {
        return Err(AppError::not_found("経費"));
    }

    find_by_id(conn, id)
}

/// 経費を削除する
///
/// # 引数
/// * `conn` - データベース接続
/// * `id` - 経費ID
///
/// # 戻り値
/// 成功時はOk(())、失敗時はエラー
pub fn delete_expense(conn: &Connection, id: i64) -> AppResult<()> {
    let affected_rows = conn.execute("DELETE FROM expenses WHERE id = ?1", params![id])?;

    if affected_rows == 0 {
        return Err(AppError::not_found("経費"));
    }

    Ok(())
}
