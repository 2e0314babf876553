use rusqlite::{Connection, Result};

/// すべてのデータベースマイグレーションを実行する
///
/// # 引数
/// * `conn` - データベース接続
///
/// # 戻り値
/// 成功時はOk(())、失敗時はエラー
pub fn run_migrations(conn: &Connection) -> Result<()> {
    // 経費テーブルを作成
    conn.execute(
        "CREATE TABLE IF NOT EXISTS expenses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL,
            amount REAL NOT NULL,
            category TEXT NOT NULL,
            description TEXT,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK(status IN ('pending', 'approved', 'rejected')),
            carbon_footprint REAL NOT NULL DEFAULT 0,
            gst REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    // 経費テーブルのインデックスを作成
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_expenses_date ON expenses(date)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_expenses_category ON expenses(category)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_expenses_status ON expenses(status)",
        [],
    )?;

    // 違反スナップショットテーブルを作成
    // 判定のたびにトランザクション内で丸ごと入れ替える
    conn.execute(
        "CREATE TABLE IF NOT EXISTS violations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            violation_type TEXT NOT NULL
                CHECK(violation_type IN ('spending_limit', 'duplicate', 'high_amount')),
            severity TEXT NOT NULL CHECK(severity IN ('high', 'medium', 'low')),
            message TEXT NOT NULL,
            category TEXT,
            amount REAL,
            expense_id INTEGER
        )",
        [],
    )?;

    // コンプライアンスサマリーテーブルを作成（常に1行）
    conn.execute(
        "CREATE TABLE IF NOT EXISTS compliance_summary (
            id INTEGER PRIMARY KEY CHECK(id = 1),
            compliance_score REAL NOT NULL,
            total_carbon_footprint REAL NOT NULL,
            carbon_offset_cost REAL NOT NULL,
            total_gst REAL NOT NULL,
            input_tax_credit REAL NOT NULL,
            expense_count INTEGER NOT NULL,
            violation_count INTEGER NOT NULL
        )",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_migrations_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        // 各テーブルが存在することを確認
        for table in ["expenses", "violations", "compliance_summary"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "テーブル {table} が作成されていない");
        }
    }

    #[test]
    fn test_run_migrations_is_idempotent() {
        // 再実行してもエラーにならない（IF NOT EXISTS）
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
    }

    #[test]
    fn test_status_check_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        // 不正なステータスはCHECK制約で拒否される
        let result = conn.execute(
            "INSERT INTO expenses (date, amount, category, status, created_at, updated_at)
             VALUES ('2024-01-01', 100.0, 'food', 'unknown', '2024-01-01', '2024-01-01')",
            [],
        );
        assert!(result.is_err());
    }
}
