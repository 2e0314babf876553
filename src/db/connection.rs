use crate::config::{initialize_application, log_initialization_complete};
use crate::shared::errors::AppResult;
use rusqlite::Connection;
use std::path::Path;

/// データベース接続を初期化し、マイグレーションを実行する
///
/// # 戻り値
/// データベース接続、または失敗時はエラー
///
/// # 処理内容
/// 1. アプリケーション全体の初期化を実行
/// 2. データベース接続を開く
/// 3. 初期化完了ログを出力
pub fn initialize_database() -> AppResult<Connection> {
    // アプリケーション全体の初期化を実行
    let init_result = initialize_application()?;

    // データベース接続を開く
    let conn = Connection::open(&init_result.database_path)?;

    // 初期化完了ログを出力
    log_initialization_complete(&init_result);

    Ok(conn)
}

/// 指定パスのデータベースを開き、マイグレーションを実行する
///
/// # 引数
/// * `path` - データベースファイルのパス
///
/// # 戻り値
/// データベース接続、または失敗時はエラー
pub fn open_database(path: &Path) -> AppResult<Connection> {
    let conn = Connection::open(path)?;
    crate::db::migrations::run_migrations(&conn)?;
    Ok(conn)
}

/// インメモリデータベースを開き、マイグレーションを実行する
///
/// テストおよび永続化不要の用途向け。
pub fn open_in_memory() -> AppResult<Connection> {
    let conn = Connection::open_in_memory()?;
    crate::db::migrations::run_migrations(&conn)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_database_runs_migrations() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let conn = open_database(&db_path).unwrap();

        // マイグレーション済みであることを確認
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM expenses", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_open_in_memory() {
        let conn = open_in_memory().unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM violations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
