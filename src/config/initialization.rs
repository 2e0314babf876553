use crate::config::{get_database_filename, get_environment, Environment};
use crate::shared::errors::{AppError, AppResult};
use log::{info, warn};
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};

/// アプリケーションデータディレクトリの名前
const APP_DIR_NAME: &str = "expense-ledger";

/// アプリケーション初期化の結果を表す構造体
#[derive(Debug)]
pub struct InitializationResult {
    /// 初回起動かどうか
    pub is_first_run: bool,
    /// アプリケーションデータディレクトリのパス
    pub app_data_dir: PathBuf,
    /// データベースファイルのパス
    pub database_path: PathBuf,
    /// 実行環境
    pub environment: Environment,
}

/// アプリケーションの初期化を実行する
///
/// # 戻り値
/// 初期化結果、または失敗時はエラー
///
/// # 処理内容
/// 1. .envファイルの読み込み（存在する場合）
/// 2. アプリケーションデータディレクトリの作成
/// 3. 初回起動の判定
/// 4. データベースファイルの初期化
pub fn initialize_application() -> AppResult<InitializationResult> {
    // 環境変数を読み込み（.envファイルがある場合）
    if dotenv::dotenv().is_err() {
        // .envファイルがない場合は無視（本番環境では環境変数が直接設定される）
        warn!(".envファイルが見つかりません。環境変数が直接設定されていることを確認してください。");
    } else {
        info!(".envファイルを読み込みました");
    }

    // 現在の実行環境を取得
    let environment = get_environment();

    // アプリケーションデータディレクトリを取得・作成
    let app_data_dir = resolve_app_data_dir()?;
    initialize_at(app_data_dir, environment)
}

/// 指定ディレクトリ配下でアプリケーションを初期化する
///
/// # 引数
/// * `app_data_dir` - アプリケーションデータディレクトリ
/// * `environment` - 実行環境
///
/// # 戻り値
/// 初期化結果、または失敗時はエラー
pub fn initialize_at(
    app_data_dir: PathBuf,
    environment: Environment,
) -> AppResult<InitializationResult> {
    ensure_app_data_directory(&app_data_dir)?;

    // データベースファイルパスを構築
    let db_filename = get_database_filename(environment.clone());
    let database_path = app_data_dir.join(db_filename);

    // 初回起動かどうかを判定（データベースファイルの存在で判定）
    let is_first_run = !database_path.exists();

    // 初回起動の場合、初期化ログを出力
    if is_first_run {
        log_first_run_initialization(&environment, &app_data_dir, &database_path);
    }

    // データベースを初期化
    initialize_database_file(&database_path)?;

    Ok(InitializationResult {
        is_first_run,
        app_data_dir,
        database_path,
        environment,
    })
}

/// プラットフォームのデータディレクトリ配下にアプリ用ディレクトリを解決する
///
/// # 戻り値
/// アプリケーションデータディレクトリのパス、または失敗時はエラー
fn resolve_app_data_dir() -> AppResult<PathBuf> {
    let base_dir = dirs::data_dir().ok_or_else(|| {
        AppError::configuration("プラットフォームのデータディレクトリを特定できませんでした")
    })?;

    Ok(base_dir.join(APP_DIR_NAME))
}

/// アプリケーションデータディレクトリを確実に作成する
///
/// # 引数
/// * `app_data_dir` - アプリケーションデータディレクトリのパス
fn ensure_app_data_directory(app_data_dir: &Path) -> AppResult<()> {
    // ディレクトリが存在しない場合は作成
    if !app_data_dir.exists() {
        fs::create_dir_all(app_data_dir)?;

        info!(
            "アプリケーションデータディレクトリを作成しました: {:?}",
            app_data_dir
        );
    }

    Ok(())
}

/// データベースファイルを初期化する
///
/// # 引数
/// * `database_path` - データベースファイルのパス
///
/// # 戻り値
/// 成功時はOk(())、失敗時はエラー
fn initialize_database_file(database_path: &Path) -> AppResult<()> {
    // データベース接続を開く（ファイルが存在しない場合は自動作成される）
    let conn = Connection::open(database_path)?;

    // マイグレーションを実行してテーブルを作成
    crate::db::migrations::run_migrations(&conn)?;

    info!("データベースファイルを初期化しました: {:?}", database_path);

    Ok(())
}

/// 初回起動時の初期化ログを出力する
///
/// # 引数
/// * `environment` - 実行環境
/// * `app_data_dir` - アプリケーションデータディレクトリ
/// * `database_path` - データベースファイルパス
fn log_first_run_initialization(
    environment: &Environment,
    app_data_dir: &Path,
    database_path: &Path,
) {
    info!("=== アプリケーション初回起動 ===");
    info!("実行環境: {:?}", environment);
    info!("アプリデータディレクトリ: {:?}", app_data_dir);
    info!("データベースファイル: {:?}", database_path);
    info!("初期化を開始します...");
}

/// 初期化完了ログを出力する
///
/// # 引数
/// * `result` - 初期化結果
pub fn log_initialization_complete(result: &InitializationResult) {
    if result.is_first_run {
        info!("初回起動の初期化が正常に完了しました");
    } else {
        info!("アプリケーション起動完了（既存データベースを使用）");
    }
    info!("環境: {:?}", result.environment);
    info!("データベース: {:?}", result.database_path);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_initialize_database_file() {
        // 一時ディレクトリを作成
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        // データベースファイルを初期化
        let result = initialize_database_file(&db_path);

        // 初期化が成功することを確認
        assert!(result.is_ok());

        // データベースファイルが作成されることを確認
        assert!(db_path.exists());
    }

    #[test]
    fn test_initialize_at_detects_first_run() {
        let temp_dir = TempDir::new().unwrap();
        let app_dir = temp_dir.path().join("app");

        // 1回目は初回起動
        let first = initialize_at(app_dir.clone(), Environment::Development).unwrap();
        assert!(first.is_first_run);
        assert!(first.database_path.exists());
        assert_eq!(
            first.database_path.file_name().unwrap(),
            "dev_ledger.db"
        );

        // 2回目は既存データベースを使用
        let second = initialize_at(app_dir, Environment::Development).unwrap();
        assert!(!second.is_first_run);
    }

    #[test]
    fn test_initialization_result_creation() {
        let result = InitializationResult {
            is_first_run: true,
            app_data_dir: PathBuf::from("/tmp/test"),
            database_path: PathBuf::from("/tmp/test/ledger.db"),
            environment: Environment::Production,
        };

        assert!(result.is_first_run);
        assert_eq!(result.environment, Environment::Production);
    }
}
