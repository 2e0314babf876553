pub mod config;
pub mod db;
pub mod ledger;
pub mod models;
pub mod services;
pub mod shared;

pub use ledger::Ledger;
pub use models::{
    Category, CreateExpenseDto, Expense, ExpenseStatus, UpdateExpenseDto, Violation,
    ViolationSeverity, ViolationType,
};
pub use services::{
    check_policy_compliance, format_amount, ComplianceReport, ComplianceSummary, DashboardSummary,
    PolicyConfig, DEFAULT_POLICY,
};
pub use shared::errors::{AppError, AppResult, ErrorSeverity};

use config::EnvironmentConfig;
use log::info;

/// ログシステムを初期化
///
/// ログレベルは環境設定（LOG_LEVEL）から決まる。すでに初期化済みの
/// 場合は何もしない。
pub fn initialize_logging_system() {
    // 環境設定を取得
    let env_config = EnvironmentConfig::from_env();

    // ログレベルを設定
    let log_level = match env_config.log_level.to_lowercase().as_str() {
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    };

    // env_loggerを初期化（重複呼び出しは無視される）
    let initialized = env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp_secs()
        .format_module_path(false)
        .format_target(false)
        .try_init()
        .is_ok();

    if initialized {
        info!(
            "ログシステムを初期化しました: level={}, environment={}",
            env_config.log_level, env_config.environment
        );
    }
}
