pub mod compliance_operations;
pub mod connection;
pub mod expense_operations;
pub mod migrations;

pub use compliance_operations::*;
pub use connection::{initialize_database, open_database, open_in_memory};
pub use expense_operations::*;

use chrono::Utc;
use chrono_tz::Asia::Kolkata;

/// 現在時刻をインド標準時のRFC 3339文字列で取得する
///
/// 経費レコードのタイムスタンプはすべてこの表現で保存する。
pub(crate) fn current_timestamp() -> String {
    Utc::now().with_timezone(&Kolkata).to_rfc3339()
}
