use serde::{Deserialize, Serialize};
use std::fmt;

/// 経費カテゴリ
///
/// ポリシー上限・排出係数・GST税率の各テーブルはこのカテゴリ単位で
/// 定義される。ストレージから未知の文字列を読み込んだ場合は `Other` に
/// 丸める（コンプライアンス判定を失敗させないため）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Travel,
    Fuel,
    Food,
    Accommodation,
    Office,
    Other,
}

impl Category {
    /// 全カテゴリの一覧（テーブル初期化用）
    pub const ALL: [Category; 6] = [
        Category::Travel,
        Category::Fuel,
        Category::Food,
        Category::Accommodation,
        Category::Office,
        Category::Other,
    ];

    /// ストレージ表現（小文字）を取得する
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Travel => "travel",
            Category::Fuel => "fuel",
            Category::Food => "food",
            Category::Accommodation => "accommodation",
            Category::Office => "office",
            Category::Other => "other",
        }
    }

    /// ストレージ表現からカテゴリを復元する
    ///
    /// # 引数
    /// * `value` - データベースに保存されたカテゴリ文字列
    ///
    /// # 戻り値
    /// 対応するカテゴリ。未知の値は `Other` として扱う
    pub fn from_db(value: &str) -> Category {
        match value {
            "travel" => Category::Travel,
            "fuel" => Category::Fuel,
            "food" => Category::Food,
            "accommodation" => Category::Accommodation,
            "office" => Category::Office,
            _ => Category::Other,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 経費の承認ステータス
///
/// ステータスの遷移は承認フロー側の操作であり、コンプライアンス判定は
/// ステータスを変更しない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseStatus {
    Pending,
    Approved,
    Rejected,
}

impl ExpenseStatus {
    /// ストレージ表現（小文字）を取得する
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseStatus::Pending => "pending",
            ExpenseStatus::Approved => "approved",
            ExpenseStatus::Rejected => "rejected",
        }
    }

    /// ストレージ表現からステータスを復元する
    ///
    /// CHECK制約により未知の値は通常保存されないが、読み込みは
    /// 全域関数とし、未知の値は `Pending` に倒す。
    pub fn from_db(value: &str) -> ExpenseStatus {
        match value {
            "approved" => ExpenseStatus::Approved,
            "rejected" => ExpenseStatus::Rejected,
            _ => ExpenseStatus::Pending,
        }
    }
}

impl fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 経費データモデル
///
/// `carbon_footprint` と `gst` は作成時にカテゴリ別係数テーブルから
/// 一度だけ計算され、冗長に保存される派生フィールド。
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Expense {
    pub id: i64,
    pub date: String,
    pub amount: f64,
    pub category: Category,
    pub description: Option<String>,
    pub status: ExpenseStatus,
    pub carbon_footprint: f64,
    pub gst: f64,
    pub created_at: String,
    pub updated_at: String,
}

/// 経費作成用DTO
///
/// ステータスは常に `pending` で作成されるためDTOには含めない。
#[derive(Debug, Deserialize)]
pub struct CreateExpenseDto {
    pub date: String,
    pub amount: f64,
    pub category: Category,
    pub description: Option<String>,
}

/// 経費更新用DTO
#[derive(Debug, Default, Deserialize)]
pub struct UpdateExpenseDto {
    pub date: Option<String>,
    pub amount: Option<f64>,
    pub category: Option<Category>,
    pub description: Option<String>,
}
