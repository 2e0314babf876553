use crate::models::Category;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 既定のポリシー設定（プロセス全体で共有）
pub static DEFAULT_POLICY: Lazy<PolicyConfig> = Lazy::new(PolicyConfig::default);

/// ポリシー設定
///
/// カテゴリ別の支出上限・炭素排出係数・GST税率を保持する。
/// 上限テーブルに存在しないカテゴリは `fallback_limit` で判定する
/// （未知カテゴリで判定を失敗させないため）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// カテゴリ別支出上限（月次累計の上限額）
    pub limits: HashMap<Category, f64>,
    /// 上限テーブルに存在しないカテゴリに適用する上限
    pub fallback_limit: f64,
    /// カテゴリ別炭素排出係数（kg CO2）
    pub carbon_factors: HashMap<Category, f64>,
    /// カテゴリ別GST税率（%）
    pub gst_rates: HashMap<Category, f64>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        let limits = HashMap::from([
            (Category::Travel, 50000.0),
            (Category::Fuel, 10000.0),
            (Category::Food, 2000.0),
            (Category::Accommodation, 8000.0),
            (Category::Office, 5000.0),
            (Category::Other, 3000.0),
        ]);

        // 排出係数: travelは円/km、fuelは円/リットル換算の係数
        let carbon_factors = HashMap::from([
            (Category::Travel, 0.21),
            (Category::Fuel, 2.31),
            (Category::Food, 0.5),
            (Category::Accommodation, 12.0),
            (Category::Office, 0.1),
            (Category::Other, 0.05),
        ]);

        let gst_rates = HashMap::from([
            (Category::Travel, 5.0),
            (Category::Fuel, 28.0),
            (Category::Food, 5.0),
            (Category::Accommodation, 12.0),
            (Category::Office, 18.0),
            (Category::Other, 18.0),
        ]);

        PolicyConfig {
            limits,
            fallback_limit: 3000.0,
            carbon_factors,
            gst_rates,
        }
    }
}

impl PolicyConfig {
    /// 支出上限テーブルを指定してポリシー設定を作成する
    ///
    /// # 引数
    /// * `limits` - カテゴリ別支出上限
    /// * `fallback_limit` - テーブルに存在しないカテゴリへ適用する上限
    ///
    /// # 戻り値
    /// 係数テーブルは既定値のままのポリシー設定
    pub fn with_limits(limits: HashMap<Category, f64>, fallback_limit: f64) -> Self {
        PolicyConfig {
            limits,
            fallback_limit,
            ..PolicyConfig::default()
        }
    }

    /// カテゴリの支出上限を取得する
    ///
    /// テーブルに存在しないカテゴリはフォールバック上限を返す。
    pub fn limit(&self, category: Category) -> f64 {
        self.limits
            .get(&category)
            .copied()
            .unwrap_or(self.fallback_limit)
    }

    /// カテゴリの炭素排出係数を取得する
    ///
    /// テーブルに存在しない場合は `Other` の係数に倒す。
    pub fn carbon_factor(&self, category: Category) -> f64 {
        self.carbon_factors
            .get(&category)
            .or_else(|| self.carbon_factors.get(&Category::Other))
            .copied()
            .unwrap_or(0.05)
    }

    /// カテゴリのGST税率を取得する
    ///
    /// テーブルに存在しない場合は `Other` の税率に倒す。
    pub fn gst_rate(&self, category: Category) -> f64 {
        self.gst_rates
            .get(&category)
            .or_else(|| self.gst_rates.get(&Category::Other))
            .copied()
            .unwrap_or(18.0)
    }

    /// 経費金額から炭素排出量（kg CO2）を計算する
    ///
    /// # 引数
    /// * `category` - 経費カテゴリ
    /// * `amount` - 経費金額
    ///
    /// # 戻り値
    /// 小数点以下2桁に丸めた排出量
    ///
    /// # 換算の前提
    /// - travel: ₹10/km
    /// - fuel: ₹100/リットル
    /// - food: ₹500/食
    /// - accommodation: ₹3000/泊
    /// - その他: 金額×係数を1/1000スケールに換算
    pub fn calculate_carbon_footprint(&self, category: Category, amount: f64) -> f64 {
        let factor = self.carbon_factor(category);

        let footprint = match category {
            Category::Travel => (amount / 10.0) * factor,
            Category::Fuel => (amount / 100.0) * factor,
            Category::Food => (amount / 500.0) * factor,
            Category::Accommodation => (amount / 3000.0) * factor,
            _ => amount * factor / 1000.0,
        };

        round2(footprint)
    }

    /// 経費金額からGST額を計算する
    ///
    /// # 引数
    /// * `category` - 経費カテゴリ
    /// * `amount` - 経費金額
    ///
    /// # 戻り値
    /// 小数点以下2桁に丸めたGST額
    pub fn calculate_gst(&self, category: Category, amount: f64) -> f64 {
        let rate = self.gst_rate(category);
        round2(amount * rate / 100.0)
    }
}

/// 小数点以下2桁への丸め
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 金額を3桁区切りの文字列に整形する
///
/// # 引数
/// * `value` - 金額
///
/// # 戻り値
/// 整形済み文字列（例: 50000 → "50,000"、1234.5 → "1,234.5"）
///
/// 小数部は2桁に丸めたうえで末尾のゼロを落とす。
pub fn format_amount(value: f64) -> String {
    let formatted = format!("{:.2}", round2(value));
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');

    let (sign, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", trimmed),
    };

    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (unsigned, None),
    };

    // 右から3桁ごとにカンマを挿入
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (index, digit) in int_part.chars().enumerate() {
        if index > 0 && (int_part.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}
