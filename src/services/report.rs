use crate::models::Violation;
use crate::services::metrics::ComplianceSummary;
use serde::{Deserialize, Serialize};

/// コンプライアンス・ESGレポート
///
/// レポートはサマリーと違反リストのスナップショットを束ねたもの。
/// 表示側（PDF化など）はこの構造体か `render` のテキストを読み取り
/// 専用で消費する。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceReport {
    /// レポート生成日（YYYY-MM-DD）
    pub generated_on: String,
    pub summary: ComplianceSummary,
    pub violations: Vec<Violation>,
}

impl ComplianceReport {
    /// レポートを組み立てる
    ///
    /// # 引数
    /// * `generated_on` - レポート生成日
    /// * `summary` - コンプライアンスサマリー
    /// * `violations` - 現在の違反リスト
    pub fn new(
        generated_on: String,
        summary: ComplianceSummary,
        violations: Vec<Violation>,
    ) -> Self {
        ComplianceReport {
            generated_on,
            summary,
            violations,
        }
    }

    /// レポートをプレーンテキストに整形する
    ///
    /// # 戻り値
    /// セクション区切りのレポート本文
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str("Compliance & ESG Report\n");
        out.push_str(&format!("Generated on: {}\n\n", self.generated_on));

        out.push_str("[Compliance Summary]\n");
        out.push_str(&format!(
            "Compliance Score: {}%\n",
            self.summary.compliance_score.round()
        ));
        out.push_str(&format!(
            "Total Violations: {}\n\n",
            self.summary.violation_count
        ));

        out.push_str("[Environmental Impact (SDG 13)]\n");
        out.push_str(&format!(
            "Total Carbon Footprint: {:.2} kg CO2\n",
            self.summary.total_carbon_footprint
        ));
        out.push_str(&format!(
            "Carbon Offset Required: ₹{:.2}\n\n",
            self.summary.carbon_offset_cost
        ));

        out.push_str("[GST Compliance]\n");
        out.push_str(&format!("Total GST: ₹{:.2}\n", self.summary.total_gst));
        out.push_str(&format!(
            "Input Tax Credit: ₹{:.2}\n\n",
            self.summary.input_tax_credit
        ));

        if self.violations.is_empty() {
            out.push_str("No Policy Violations Detected\n\n");
        } else {
            out.push_str("[Policy Violations]\n");
            for (index, violation) in self.violations.iter().enumerate() {
                out.push_str(&format!("{}. {}\n", index + 1, violation.message));
            }
            out.push('\n');
        }

        out.push_str("This report is generated automatically and is audit-ready.\n");
        out.push_str("Aligned with SDG 13: Climate Action\n");

        out
    }
}
