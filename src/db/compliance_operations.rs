use crate::models::{Category, Violation, ViolationSeverity, ViolationType};
use crate::services::metrics::ComplianceSummary;
use crate::shared::errors::{AppError, AppResult};
use rusqlite::{params, Connection, Row};

/// 行から違反レコードを復元する
fn map_violation_row(row: &Row<'_>) -> rusqlite::Result<Violation> {
    let type_str: String = row.get(0)?;
    let severity_str: String = row.get(1)?;
    let category: Option<String> = row.get(3)?;

    let violation_type = ViolationType::from_db(&type_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("未知の違反種別: {type_str}").into(),
        )
    })?;

    let severity = ViolationSeverity::from_db(&severity_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("未知の重大度: {severity_str}").into(),
        )
    })?;

    Ok(Violation {
        violation_type,
        severity,
        message: row.get(2)?,
        category: category.as_deref().map(Category::from_db),
        amount: row.get(4)?,
        expense_id: row.get(5)?,
    })
}

/// 違反スナップショットを丸ごと入れ替える
///
/// # 引数
/// * `conn` - データベース接続
/// * `violations` - 新しい違反リスト（判定結果の全件）
///
/// # 戻り値
/// 成功時はOk(())、失敗時はエラー
///
/// 違反リストは経費セットからの純粋な射影なので、差分更新はせず
/// トランザクション内で全削除・全挿入する。途中で失敗した場合は
/// 以前のスナップショットがそのまま残る。
pub fn replace_violations(conn: &mut Connection, violations: &[Violation]) -> AppResult<()> {
    let tx = conn.transaction()?;

    tx.execute("DELETE FROM violations", [])?;

    for violation in violations {
        tx.execute(
            "INSERT INTO violations
                (violation_type, severity, message, category, amount, expense_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                violation.violation_type.as_str(),
                violation.severity.as_str(),
                violation.message,
                violation.category.map(|c| c.as_str()),
                violation.amount,
                violation.expense_id
            ],
        )?;
    }

    tx.commit()?;
    Ok(())
}

/// 保存済みの違反スナップショットを取得する
///
/// # 引数
/// * `conn` - データベース接続
///
/// # 戻り値
/// 判定時の順序を保った違反リスト、または失敗時はエラー
pub fn load_violations(conn: &Connection) -> AppResult<Vec<Violation>> {
    let mut stmt = conn.prepare(
        "SELECT violation_type, severity, message, category, amount, expense_id
         FROM violations ORDER BY id ASC",
    )?;

    let violations = stmt.query_map([], map_violation_row)?;

    violations
        .collect::<Result<Vec<_>, _>>()
        .map_err(AppError::Database)
}

/// コンプライアンスサマリーを保存する
///
/// # 引数
/// * `conn` - データベース接続
/// * `summary` - 保存するサマリー
///
/// # 戻り値
/// 成功時はOk(())、失敗時はエラー
///
/// サマリーは常に1行で、保存のたびに上書きされる。
pub fn save_summary(conn: &Connection, summary: &ComplianceSummary) -> AppResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO compliance_summary
            (id, compliance_score, total_carbon_footprint, carbon_offset_cost,
             total_gst, input_tax_credit, expense_count, violation_count)
         VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            summary.compliance_score,
            summary.total_carbon_footprint,
            summary.carbon_offset_cost,
            summary.total_gst,
            summary.input_tax_credit,
            summary.expense_count,
            summary.violation_count
        ],
    )?;

    Ok(())
}

/// 保存済みのコンプライアンスサマリーを取得する
///
/// # 引数
/// * `conn` - データベース接続
///
/// # 戻り値
/// サマリー（未保存の場合はNone）、または失敗時はエラー
pub fn load_summary(conn: &Connection) -> AppResult<Option<ComplianceSummary>> {
    match conn.query_row(
        "SELECT compliance_score, total_carbon_footprint, carbon_offset_cost,
                total_gst, input_tax_credit, expense_count, violation_count
         FROM compliance_summary WHERE id = 1",
        [],
        |row| {
            Ok(ComplianceSummary {
                compliance_score: row.get(0)?,
                total_carbon_footprint: row.get(1)?,
                carbon_offset_cost: row.get(2)?,
                total_gst: row.get(3)?,
                input_tax_credit: row.get(4)?,
                expense_count: row.get(5)?,
                violation_count: row.get(6)?,
            })
        },
    ) {
        Ok(summary) => Ok(Some(summary)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(AppError::Database(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::open_in_memory;

    fn sample_violations() -> Vec<Violation> {
        vec![
            Violation {
                violation_type: ViolationType::SpendingLimit,
                severity: ViolationSeverity::High,
                message: "travel spending (₹60,000) exceeds limit (₹50,000)".to_string(),
                category: Some(Category::Travel),
                amount: Some(10000.0),
                expense_id: None,
            },
            Violation {
                violation_type: ViolationType::Duplicate,
                severity: ViolationSeverity::Medium,
                message: "Potential duplicate expense: ₹100 for food on 2024-02-01".to_string(),
                category: None,
                amount: None,
                expense_id: Some(2),
            },
            Violation {
                violation_type: ViolationType::HighAmount,
                severity: ViolationSeverity::Low,
                message: "High expense amount: ₹30,000 for travel".to_string(),
                category: None,
                amount: None,
                expense_id: Some(1),
            },
        ]
    }

    #[test]
    fn test_violations_roundtrip_preserves_order() {
        let mut conn = open_in_memory().unwrap();

        let violations = sample_violations();
        replace_violations(&mut conn, &violations).unwrap();

        let loaded = load_violations(&conn).unwrap();
        assert_eq!(loaded, violations);
    }

    #[test]
    fn test_replace_discards_previous_snapshot() {
        let mut conn = open_in_memory().unwrap();

        replace_violations(&mut conn, &sample_violations()).unwrap();
        assert_eq!(load_violations(&conn).unwrap().len(), 3);

        // 空のリストで入れ替えると以前の違反は残らない
        replace_violations(&mut conn, &[]).unwrap();
        assert!(load_violations(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_summary_roundtrip() {
        let conn = open_in_memory().unwrap();

        // 未保存の場合はNone
        assert!(load_summary(&conn).unwrap().is_none());

        let summary = ComplianceSummary {
            compliance_score: 75.0,
            total_carbon_footprint: 317.5,
            carbon_offset_cost: 15875.0,
            total_gst: 875.0,
            input_tax_credit: 700.0,
            expense_count: 4,
            violation_count: 1,
        };

        save_summary(&conn, &summary).unwrap();
        assert_eq!(load_summary(&conn).unwrap(), Some(summary.clone()));

        // 再保存は上書きになる（常に1行）
        let mut updated = summary;
        updated.violation_count = 0;
        updated.compliance_score = 100.0;
        save_summary(&conn, &updated).unwrap();

        let loaded = load_summary(&conn).unwrap().unwrap();
        assert_eq!(loaded.violation_count, 0);

        let row_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM compliance_summary", [], |row| row.get(0))
            .unwrap();
        assert_eq!(row_count, 1);
    }
}
