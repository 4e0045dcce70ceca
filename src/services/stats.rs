use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Read-only rollups over students, payments and completed lessons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchoolStats {
    pub total_students: i64,
    pub active_students: i64,
    /// Completed-payment revenue, minor currency units.
    pub revenue_total: i64,
    /// Completed-payment revenue for the current calendar month.
    pub revenue_month: i64,
    pub lessons_completed: i64,
    /// Distinct identities with at least one completed payment.
    pub paying_students: i64,
    /// paying / total, in percent; 0 when there are no students.
    pub conversion_pct: f64,
}

impl SchoolStats {
    /// Collect all rollups inside one read transaction so the report is a
    /// single consistent snapshot.
    pub async fn collect(pool: &SqlitePool) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let total_students: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students")
            .fetch_one(&mut *tx)
            .await?;

        let active_students: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM students WHERE status = 'active'")
                .fetch_one(&mut *tx)
                .await?;

        let revenue_total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE status = 'completed'",
        )
        .fetch_one(&mut *tx)
        .await?;

        let revenue_month: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM payments \
             WHERE status = 'completed' \
               AND strftime('%Y-%m', created_at) = strftime('%Y-%m', 'now')",
        )
        .fetch_one(&mut *tx)
        .await?;

        let lessons_completed: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lessons_done")
            .fetch_one(&mut *tx)
            .await?;

        let paying_students: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT telegram_id) FROM payments WHERE status = 'completed'",
        )
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let conversion_pct = if total_students > 0 {
            paying_students as f64 / total_students as f64 * 100.0
        } else {
            0.0
        };

        Ok(SchoolStats {
            total_students,
            active_students,
            revenue_total,
            revenue_month,
            lessons_completed,
            paying_students,
            conversion_pct,
        })
    }
}
