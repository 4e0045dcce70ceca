use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Snapshot of a completed slot, written when the slot is marked done.
/// Independent of the slot lifecycle; kept for reporting.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LessonRecord {
    pub id: i64,
    pub student_id: i64,
    pub teacher: String,
    pub date: String,
    pub time: String,
    pub completed_at: String,
}

impl LessonRecord {
    pub async fn count(pool: &sqlx::SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM lessons_done")
            .fetch_one(pool)
            .await
    }

    pub async fn recent(
        pool: &sqlx::SqlitePool,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, LessonRecord>(
            "SELECT id, student_id, teacher, date, time, completed_at \
             FROM lessons_done ORDER BY completed_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
