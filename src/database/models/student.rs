use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub telegram_id: i64,
    pub name: String,
    pub email: String,
    pub tariff: String,
    pub lessons_balance: i64,
    pub status: String,
    pub timezone: String,
}

const COLUMNS: &str = "id, telegram_id, name, email, tariff, lessons_balance, status, timezone";

impl Student {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }

    pub async fn find_by_telegram_id(
        pool: &sqlx::SqlitePool,
        telegram_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Student>(&format!(
            "SELECT {COLUMNS} FROM students WHERE telegram_id = ?"
        ))
        .bind(telegram_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_id(
        pool: &sqlx::SqlitePool,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Student>(&format!("SELECT {COLUMNS} FROM students WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn all(pool: &sqlx::SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Student>(&format!("SELECT {COLUMNS} FROM students ORDER BY name"))
            .fetch_all(pool)
            .await
    }

    /// Flip active/blocked and return the new status, or `None` for an
    /// unknown student id.
    pub async fn toggle_status(
        pool: &sqlx::SqlitePool,
        id: i64,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "UPDATE students \
             SET status = CASE status WHEN 'active' THEN 'blocked' ELSE 'active' END \
             WHERE id = ? RETURNING status",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}
