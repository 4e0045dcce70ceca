use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A teacher with a default meeting link. Teachers are soft-deleted by
/// deactivation; slots keep their denormalized teacher name either way.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Teacher {
    pub id: i64,
    pub name: String,
    pub meeting_link: String,
    pub active: bool,
}

impl Teacher {
    pub async fn create(
        pool: &sqlx::SqlitePool,
        name: &str,
        meeting_link: &str,
    ) -> Result<Self, sqlx::Error> {
        let id = sqlx::query("INSERT INTO teachers (name, meeting_link) VALUES (?, ?)")
            .bind(name)
            .bind(meeting_link)
            .execute(pool)
            .await?
            .last_insert_rowid();

        Ok(Teacher {
            id,
            name: name.to_string(),
            meeting_link: meeting_link.to_string(),
            active: true,
        })
    }

    pub async fn find_by_name(
        pool: &sqlx::SqlitePool,
        name: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Teacher>(
            "SELECT id, name, meeting_link, active FROM teachers WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(pool)
        .await
    }

    /// Like [`find_by_name`](Self::find_by_name) but only matches active
    /// teachers. Deactivated teachers must not receive new slots.
    pub async fn find_active_by_name(
        pool: &sqlx::SqlitePool,
        name: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Teacher>(
            "SELECT id, name, meeting_link, active FROM teachers WHERE name = ? AND active = 1",
        )
        .bind(name)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_active(pool: &sqlx::SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Teacher>(
            "SELECT id, name, meeting_link, active FROM teachers WHERE active = 1 ORDER BY name",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn deactivate(pool: &sqlx::SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let updated = sqlx::query("UPDATE teachers SET active = 0 WHERE id = ? AND active = 1")
            .bind(id)
            .execute(pool)
            .await?
            .rows_affected();

        Ok(updated == 1)
    }
}
