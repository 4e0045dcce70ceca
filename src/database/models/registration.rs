use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A durable, resumable multi-step registration form keyed by telegram id.
/// At most one session exists per identity; it survives process restarts.
///
/// The same table carries the pending single-message admin forms (slot
/// entry, date filter), so no in-process per-user state exists anywhere.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RegistrationSession {
    pub telegram_id: i64,
    pub step: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub timezone: Option<String>,
    pub tariff: Option<String>,
    pub updated_at: String,
}

impl RegistrationSession {
    /// Upsert the session, advancing the step label and merging only the
    /// fields provided. Fields already set persist across steps unless
    /// explicitly overwritten.
    pub async fn save_step(
        pool: &sqlx::SqlitePool,
        telegram_id: i64,
        step: &str,
        name: Option<&str>,
        email: Option<&str>,
        timezone: Option<&str>,
        tariff: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO registration_sessions \
             (telegram_id, step, name, email, timezone, tariff, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(telegram_id) DO UPDATE SET \
                 step = excluded.step, \
                 name = COALESCE(excluded.name, registration_sessions.name), \
                 email = COALESCE(excluded.email, registration_sessions.email), \
                 timezone = COALESCE(excluded.timezone, registration_sessions.timezone), \
                 tariff = COALESCE(excluded.tariff, registration_sessions.tariff), \
                 updated_at = excluded.updated_at",
        )
        .bind(telegram_id)
        .bind(step)
        .bind(name)
        .bind(email)
        .bind(timezone)
        .bind(tariff)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn get(
        pool: &sqlx::SqlitePool,
        telegram_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, RegistrationSession>(
            "SELECT telegram_id, step, name, email, timezone, tariff, updated_at \
             FROM registration_sessions WHERE telegram_id = ?",
        )
        .bind(telegram_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn clear(pool: &sqlx::SqlitePool, telegram_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM registration_sessions WHERE telegram_id = ?")
            .bind(telegram_id)
            .execute(pool)
            .await?;

        Ok(())
    }
}
