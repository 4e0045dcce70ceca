use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A purchase of a tariff bundle. Created pending at invoice time and
/// transitioned to completed only by [`Ledger::settle_payment`], which also
/// credits the lessons.
///
/// [`Ledger::settle_payment`]: crate::database::ledger::Ledger::settle_payment
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub telegram_id: i64,
    pub tariff: String,
    pub amount: i64,
    pub currency: String,
    /// Opaque token correlating this payment with the external checkout.
    pub payload: String,
    pub charge_id: Option<String>,
    pub status: String,
    pub created_at: String,
}

const COLUMNS: &str =
    "id, telegram_id, tariff, amount, currency, payload, charge_id, status, created_at";

impl Payment {
    pub async fn create_pending(
        pool: &sqlx::SqlitePool,
        telegram_id: i64,
        tariff: &str,
        amount: i64,
        currency: &str,
    ) -> Result<Self, sqlx::Error> {
        let payload = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let id = sqlx::query(
            "INSERT INTO payments (telegram_id, tariff, amount, currency, payload, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(telegram_id)
        .bind(tariff)
        .bind(amount)
        .bind(currency)
        .bind(&payload)
        .bind(&now)
        .execute(pool)
        .await?
        .last_insert_rowid();

        Ok(Payment {
            id,
            telegram_id,
            tariff: tariff.to_string(),
            amount,
            currency: currency.to_string(),
            payload,
            charge_id: None,
            status: "pending".to_string(),
            created_at: now,
        })
    }

    pub async fn find_by_id(
        pool: &sqlx::SqlitePool,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(&format!("SELECT {COLUMNS} FROM payments WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lookup by the opaque checkout token. This is the only lookup the
    /// external confirmation path may use; sequential ids are guessable.
    pub async fn find_by_payload(
        pool: &sqlx::SqlitePool,
        payload: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(&format!("SELECT {COLUMNS} FROM payments WHERE payload = ?"))
            .bind(payload)
            .fetch_optional(pool)
            .await
    }
}
