//! Transactional booking/balance engine.
//!
//! Every multi-row mutation runs inside a single `BEGIN IMMEDIATE`
//! transaction, so the write lock is taken up front and conflicting callers
//! serialize at the store. Claims are conditional UPDATEs: the predicate in
//! the UPDATE itself is the race-resolution point, never a separate
//! check-then-write. Conflict and not-found outcomes surface as `Ok(false)`
//! (or `Ok(None)`) with no partial effect; transient store errors propagate
//! as `Err` and are never retried here.

use chrono::Utc;
use sqlx::pool::PoolConnection;
use sqlx::{Connection, Sqlite, SqlitePool};
use tracing::warn;

#[derive(Clone)]
pub struct Ledger {
    pool: SqlitePool,
}

/// Result of settling a completed payment, for caller-side notifications.
#[derive(Debug, Clone)]
pub struct SettledPayment {
    pub payment_id: i64,
    pub telegram_id: i64,
    pub student_name: String,
    pub tariff: String,
    pub lessons_added: i64,
    pub new_balance: i64,
}

impl Ledger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Claim a slot for a student and debit one lesson credit, atomically.
    ///
    /// Returns `Ok(false)` when the slot is missing or already claimed, or
    /// when the student is missing or has no credits left. If two callers
    /// race for the same slot exactly one wins; the loser's balance is
    /// untouched.
    pub async fn book_slot(&self, slot_id: i64, student_id: i64) -> Result<bool, sqlx::Error> {
        let mut conn = begin_immediate(&self.pool).await?;
        let outcome = async {
            let claimed = sqlx::query(
                "UPDATE slots SET student_id = ? WHERE id = ? AND student_id IS NULL",
            )
            .bind(student_id)
            .bind(slot_id)
            .execute(&mut *conn)
            .await?
            .rows_affected();

            if claimed == 0 {
                return Ok(false);
            }

            let debited = sqlx::query(
                "UPDATE students SET lessons_balance = lessons_balance - 1 \
                 WHERE id = ? AND lessons_balance > 0",
            )
            .bind(student_id)
            .execute(&mut *conn)
            .await?
            .rows_affected();

            Ok(debited == 1)
        }
        .await;
        finish(conn, outcome).await
    }

    /// Unconditionally release a claimed slot, refund one credit to its
    /// owner and reset both reminder flags. Fails if the slot is free.
    pub async fn cancel_booking(&self, slot_id: i64) -> Result<bool, sqlx::Error> {
        let mut conn = begin_immediate(&self.pool).await?;
        let outcome = release_slot(&mut conn, slot_id, None).await;
        finish(conn, outcome).await
    }

    /// Same as [`cancel_booking`](Self::cancel_booking) but only succeeds
    /// when `student_id` matches the slot's current owner. The lead-time
    /// policy for self-cancellation is enforced by the caller.
    pub async fn cancel_booking_by_owner(
        &self,
        slot_id: i64,
        student_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let mut conn = begin_immediate(&self.pool).await?;
        let outcome = release_slot(&mut conn, slot_id, Some(student_id)).await;
        finish(conn, outcome).await
    }

    /// Create a new free slot. Teacher name and link are denormalized at
    /// creation time.
    pub async fn add_slot(
        &self,
        teacher: &str,
        date: &str,
        time: &str,
        meeting_link: &str,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO slots (teacher, date, time, meeting_link) VALUES (?, ?, ?, ?)",
        )
        .bind(teacher)
        .bind(date)
        .bind(time)
        .bind(meeting_link)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Delete a slot outright; fails if it is currently claimed.
    pub async fn delete_slot(&self, slot_id: i64) -> Result<bool, sqlx::Error> {
        let deleted = sqlx::query("DELETE FROM slots WHERE id = ? AND student_id IS NULL")
            .bind(slot_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted == 1)
    }

    /// Mark a claimed slot as done: archive a history record and remove the
    /// slot row. The credit stays consumed.
    pub async fn mark_done(&self, slot_id: i64) -> Result<bool, sqlx::Error> {
        let mut conn = begin_immediate(&self.pool).await?;
        let outcome = async {
            let row: Option<(i64, String, String, String)> = sqlx::query_as(
                "SELECT student_id, teacher, date, time FROM slots \
                 WHERE id = ? AND student_id IS NOT NULL",
            )
            .bind(slot_id)
            .fetch_optional(&mut *conn)
            .await?;

            let (student_id, teacher, date, time) = match row {
                Some(row) => row,
                None => return Ok(false),
            };

            sqlx::query(
                "INSERT INTO lessons_done (student_id, teacher, date, time, completed_at) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(student_id)
            .bind(&teacher)
            .bind(&date)
            .bind(&time)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *conn)
            .await?;

            sqlx::query("DELETE FROM slots WHERE id = ?")
                .bind(slot_id)
                .execute(&mut *conn)
                .await?;

            Ok(true)
        }
        .await;
        finish(conn, outcome).await
    }

    /// Adjust a student's balance by `delta`. Fails with no effect when the
    /// result would be negative or the student does not exist.
    pub async fn adjust_balance(&self, student_id: i64, delta: i64) -> Result<bool, sqlx::Error> {
        let adjusted = sqlx::query(
            "UPDATE students SET lessons_balance = lessons_balance + ? \
             WHERE id = ? AND lessons_balance + ? >= 0",
        )
        .bind(delta)
        .bind(student_id)
        .bind(delta)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(adjusted == 1)
    }

    /// Transition a pending payment to completed and credit the purchased
    /// lessons in the same transaction.
    ///
    /// For a first purchase the student row is created from the payer's
    /// registration session; for a repurchase the existing balance is topped
    /// up. Returns `Ok(None)` (no effect) when the payment is missing or
    /// already completed, or when the payer is neither a student nor mid
    /// registration.
    pub async fn settle_payment(
        &self,
        payment_id: i64,
        charge_id: Option<&str>,
        lessons: i64,
    ) -> Result<Option<SettledPayment>, sqlx::Error> {
        let mut conn = begin_immediate(&self.pool).await?;
        let outcome = async {
            let completed = sqlx::query(
                "UPDATE payments SET status = 'completed', charge_id = ? \
                 WHERE id = ? AND status = 'pending'",
            )
            .bind(charge_id)
            .bind(payment_id)
            .execute(&mut *conn)
            .await?
            .rows_affected();

            if completed == 0 {
                return Ok(None);
            }

            let (telegram_id, tariff): (i64, String) =
                sqlx::query_as("SELECT telegram_id, tariff FROM payments WHERE id = ?")
                    .bind(payment_id)
                    .fetch_one(&mut *conn)
                    .await?;

            let existing: Option<i64> =
                sqlx::query_scalar("SELECT id FROM students WHERE telegram_id = ?")
                    .bind(telegram_id)
                    .fetch_optional(&mut *conn)
                    .await?;

            if let Some(student_id) = existing {
                sqlx::query(
                    "UPDATE students SET lessons_balance = lessons_balance + ?, tariff = ? \
                     WHERE id = ?",
                )
                .bind(lessons)
                .bind(&tariff)
                .bind(student_id)
                .execute(&mut *conn)
                .await?;
            } else {
                let session: Option<(Option<String>, Option<String>, Option<String>)> =
                    sqlx::query_as(
                        "SELECT name, email, timezone FROM registration_sessions \
                         WHERE telegram_id = ?",
                    )
                    .bind(telegram_id)
                    .fetch_optional(&mut *conn)
                    .await?;

                let (name, email, timezone) = match session {
                    Some((Some(name), Some(email), timezone)) => {
                        (name, email, timezone.unwrap_or_else(|| "UTC".to_string()))
                    }
                    // No student and no completed registration: leave the
                    // payment pending for a later retry.
                    _ => return Ok(None),
                };

                sqlx::query(
                    "INSERT INTO students \
                     (telegram_id, name, email, tariff, lessons_balance, status, timezone) \
                     VALUES (?, ?, ?, ?, ?, 'active', ?)",
                )
                .bind(telegram_id)
                .bind(&name)
                .bind(&email)
                .bind(&tariff)
                .bind(lessons)
                .bind(&timezone)
                .execute(&mut *conn)
                .await?;
            }

            sqlx::query("DELETE FROM registration_sessions WHERE telegram_id = ?")
                .bind(telegram_id)
                .execute(&mut *conn)
                .await?;

            let (student_name, new_balance): (String, i64) = sqlx::query_as(
                "SELECT name, lessons_balance FROM students WHERE telegram_id = ?",
            )
            .bind(telegram_id)
            .fetch_one(&mut *conn)
            .await?;

            Ok(Some(SettledPayment {
                payment_id,
                telegram_id,
                student_name,
                tariff,
                lessons_added: lessons,
                new_balance,
            }))
        }
        .await;
        finish_settle(conn, outcome).await
    }
}

/// Release a claimed slot: clear ownership, reset both reminder flags so a
/// rebooked slot gets fresh reminders, and refund one credit to the owner.
async fn release_slot(
    conn: &mut PoolConnection<Sqlite>,
    slot_id: i64,
    required_owner: Option<i64>,
) -> Result<bool, sqlx::Error> {
    let owner: Option<i64> = sqlx::query_scalar("SELECT student_id FROM slots WHERE id = ?")
        .bind(slot_id)
        .fetch_optional(&mut **conn)
        .await?
        .flatten();

    let owner = match owner {
        Some(owner) => owner,
        None => return Ok(false),
    };

    if let Some(required) = required_owner {
        if owner != required {
            return Ok(false);
        }
    }

    sqlx::query(
        "UPDATE slots SET student_id = NULL, reminded_24h = 0, reminded_2h = 0 WHERE id = ?",
    )
    .bind(slot_id)
    .execute(&mut **conn)
    .await?;

    sqlx::query("UPDATE students SET lessons_balance = lessons_balance + 1 WHERE id = ?")
        .bind(owner)
        .execute(&mut **conn)
        .await?;

    Ok(true)
}

async fn begin_immediate(pool: &SqlitePool) -> Result<PoolConnection<Sqlite>, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
    Ok(conn)
}

async fn finish(
    mut conn: PoolConnection<Sqlite>,
    outcome: Result<bool, sqlx::Error>,
) -> Result<bool, sqlx::Error> {
    match outcome {
        Ok(true) => match sqlx::query("COMMIT").execute(&mut *conn).await {
            Ok(_) => Ok(true),
            Err(e) => {
                abort(conn).await;
                Err(e)
            }
        },
        // Failure paths may have written the first leg; roll everything back.
        other => {
            abort(conn).await;
            other
        }
    }
}

async fn finish_settle(
    mut conn: PoolConnection<Sqlite>,
    outcome: Result<Option<SettledPayment>, sqlx::Error>,
) -> Result<Option<SettledPayment>, sqlx::Error> {
    match outcome {
        Ok(Some(settled)) => match sqlx::query("COMMIT").execute(&mut *conn).await {
            Ok(_) => Ok(Some(settled)),
            Err(e) => {
                abort(conn).await;
                Err(e)
            }
        },
        other => {
            abort(conn).await;
            other
        }
    }
}

/// No connection may re-enter the pool with the transaction still open: a
/// later borrower would silently write inside it or fail on its next
/// `BEGIN`. If the rollback itself fails the connection is detached from
/// the pool and closed.
async fn abort(mut conn: PoolConnection<Sqlite>) {
    if let Err(e) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
        warn!("Rollback failed, discarding connection: {}", e);
        if let Err(e) = conn.detach().close().await {
            warn!("Failed to close discarded connection: {}", e);
        }
    }
}
