use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A single bookable teacher time window. `date` is `DD.MM.YYYY` and `time`
/// is `HH:MM`, stored as separate text fields for compatibility with the
/// pre-existing data layout.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Slot {
    pub id: i64,
    pub teacher: String,
    pub date: String,
    pub time: String,
    pub meeting_link: String,
    pub student_id: Option<i64>,
    pub reminded_24h: bool,
    pub reminded_2h: bool,
}

/// A claimed slot joined with its owner, for admin listings.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BookingView {
    pub slot_id: i64,
    pub teacher: String,
    pub date: String,
    pub time: String,
    pub meeting_link: String,
    pub student_name: String,
    pub telegram_id: i64,
}

/// Which reminder threshold a flag column belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderKind {
    /// The long lead-time reminder (default 24 hours).
    First,
    /// The short lead-time reminder (default 2 hours).
    Second,
}

impl ReminderKind {
    fn column(self) -> &'static str {
        match self {
            ReminderKind::First => "reminded_24h",
            ReminderKind::Second => "reminded_2h",
        }
    }
}

const COLUMNS: &str = "id, teacher, date, time, meeting_link, student_id, reminded_24h, reminded_2h";

/// `DD.MM.YYYY` text sorts lexically by day first; rearranging it to
/// `YYYYMMDD` gives chronological ordering without changing the stored
/// format.
fn date_sort_key(column: &str) -> String {
    format!("substr({column}, 7) || substr({column}, 4, 2) || substr({column}, 1, 2)")
}

impl Slot {
    pub async fn find_by_id(
        pool: &sqlx::SqlitePool,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Slot>(&format!("SELECT {COLUMNS} FROM slots WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn free(pool: &sqlx::SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Slot>(&format!(
            "SELECT {COLUMNS} FROM slots WHERE student_id IS NULL ORDER BY {}, time",
            date_sort_key("date")
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn by_student(
        pool: &sqlx::SqlitePool,
        student_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Slot>(&format!(
            "SELECT {COLUMNS} FROM slots WHERE student_id = ? ORDER BY {}, time",
            date_sort_key("date")
        ))
        .bind(student_id)
        .fetch_all(pool)
        .await
    }

    pub async fn bookings(pool: &sqlx::SqlitePool) -> Result<Vec<BookingView>, sqlx::Error> {
        sqlx::query_as::<_, BookingView>(&format!(
            "SELECT s.id AS slot_id, s.teacher, s.date, s.time, s.meeting_link, \
                    st.name AS student_name, st.telegram_id \
             FROM slots s JOIN students st ON st.id = s.student_id \
             ORDER BY {}, s.time",
            date_sort_key("s.date")
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn bookings_on_date(
        pool: &sqlx::SqlitePool,
        date: &str,
    ) -> Result<Vec<BookingView>, sqlx::Error> {
        sqlx::query_as::<_, BookingView>(
            "SELECT s.id AS slot_id, s.teacher, s.date, s.time, s.meeting_link, \
                    st.name AS student_name, st.telegram_id \
             FROM slots s JOIN students st ON st.id = s.student_id \
             WHERE s.date = ? ORDER BY s.time",
        )
        .bind(date)
        .fetch_all(pool)
        .await
    }
}

/// A claimed slot joined with its owner's contact identity, as seen by the
/// reminder job.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UpcomingLesson {
    pub slot_id: i64,
    pub teacher: String,
    pub date: String,
    pub time: String,
    pub meeting_link: String,
    pub telegram_id: i64,
    pub student_name: String,
}

impl UpcomingLesson {
    /// Claimed slots whose flag for `kind` is still unset.
    pub async fn unreminded(
        pool: &sqlx::SqlitePool,
        kind: ReminderKind,
    ) -> Result<Vec<Self>, sqlx::Error> {
        // Column name comes from a fixed enum, not user input.
        let query = format!(
            "SELECT s.id AS slot_id, s.teacher, s.date, s.time, s.meeting_link, \
                    st.telegram_id, st.name AS student_name \
             FROM slots s JOIN students st ON st.id = s.student_id \
             WHERE s.student_id IS NOT NULL AND s.{} = 0 \
             ORDER BY {}, s.time",
            kind.column(),
            date_sort_key("s.date")
        );

        sqlx::query_as::<_, UpcomingLesson>(&query).fetch_all(pool).await
    }

    /// Set the flag for `kind`. Monotonic within the slot's current
    /// occupancy: only cancellation resets it.
    pub async fn mark_reminded(
        pool: &sqlx::SqlitePool,
        slot_id: i64,
        kind: ReminderKind,
    ) -> Result<(), sqlx::Error> {
        let query = format!(
            "UPDATE slots SET {} = 1 WHERE id = ? AND student_id IS NOT NULL",
            kind.column()
        );

        sqlx::query(&query).bind(slot_id).execute(pool).await?;
        Ok(())
    }
}
