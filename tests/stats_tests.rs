use anyhow::Result;
use chrono::Utc;
use langschool_bot::database::connection::DatabaseManager;
use langschool_bot::services::stats::SchoolStats;
use tempfile::{tempdir, TempDir};

async fn setup_test_db() -> Result<(DatabaseManager, TempDir)> {
    let temp_dir = tempdir()?;
    let db_path = temp_dir.path().join("test.db");
    let database_url = format!("sqlite:{}", db_path.display());

    let db_manager = DatabaseManager::new(&database_url).await?;
    db_manager.run_migrations().await?;

    Ok((db_manager, temp_dir))
}

async fn insert_student(db: &DatabaseManager, telegram_id: i64, status: &str) -> Result<i64> {
    let id = sqlx::query(
        "INSERT INTO students (telegram_id, name, email, tariff, lessons_balance, status, timezone) \
         VALUES (?, 'Test Student', 'student@example.com', 'start', 0, ?, 'UTC')",
    )
    .bind(telegram_id)
    .bind(status)
    .execute(&db.pool)
    .await?
    .last_insert_rowid();

    Ok(id)
}

async fn insert_payment(
    db: &DatabaseManager,
    telegram_id: i64,
    amount: i64,
    status: &str,
    created_at: &str,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO payments (telegram_id, tariff, amount, currency, payload, status, created_at) \
         VALUES (?, 'start', ?, 'EUR', lower(hex(randomblob(16))), ?, ?)",
    )
    .bind(telegram_id)
    .bind(amount)
    .bind(status)
    .bind(created_at)
    .execute(&db.pool)
    .await?;

    Ok(())
}

#[tokio::test]
async fn test_empty_school_is_all_zeros() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    let stats = SchoolStats::collect(&db.pool).await?;
    assert_eq!(stats.total_students, 0);
    assert_eq!(stats.active_students, 0);
    assert_eq!(stats.revenue_total, 0);
    assert_eq!(stats.revenue_month, 0);
    assert_eq!(stats.lessons_completed, 0);
    assert_eq!(stats.paying_students, 0);
    assert_eq!(stats.conversion_pct, 0.0);

    Ok(())
}

#[tokio::test]
async fn test_rollups_count_only_completed_payments() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    insert_student(&db, 100, "active").await?;
    insert_student(&db, 200, "active").await?;
    insert_student(&db, 300, "blocked").await?;
    insert_student(&db, 400, "active").await?;

    let now = Utc::now().to_rfc3339();
    insert_payment(&db, 100, 8000, "completed", &now).await?;
    insert_payment(&db, 100, 14000, "completed", "2020-01-15T10:00:00+00:00").await?;
    insert_payment(&db, 200, 8000, "completed", &now).await?;
    insert_payment(&db, 400, 19000, "pending", &now).await?;

    let student_id = insert_student(&db, 500, "active").await?;
    sqlx::query(
        "INSERT INTO lessons_done (student_id, teacher, date, time, completed_at) \
         VALUES (?, 'Anna', '28.02.2026', '14:00', ?)",
    )
    .bind(student_id)
    .bind(&now)
    .execute(&db.pool)
    .await?;

    let stats = SchoolStats::collect(&db.pool).await?;
    assert_eq!(stats.total_students, 5);
    assert_eq!(stats.active_students, 4);
    assert_eq!(stats.revenue_total, 30000);
    // The 2020 payment is outside the current month.
    assert_eq!(stats.revenue_month, 16000);
    assert_eq!(stats.lessons_completed, 1);
    assert_eq!(stats.paying_students, 2);
    assert!((stats.conversion_pct - 40.0).abs() < f64::EPSILON);

    Ok(())
}

#[tokio::test]
async fn test_paying_students_deduplicates_identities() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    insert_student(&db, 100, "active").await?;
    let now = Utc::now().to_rfc3339();
    insert_payment(&db, 100, 8000, "completed", &now).await?;
    insert_payment(&db, 100, 8000, "completed", &now).await?;

    let stats = SchoolStats::collect(&db.pool).await?;
    assert_eq!(stats.paying_students, 1);
    assert_eq!(stats.revenue_total, 16000);
    assert!((stats.conversion_pct - 100.0).abs() < f64::EPSILON);

    Ok(())
}
