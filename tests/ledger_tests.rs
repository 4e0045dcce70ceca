use anyhow::Result;
use langschool_bot::database::connection::DatabaseManager;
use langschool_bot::database::ledger::Ledger;
use langschool_bot::database::models::{LessonRecord, Slot};
use tempfile::{tempdir, TempDir};

async fn setup_test_db() -> Result<(DatabaseManager, TempDir)> {
    let temp_dir = tempdir()?;
    let db_path = temp_dir.path().join("test.db");
    let database_url = format!("sqlite:{}", db_path.display());

    let db_manager = DatabaseManager::new(&database_url).await?;
    db_manager.run_migrations().await?;

    Ok((db_manager, temp_dir))
}

async fn insert_student(db: &DatabaseManager, telegram_id: i64, balance: i64) -> Result<i64> {
    let id = sqlx::query(
        "INSERT INTO students (telegram_id, name, email, tariff, lessons_balance, status, timezone) \
         VALUES (?, 'Test Student', 'student@example.com', 'start', ?, 'active', 'UTC')",
    )
    .bind(telegram_id)
    .bind(balance)
    .execute(&db.pool)
    .await?
    .last_insert_rowid();

    Ok(id)
}

async fn balance_of(db: &DatabaseManager, student_id: i64) -> Result<i64> {
    let balance = sqlx::query_scalar("SELECT lessons_balance FROM students WHERE id = ?")
        .bind(student_id)
        .fetch_one(&db.pool)
        .await?;
    Ok(balance)
}

#[tokio::test]
async fn test_book_slot_claims_and_debits() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let ledger = Ledger::new(db.pool.clone());

    let student_id = insert_student(&db, 100, 2).await?;
    let slot_id = ledger
        .add_slot("Anna", "28.02.2026", "14:00", "https://meet.example/1")
        .await?;

    assert!(ledger.book_slot(slot_id, student_id).await?);

    let slot = Slot::find_by_id(&db.pool, slot_id).await?.unwrap();
    assert_eq!(slot.student_id, Some(student_id));
    assert_eq!(balance_of(&db, student_id).await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_book_claimed_slot_fails_without_debit() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let ledger = Ledger::new(db.pool.clone());

    let first = insert_student(&db, 100, 1).await?;
    let second = insert_student(&db, 200, 1).await?;
    let slot_id = ledger
        .add_slot("Anna", "28.02.2026", "14:00", "https://meet.example/1")
        .await?;

    assert!(ledger.book_slot(slot_id, first).await?);
    assert!(!ledger.book_slot(slot_id, second).await?);

    // The loser keeps both credit and nothing else changes.
    assert_eq!(balance_of(&db, second).await?, 1);
    let slot = Slot::find_by_id(&db.pool, slot_id).await?.unwrap();
    assert_eq!(slot.student_id, Some(first));

    Ok(())
}

#[tokio::test]
async fn test_book_with_empty_balance_leaves_slot_free() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let ledger = Ledger::new(db.pool.clone());

    let student_id = insert_student(&db, 100, 0).await?;
    let slot_id = ledger
        .add_slot("Anna", "28.02.2026", "14:00", "https://meet.example/1")
        .await?;

    assert!(!ledger.book_slot(slot_id, student_id).await?);

    // The claim must be rolled back when the debit fails.
    let slot = Slot::find_by_id(&db.pool, slot_id).await?.unwrap();
    assert_eq!(slot.student_id, None);
    assert_eq!(balance_of(&db, student_id).await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_book_missing_slot_fails() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let ledger = Ledger::new(db.pool.clone());

    let student_id = insert_student(&db, 100, 1).await?;

    assert!(!ledger.book_slot(9999, student_id).await?);
    assert_eq!(balance_of(&db, student_id).await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_booking_has_exactly_one_winner() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let ledger = Ledger::new(db.pool.clone());

    let slot_id = ledger
        .add_slot("Anna", "28.02.2026", "14:00", "https://meet.example/1")
        .await?;

    let mut students = Vec::new();
    for i in 0..5 {
        students.push(insert_student(&db, 1000 + i, 1).await?);
    }

    let mut tasks = Vec::new();
    for student_id in students.clone() {
        let ledger = ledger.clone();
        tasks.push(tokio::spawn(async move {
            ledger.book_slot(slot_id, student_id).await
        }));
    }

    let mut wins = 0;
    for task in tasks {
        if task.await?? {
            wins += 1;
        }
    }
    assert_eq!(wins, 1);

    // Exactly one credit was spent across all contenders.
    let total: i64 = sqlx::query_scalar("SELECT SUM(lessons_balance) FROM students")
        .fetch_one(&db.pool)
        .await?;
    assert_eq!(total, students.len() as i64 - 1);

    Ok(())
}

#[tokio::test]
async fn test_cancel_refunds_and_resets_reminder_flags() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let ledger = Ledger::new(db.pool.clone());

    let student_id = insert_student(&db, 100, 1).await?;
    let slot_id = ledger
        .add_slot("Anna", "28.02.2026", "14:00", "https://meet.example/1")
        .await?;

    assert!(ledger.book_slot(slot_id, student_id).await?);

    sqlx::query("UPDATE slots SET reminded_24h = 1, reminded_2h = 1 WHERE id = ?")
        .bind(slot_id)
        .execute(&db.pool)
        .await?;

    assert!(ledger.cancel_booking(slot_id).await?);

    let slot = Slot::find_by_id(&db.pool, slot_id).await?.unwrap();
    assert_eq!(slot.student_id, None);
    assert!(!slot.reminded_24h);
    assert!(!slot.reminded_2h);
    assert_eq!(balance_of(&db, student_id).await?, 1);

    // Cancelling a free slot is a no-op.
    assert!(!ledger.cancel_booking(slot_id).await?);
    assert_eq!(balance_of(&db, student_id).await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_cancel_by_owner_checks_ownership() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let ledger = Ledger::new(db.pool.clone());

    let owner = insert_student(&db, 100, 1).await?;
    let stranger = insert_student(&db, 200, 1).await?;
    let slot_id = ledger
        .add_slot("Anna", "28.02.2026", "14:00", "https://meet.example/1")
        .await?;

    assert!(ledger.book_slot(slot_id, owner).await?);

    assert!(!ledger.cancel_booking_by_owner(slot_id, stranger).await?);
    let slot = Slot::find_by_id(&db.pool, slot_id).await?.unwrap();
    assert_eq!(slot.student_id, Some(owner));

    assert!(ledger.cancel_booking_by_owner(slot_id, owner).await?);
    assert_eq!(balance_of(&db, owner).await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_delete_slot_refuses_claimed() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let ledger = Ledger::new(db.pool.clone());

    let student_id = insert_student(&db, 100, 1).await?;
    let claimed = ledger
        .add_slot("Anna", "28.02.2026", "14:00", "https://meet.example/1")
        .await?;
    let free = ledger
        .add_slot("Anna", "28.02.2026", "15:00", "https://meet.example/1")
        .await?;

    assert!(ledger.book_slot(claimed, student_id).await?);

    assert!(!ledger.delete_slot(claimed).await?);
    assert!(Slot::find_by_id(&db.pool, claimed).await?.is_some());

    assert!(ledger.delete_slot(free).await?);
    assert!(Slot::find_by_id(&db.pool, free).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_mark_done_archives_without_refund() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let ledger = Ledger::new(db.pool.clone());

    let student_id = insert_student(&db, 100, 1).await?;
    let slot_id = ledger
        .add_slot("Anna", "28.02.2026", "14:00", "https://meet.example/1")
        .await?;

    assert!(ledger.book_slot(slot_id, student_id).await?);
    assert!(ledger.mark_done(slot_id).await?);

    assert!(Slot::find_by_id(&db.pool, slot_id).await?.is_none());
    assert_eq!(LessonRecord::count(&db.pool).await?, 1);
    assert_eq!(balance_of(&db, student_id).await?, 0);

    let record = &LessonRecord::recent(&db.pool, 10).await?[0];
    assert_eq!(record.student_id, student_id);
    assert_eq!(record.teacher, "Anna");

    // A second completion has nothing to act on.
    assert!(!ledger.mark_done(slot_id).await?);
    assert_eq!(LessonRecord::count(&db.pool).await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_mark_done_refuses_free_slot() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let ledger = Ledger::new(db.pool.clone());

    let slot_id = ledger
        .add_slot("Anna", "28.02.2026", "14:00", "https://meet.example/1")
        .await?;

    assert!(!ledger.mark_done(slot_id).await?);
    assert!(Slot::find_by_id(&db.pool, slot_id).await?.is_some());

    Ok(())
}

#[tokio::test]
async fn test_adjust_balance_never_goes_negative() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let ledger = Ledger::new(db.pool.clone());

    let student_id = insert_student(&db, 100, 0).await?;

    assert!(!ledger.adjust_balance(student_id, -1).await?);
    assert_eq!(balance_of(&db, student_id).await?, 0);

    assert!(ledger.adjust_balance(student_id, 2).await?);
    assert!(ledger.adjust_balance(student_id, -1).await?);
    assert_eq!(balance_of(&db, student_id).await?, 1);

    assert!(!ledger.adjust_balance(9999, 1).await?);

    Ok(())
}

#[tokio::test]
async fn test_free_slots_listed_chronologically() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let ledger = Ledger::new(db.pool.clone());

    ledger
        .add_slot("Anna", "01.02.2026", "15:00", "https://meet.example/1")
        .await?;
    ledger
        .add_slot("Anna", "15.12.2026", "09:00", "https://meet.example/1")
        .await?;
    ledger
        .add_slot("Anna", "02.01.2027", "10:00", "https://meet.example/1")
        .await?;
    ledger
        .add_slot("Anna", "01.02.2026", "09:00", "https://meet.example/1")
        .await?;

    // Day-first text must not win over the actual calendar order.
    let listed: Vec<(String, String)> = Slot::free(&db.pool)
        .await?
        .into_iter()
        .map(|s| (s.date, s.time))
        .collect();
    assert_eq!(
        listed,
        vec![
            ("01.02.2026".to_string(), "09:00".to_string()),
            ("01.02.2026".to_string(), "15:00".to_string()),
            ("15.12.2026".to_string(), "09:00".to_string()),
            ("02.01.2027".to_string(), "10:00".to_string()),
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_failed_operations_leave_pool_connections_clean() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let ledger = Ledger::new(db.pool.clone());

    let student_id = insert_student(&db, 100, 0).await?;
    let slot_id = ledger
        .add_slot("Anna", "28.02.2026", "14:00", "https://meet.example/1")
        .await?;

    // Conflict and not-found failures across more calls than the pool holds.
    for _ in 0..10 {
        assert!(!ledger.book_slot(slot_id, student_id).await?);
        assert!(!ledger.book_slot(9999, student_id).await?);
        assert!(!ledger.cancel_booking(slot_id).await?);
        assert!(!ledger.mark_done(9999).await?);
    }

    // Every pooled connection must accept a fresh transaction, so none of
    // the rolled-back ones can still be open.
    let mut conns = Vec::new();
    for _ in 0..5 {
        conns.push(db.pool.acquire().await?);
    }
    for conn in conns.iter_mut() {
        sqlx::query("BEGIN IMMEDIATE").execute(&mut **conn).await?;
        sqlx::query("ROLLBACK").execute(&mut **conn).await?;
    }
    drop(conns);

    // And the ledger itself still works.
    assert!(ledger.adjust_balance(student_id, 1).await?);
    assert!(ledger.book_slot(slot_id, student_id).await?);

    Ok(())
}

#[tokio::test]
async fn test_last_credit_spent_then_refunded() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let ledger = Ledger::new(db.pool.clone());

    let student_id = insert_student(&db, 100, 1).await?;
    let first = ledger
        .add_slot("Anna", "28.02.2026", "14:00", "https://meet.example/1")
        .await?;
    let second = ledger
        .add_slot("Anna", "28.02.2026", "15:00", "https://meet.example/1")
        .await?;

    assert!(ledger.book_slot(first, student_id).await?);
    assert!(!ledger.book_slot(second, student_id).await?);

    assert!(ledger.cancel_booking_by_owner(first, student_id).await?);
    assert!(ledger.book_slot(second, student_id).await?);
    assert_eq!(balance_of(&db, student_id).await?, 0);

    Ok(())
}
