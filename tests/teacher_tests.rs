use anyhow::Result;
use langschool_bot::database::connection::DatabaseManager;
use langschool_bot::database::models::Teacher;
use tempfile::{tempdir, TempDir};

async fn setup_test_db() -> Result<(DatabaseManager, TempDir)> {
    let temp_dir = tempdir()?;
    let db_path = temp_dir.path().join("test.db");
    let database_url = format!("sqlite:{}", db_path.display());

    let db_manager = DatabaseManager::new(&database_url).await?;
    db_manager.run_migrations().await?;

    Ok((db_manager, temp_dir))
}

#[tokio::test]
async fn test_create_and_find_teacher() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    let teacher = Teacher::create(&db.pool, "Anna", "https://meet.example/anna").await?;
    assert!(teacher.active);

    let found = Teacher::find_by_name(&db.pool, "Anna").await?.unwrap();
    assert_eq!(found.id, teacher.id);
    assert_eq!(found.meeting_link, "https://meet.example/anna");

    assert!(Teacher::find_by_name(&db.pool, "Boris").await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_deactivated_teacher_is_hidden_from_active_lookups() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    let teacher = Teacher::create(&db.pool, "Anna", "https://meet.example/anna").await?;
    assert!(Teacher::find_active_by_name(&db.pool, "Anna").await?.is_some());

    assert!(Teacher::deactivate(&db.pool, teacher.id).await?);

    // The slot form's default-link fallback must not resolve them anymore.
    assert!(Teacher::find_active_by_name(&db.pool, "Anna").await?.is_none());
    assert!(Teacher::list_active(&db.pool).await?.is_empty());

    // The row itself stays, so existing slots keep a resolvable name.
    let found = Teacher::find_by_name(&db.pool, "Anna").await?.unwrap();
    assert!(!found.active);

    // A second deactivation has nothing to do.
    assert!(!Teacher::deactivate(&db.pool, teacher.id).await?);
    assert!(!Teacher::deactivate(&db.pool, 9999).await?);

    Ok(())
}

#[tokio::test]
async fn test_list_active_sorted_by_name() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    Teacher::create(&db.pool, "Clara", "https://meet.example/clara").await?;
    Teacher::create(&db.pool, "Anna", "https://meet.example/anna").await?;
    let boris = Teacher::create(&db.pool, "Boris", "https://meet.example/boris").await?;
    Teacher::deactivate(&db.pool, boris.id).await?;

    let names: Vec<String> = Teacher::list_active(&db.pool)
        .await?
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, vec!["Anna".to_string(), "Clara".to_string()]);

    Ok(())
}
