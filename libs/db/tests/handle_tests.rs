use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use db::{ConnectOpts, DbError, DbHandle};
use sea_orm::{ConnectionTrait, DbErr, Statement};

#[tokio::test]
async fn connects_lazily_and_reuses_pool() -> Result<()> {
    let db = DbHandle::new("sqlite::memory:", ConnectOpts::default())?;
    assert!(!db.is_connected());

    let conn = db.connect().await?;
    assert!(db.is_connected());

    conn.execute_unprepared("CREATE TABLE items (id INTEGER PRIMARY KEY)")
        .await?;

    // Same pool: the table created above is visible through a second connect.
    let again = db.connect().await?;
    again
        .execute_unprepared("INSERT INTO items (id) VALUES (1)")
        .await?;

    let row = again
        .query_one(Statement::from_string(
            again.get_database_backend(),
            "SELECT COUNT(*) AS n FROM items",
        ))
        .await?
        .expect("count row");
    let n: i64 = row.try_get("", "n")?;
    assert_eq!(n, 1);

    db.close().await;
    Ok(())
}

#[tokio::test]
async fn on_connect_hook_runs_once_per_pool() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let db = DbHandle::new("sqlite::memory:", ConnectOpts::default())?.with_on_connect(
        move |conn| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                conn.execute_unprepared("CREATE TABLE IF NOT EXISTS hooked (id INTEGER)")
                    .await?;
                Ok::<(), DbErr>(())
            }
        },
    );

    let conn = db.connect().await?;
    db.connect().await?;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    conn.execute_unprepared("INSERT INTO hooked (id) VALUES (7)")
        .await?;
    Ok(())
}

#[tokio::test]
async fn failing_hook_fails_connect_and_leaves_handle_disconnected() -> Result<()> {
    let db = DbHandle::new("sqlite::memory:", ConnectOpts::default())?
        .with_on_connect(|_conn| async { Err::<(), DbErr>(DbErr::Custom("migration exploded".into())) });

    let err = db.connect().await.unwrap_err();
    assert!(err.to_string().contains("migration exploded"));
    assert!(!db.is_connected());
    Ok(())
}

#[tokio::test]
async fn unreachable_database_reports_error_each_time() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    // Parent directory does not exist and mode=rwc is absent, so sqlite cannot open it.
    let path = tmp.path().join("missing").join("contacts.db");
    let dsn = format!("sqlite://{}", path.to_string_lossy().replace('\\', "/"));

    let db = DbHandle::new(&dsn, ConnectOpts::default())?;

    assert!(matches!(db.connect().await, Err(DbError::Sea(_))));
    assert!(matches!(db.connect().await, Err(DbError::Sea(_))));
    assert!(!db.is_connected());
    Ok(())
}

#[tokio::test]
async fn connect_after_close_is_rejected() -> Result<()> {
    let db = DbHandle::new("sqlite::memory:", ConnectOpts::default())?;
    db.connect().await?;
    db.close().await;

    assert!(!db.is_connected());
    assert!(matches!(db.connect().await, Err(DbError::Closed)));
    Ok(())
}

#[tokio::test]
async fn concurrent_callers_share_one_attempt() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let db = Arc::new(
        DbHandle::new("sqlite::memory:", ConnectOpts::default())?.with_on_connect(move |_conn| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok::<(), DbErr>(())
            }
        }),
    );

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let db = db.clone();
            tokio::spawn(async move { db.connect().await })
        })
        .collect();
    for task in tasks {
        task.await??;
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(db.is_connected());
    Ok(())
}

#[tokio::test]
async fn slow_failure_is_reported_to_all_waiters_at_once() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let db = Arc::new(
        DbHandle::new("sqlite::memory:", ConnectOpts::default())?.with_on_connect(move |_conn| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(500)).await;
                Err::<(), DbErr>(DbErr::Custom("store stalled".into()))
            }
        }),
    );

    let started = Instant::now();
    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let db = db.clone();
            tokio::spawn(async move { db.connect().await })
        })
        .collect();
    for task in tasks {
        let err = task.await?.unwrap_err();
        assert!(err.to_string().contains("store stalled"));
    }

    // Waiters did not queue behind each other's attempts.
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // The failed attempt is not cached: the next call tries again.
    assert!(db.connect().await.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    Ok(())
}
