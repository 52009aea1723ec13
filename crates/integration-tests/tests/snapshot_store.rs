//! Snapshot store durability and concurrency tests

use std::collections::HashSet;
use std::sync::Arc;

use opsmedic_core::domain::{SnapshotKind, SnapshotMeta};
use opsmedic_core::port::id_provider::UuidProvider;
use opsmedic_core::port::time_provider::SystemTimeProvider;
use opsmedic_core::port::SnapshotStore;
use opsmedic_infra_sqlite::{create_pool, run_migrations, SqliteSnapshotRepository};
use serde_json::json;
use sqlx::SqlitePool;

async fn repository_at(db_path: &str) -> (SqlitePool, SqliteSnapshotRepository) {
    let pool = create_pool(db_path).await.unwrap();
    run_migrations(&pool).await.unwrap();
    let repo = SqliteSnapshotRepository::new(
        pool.clone(),
        Arc::new(UuidProvider),
        Arc::new(SystemTimeProvider),
    );
    (pool, repo)
}

fn temp_db(tag: &str) -> String {
    format!(
        "{}/opsmedic_it_{}_{}.db",
        std::env::temp_dir().display(),
        tag,
        std::process::id()
    )
}

#[tokio::test]
async fn test_snapshots_survive_process_restart() {
    let db_path = temp_db("restart");
    let _ = std::fs::remove_file(&db_path);

    // First "process": capture and close
    let id = {
        let (pool, repo) = repository_at(&db_path).await;
        let id = repo
            .capture(
                SnapshotKind::FirewallOpen,
                SnapshotMeta::new(json!({"note": "Open firewall for port 8080", "port": 8080})),
            )
            .await
            .unwrap();
        pool.close().await;
        id
    };

    // Second "process": reopen and read back the exact payload
    {
        let (pool, repo) = repository_at(&db_path).await;

        let row_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM snapshots")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(row_count, 1);

        let snapshot = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(snapshot.id, id);
        assert_eq!(snapshot.kind, SnapshotKind::FirewallOpen);
        assert_eq!(snapshot.meta.as_value()["port"], 8080);
        pool.close().await;
    }

    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_concurrent_captures_of_same_kind_yield_unique_ids() {
    let db_path = temp_db("concurrent");
    let _ = std::fs::remove_file(&db_path);

    let (pool, repo) = repository_at(&db_path).await;
    let repo = Arc::new(repo);

    let mut handles = Vec::new();
    for i in 0..20 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            repo.capture(SnapshotKind::PortFree, SnapshotMeta::new(json!({"i": i})))
                .await
                .unwrap()
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        let id = handle.await.unwrap();
        assert!(ids.insert(id), "two concurrent captures collided");
    }
    assert_eq!(ids.len(), 20);

    // every record landed in its own row
    let row_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM snapshots")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row_count, 20);

    for id in &ids {
        assert!(repo.find_by_id(id).await.unwrap().is_some());
    }

    pool.close().await;
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_list_recent_orders_newest_first() {
    let db_path = temp_db("list");
    let _ = std::fs::remove_file(&db_path);

    let (pool, repo) = repository_at(&db_path).await;
    for i in 0..5 {
        repo.capture(SnapshotKind::EnvUpdate, SnapshotMeta::new(json!({"seq": i})))
            .await
            .unwrap();
    }

    let recent = repo.list_recent(10).await.unwrap();
    assert_eq!(recent.len(), 5);
    for window in recent.windows(2) {
        assert!(window[0].created_at >= window[1].created_at);
    }

    pool.close().await;
    let _ = std::fs::remove_file(&db_path);
}
