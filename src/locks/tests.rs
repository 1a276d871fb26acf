//! Tests for the table lock files.

use super::*;
use crate::engine::EngineError;
use chrono::{Duration, Utc};
use std::path::PathBuf;
use tempfile::TempDir;

fn fast_options() -> LockOptions {
    LockOptions {
        stale_seconds: 30,
        spin_attempts: 3,
        spin_interval: std::time::Duration::from_millis(1),
    }
}

fn lock_path(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("latchkey").join("table.lock")
}

#[test]
fn test_lock_metadata_creation() {
    let meta = LockMetadata::new("transact");

    assert!(meta.owner.contains('@'));
    assert!(meta.pid.is_some());
    assert_eq!(meta.action, "transact");
    assert!(meta.age().num_minutes() < 1);
}

#[test]
fn test_lock_metadata_serialization() {
    let meta = LockMetadata::new("read");
    let json = meta.to_json().unwrap();

    assert!(json.contains("owner"));
    assert!(json.contains("created_at"));

    let parsed: LockMetadata = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.action, "read");
}

#[test]
fn test_lock_metadata_age_string() {
    let mut meta = LockMetadata::new("test");
    assert!(meta.age_string().ends_with('s'));

    meta.created_at = Utc::now() - Duration::minutes(5);
    assert!(meta.age_string().starts_with("5m"));

    meta.created_at = Utc::now() - Duration::hours(2);
    assert!(meta.age_string().starts_with("2h"));
}

#[test]
fn test_lock_metadata_is_stale() {
    let mut meta = LockMetadata::new("test");
    assert!(!meta.is_stale(30));

    meta.created_at = Utc::now() - Duration::seconds(90);
    assert!(meta.is_stale(30));
}

#[test]
fn test_acquire_creates_parent_and_releases_on_drop() {
    let temp_dir = TempDir::new().unwrap();
    let path = lock_path(&temp_dir);

    let guard = acquire_lock(&path, "transact", &fast_options()).unwrap();
    assert!(path.exists());
    assert_eq!(guard.path(), path.as_path());

    let meta = LockMetadata::from_file(&path).unwrap();
    assert_eq!(meta.action, "transact");

    drop(guard);
    assert!(!path.exists());
}

#[test]
fn test_held_lock_reports_throttled() {
    let temp_dir = TempDir::new().unwrap();
    let path = lock_path(&temp_dir);

    let guard = acquire_lock(&path, "first", &fast_options()).unwrap();

    let err = acquire_lock(&path, "second", &fast_options()).unwrap_err();
    assert!(matches!(err, EngineError::Throttled(_)));
    assert!(err.to_string().contains("held by another process"));
    assert!(err.to_string().contains("first"));

    drop(guard);
    let guard = acquire_lock(&path, "third", &fast_options()).unwrap();
    guard.release().unwrap();
    assert!(!path.exists());
}

#[test]
fn test_stale_lock_is_broken() {
    let temp_dir = TempDir::new().unwrap();
    let path = lock_path(&temp_dir);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();

    let stale_meta = LockMetadata {
        owner: "ghost@host".to_string(),
        pid: Some(12345),
        created_at: Utc::now() - Duration::minutes(10),
        action: "transact".to_string(),
    };
    std::fs::write(&path, stale_meta.to_json().unwrap()).unwrap();

    let guard = acquire_lock(&path, "recover", &fast_options()).unwrap();
    let meta = LockMetadata::from_file(guard.path()).unwrap();
    assert_eq!(meta.action, "recover");
}

#[test]
fn test_fresh_lock_is_not_broken() {
    let temp_dir = TempDir::new().unwrap();
    let path = lock_path(&temp_dir);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, LockMetadata::new("busy").to_json().unwrap()).unwrap();

    assert!(!break_stale_lock(&path, 30).unwrap());
    assert!(path.exists());
}

#[test]
fn test_unreadable_lock_judged_by_mtime() {
    let temp_dir = TempDir::new().unwrap();
    let path = lock_path(&temp_dir);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "").unwrap();

    // Just written, so not stale yet
    assert!(!break_stale_lock(&path, 30).unwrap());
    // With a zero threshold it is old enough once a second has elapsed
    std::thread::sleep(std::time::Duration::from_millis(1100));
    assert!(break_stale_lock(&path, 0).unwrap());
    assert!(!path.exists());
}

#[test]
fn test_missing_lock_counts_as_gone() {
    let temp_dir = TempDir::new().unwrap();
    assert!(break_stale_lock(&lock_path(&temp_dir), 30).unwrap());
}

#[test]
fn test_breaker_file_is_cleaned_up() {
    let temp_dir = TempDir::new().unwrap();
    let path = lock_path(&temp_dir);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let stale_meta = LockMetadata {
        owner: "ghost@host".to_string(),
        pid: Some(12345),
        created_at: Utc::now() - Duration::minutes(10),
        action: "transact".to_string(),
    };
    std::fs::write(&path, stale_meta.to_json().unwrap()).unwrap();

    assert!(break_stale_lock(&path, 30).unwrap());
    assert!(!path.exists());
    assert!(!path.with_file_name("table.lock.break").exists());
}

#[test]
fn test_held_breaker_defers_breaking() {
    let temp_dir = TempDir::new().unwrap();
    let path = lock_path(&temp_dir);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let stale_meta = LockMetadata {
        owner: "ghost@host".to_string(),
        pid: Some(12345),
        created_at: Utc::now() - Duration::minutes(10),
        action: "transact".to_string(),
    };
    std::fs::write(&path, stale_meta.to_json().unwrap()).unwrap();

    // Another process is in the middle of breaking this lock
    let breaker = path.with_file_name("table.lock.break");
    std::fs::write(&breaker, LockMetadata::new("break-stale-lock").to_json().unwrap()).unwrap();
    assert!(!break_stale_lock(&path, 30).unwrap());
    assert!(path.exists());

    // A breaker left behind by a crash is cleared, then the lock can be broken
    let mut abandoned = LockMetadata::new("break-stale-lock");
    abandoned.created_at = Utc::now() - Duration::minutes(10);
    std::fs::write(&breaker, abandoned.to_json().unwrap()).unwrap();
    assert!(!break_stale_lock(&path, 30).unwrap());
    assert!(!breaker.exists());
    assert!(break_stale_lock(&path, 30).unwrap());
    assert!(!path.exists());
}

#[test]
fn test_stale_lock_is_broken_for_exactly_one_contender() {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    let options = LockOptions {
        stale_seconds: 30,
        spin_attempts: 5_000,
        spin_interval: std::time::Duration::from_millis(1),
    };

    for _ in 0..50 {
        let temp_dir = TempDir::new().unwrap();
        let path = lock_path(&temp_dir);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let stale_meta = LockMetadata {
            owner: "ghost@host".to_string(),
            pid: Some(12345),
            created_at: Utc::now() - Duration::days(365),
            action: "transact".to_string(),
        };
        std::fs::write(&path, stale_meta.to_json().unwrap()).unwrap();

        let holders = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(std::sync::Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let path = path.clone();
                let options = options.clone();
                let holders = Arc::clone(&holders);
                let max_seen = Arc::clone(&max_seen);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    let guard = acquire_lock(&path, &format!("worker-{}", i), &options).unwrap();
                    let now = holders.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(std::time::Duration::from_millis(2));
                    holders.fetch_sub(1, Ordering::SeqCst);
                    drop(guard);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(!path.exists());
    }
}
