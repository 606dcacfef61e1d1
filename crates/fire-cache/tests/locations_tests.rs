//! Tests for the file-backed saved-location store.

use fire_cache::{LocationStore, LocationStoreError};
use fire_common::{FireError, Location};
use tempfile::TempDir;

fn store_path(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("state").join("locations.json")
}

#[tokio::test]
async fn test_missing_file_opens_empty() {
    let dir = TempDir::new().unwrap();
    let store = LocationStore::open(store_path(&dir)).await.unwrap();
    assert!(store.list().await.is_empty());
}

#[tokio::test]
async fn test_add_persists_and_reloads() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);

    let store = LocationStore::open(&path).await.unwrap();
    let paradise = store.add(Location::new("Paradise", 39.76, -121.62)).await.unwrap();
    store.add(Location::new("Malibu", 34.03, -118.78)).await.unwrap();
    assert!(path.exists());

    let reopened = LocationStore::open(&path).await.unwrap();
    let names: Vec<String> = reopened.list().await.into_iter().map(|l| l.name).collect();
    assert_eq!(names, vec!["Paradise", "Malibu"]);
    assert_eq!(reopened.get(&paradise.id).await, Some(paradise));
}

#[tokio::test]
async fn test_remove() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);
    let store = LocationStore::open(&path).await.unwrap();
    let loc = store.add(Location::new("Camp Fire", 39.81, -121.44)).await.unwrap();

    assert!(store.remove(&loc.id).await.unwrap());
    assert!(!store.remove(&loc.id).await.unwrap());
    assert!(store.get(&loc.id).await.is_none());

    let reopened = LocationStore::open(&path).await.unwrap();
    assert!(reopened.list().await.is_empty());
}

#[tokio::test]
async fn test_invalid_location_rejected() {
    let dir = TempDir::new().unwrap();
    let store = LocationStore::open(store_path(&dir)).await.unwrap();

    let err = store.add(Location::new("Nowhere", 91.0, 0.0)).await.unwrap_err();
    assert!(matches!(err, LocationStoreError::Invalid(_)));
    let err = store.add(Location::new("  ", 10.0, 10.0)).await.unwrap_err();
    assert_eq!(FireError::from(err).http_status_code(), 400);

    assert!(store.list().await.is_empty());
}

#[tokio::test]
async fn test_corrupt_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("locations.json");
    std::fs::write(&path, b"{ not json").unwrap();

    match LocationStore::open(&path).await {
        Err(LocationStoreError::Corrupt { path: p, .. }) => assert_eq!(p, path),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("corrupt file should not open"),
    }
}
