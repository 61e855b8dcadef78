//! Integration tests for the content-addressed media store on disk.

use freshmall_storefront::storage::{MediaStorage, file_id};

#[tokio::test]
async fn test_same_bytes_stored_once() {
    let dir = tempfile::tempdir().unwrap();
    let storage = MediaStorage::new(dir.path(), "/media");

    let first = storage.save("berry.jpg", b"strawberry").await.unwrap();
    let second = storage.save("other-name.jpg", b"strawberry").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first, file_id("berry.jpg", b"strawberry"));
    assert!(storage.exists(&first).await.unwrap());
    assert!(dir.path().join(&first).is_file());
}

#[tokio::test]
async fn test_different_bytes_get_different_ids() {
    let dir = tempfile::tempdir().unwrap();
    let storage = MediaStorage::new(dir.path(), "/media");

    let a = storage.save("a.png", b"apple").await.unwrap();
    let b = storage.save("b.png", b"banana").await.unwrap();

    assert_ne!(a, b);
    assert_eq!(storage.url(&a), format!("/media/{a}"));
}

#[tokio::test]
async fn test_empty_upload_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let storage = MediaStorage::new(dir.path(), "/media");

    assert!(storage.save("empty.jpg", b"").await.is_err());
}
