//! Handle lifetime tests for the blob conversion layer.

use std::collections::HashMap;

use bananalab_thumbnails::{
    conversion_stats, fallback_thumbnail, BlobStore, BlobUrlConverter, BLOB_URL_PREFIX,
};

fn thumbnails(pages: usize) -> HashMap<String, String> {
    let png = fallback_thumbnail(4, 3, [255, 0, 0, 255]).unwrap();
    let mut map: HashMap<String, String> = (0..pages)
        .map(|i| (format!("page-{i}"), png.clone()))
        .collect();
    map.insert("remote".into(), "https://cdn.example.com/p.png".into());
    map
}

#[tokio::test]
async fn test_repeated_mount_unmount_leaks_no_handles() {
    let store = BlobStore::new();
    let input = thumbnails(8);

    for _ in 0..25 {
        let mut converter = BlobUrlConverter::new(store.clone());
        let converted = converter.convert_all(&input).await;
        assert_eq!(converter.handle_count(), 8);
        assert_eq!(store.live_handles(), 8);
        assert_eq!(converted["remote"], "https://cdn.example.com/p.png");
        // Unmount
        drop(converter);
        assert_eq!(store.live_handles(), 0);
    }
}

#[tokio::test]
async fn test_cleanup_all_revokes_every_handle() {
    let store = BlobStore::new();
    let mut converter = BlobUrlConverter::new(store.clone());
    let converted = converter.convert_all(&thumbnails(3)).await;

    let handles: Vec<&String> = converted
        .values()
        .filter(|v| v.starts_with(BLOB_URL_PREFIX))
        .collect();
    assert_eq!(handles.len(), 3);
    for url in &handles {
        let blob = store.resolve(url).unwrap();
        assert_eq!(blob.mime, "image/png");
    }

    converter.cleanup_all();

    assert_eq!(converter.handle_count(), 0);
    assert_eq!(store.live_handles(), 0);
    for url in handles {
        assert!(store.resolve(url).is_none());
    }
}

#[tokio::test]
async fn test_reconverting_replaces_instead_of_accumulating() {
    let store = BlobStore::new();
    let mut converter = BlobUrlConverter::new(store.clone());
    let input = thumbnails(4);

    for _ in 0..10 {
        converter.convert_all(&input).await;
    }

    assert_eq!(store.live_handles(), 4);
}

#[tokio::test]
async fn test_undecodable_entry_keeps_original_value() {
    let store = BlobStore::new();
    let mut converter = BlobUrlConverter::new(store.clone());
    let mut input = thumbnails(1);
    input.insert("broken".into(), "data:image/png;base64,%%%".into());

    let converted = converter.convert_all(&input).await;

    assert_eq!(converted["broken"], "data:image/png;base64,%%%");
    assert_eq!(store.live_handles(), 1);

    let stats = conversion_stats(&converted);
    assert_eq!(stats.data_urls, 1);
    assert_eq!(stats.object_urls, 1);
    assert_eq!(stats.other, 1);
    assert_eq!(stats.conversion_rate, 50.0);
}
