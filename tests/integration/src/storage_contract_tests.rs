//! Contract suite: every backend must present identical semantics.
//!
//! Each property runs against both concrete drivers through the trait
//! object, so a backend-specific shortcut that bends the contract fails
//! here rather than in a caller.

use std::collections::HashSet;
use std::sync::Arc;

use ghost_store::{
    DiskStorageDriver, Error, ListingOptions, MemoryStorageDriver, StorageDriver,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

/// Both backends, each bound to a fresh root. The TempDir keeps the disk
/// root alive for the duration of a test.
fn all_backends() -> Vec<(&'static str, Option<TempDir>, Arc<dyn StorageDriver>)> {
    let disk_root = TempDir::new().unwrap();
    let disk: Arc<dyn StorageDriver> =
        Arc::new(DiskStorageDriver::bind(disk_root.path()).unwrap());
    let memory: Arc<dyn StorageDriver> = Arc::new(MemoryStorageDriver::new());
    vec![("disk", Some(disk_root), disk), ("memory", None, memory)]
}

#[tokio::test]
async fn upsert_then_read_round_trips() {
    for (name, _root, driver) in all_backends() {
        let content = b"{\"hello\":\"world\"}".to_vec();
        driver
            .upsert_file("bots/welcome/bot.config.json", content.clone(), false)
            .await
            .unwrap();
        assert_eq!(
            driver.read_file("bots/welcome/bot.config.json").await.unwrap(),
            content,
            "backend: {name}"
        );
    }
}

#[tokio::test]
async fn missing_file_reads_as_not_found() {
    for (name, _root, driver) in all_backends() {
        let err = driver.read_file("absent.txt").await.unwrap_err();
        assert!(err.is_not_found(), "backend: {name}, got: {err}");
    }
}

#[tokio::test]
async fn listing_of_absent_folder_is_empty() {
    for (name, _root, driver) in all_backends() {
        let listing = driver
            .directory_listing("never/created", ListingOptions::new())
            .await
            .unwrap();
        assert!(listing.is_empty(), "backend: {name}");
    }
}

#[tokio::test]
async fn listings_agree_across_backends() {
    let files: &[(&str, &[u8])] = &[
        ("bots/welcome/bot.config.json", b"{}"),
        ("bots/welcome/flows/main.flow.json", b"{}"),
        ("bots/welcome/.hidden", b""),
        ("bots/welcome/script.js", b";"),
    ];

    let mut results = Vec::new();
    for (name, _root, driver) in all_backends() {
        for (path, content) in files {
            driver
                .upsert_file(path, content.to_vec(), false)
                .await
                .unwrap();
        }
        let listing = driver
            .directory_listing(
                "bots/welcome",
                ListingOptions::new().exclude("**/*.js").exclude("*.js"),
            )
            .await
            .unwrap();
        let as_strings: Vec<String> =
            listing.iter().map(|p| p.as_str().to_string()).collect();
        results.push((name, as_strings));
    }

    for (name, listing) in &results {
        assert_eq!(
            listing,
            &vec![
                "bot.config.json".to_string(),
                "flows/main.flow.json".to_string()
            ],
            "backend: {name}"
        );
    }
}

#[tokio::test]
async fn trackable_folders_agree_across_backends() {
    for (name, _root, driver) in all_backends() {
        driver
            .upsert_file("a/x.txt", b"x".to_vec(), false)
            .await
            .unwrap();
        driver
            .upsert_file("b/y.txt", b"y".to_vec(), false)
            .await
            .unwrap();
        driver
            .upsert_file("b/deep/.noghost", Vec::new(), false)
            .await
            .unwrap();

        let folders = driver.discover_trackable_folders("").await;
        assert_eq!(
            folders,
            HashSet::from(["a".to_string()]),
            "backend: {name}"
        );
    }
}

#[tokio::test]
async fn revision_history_is_insertion_ordered() {
    for (name, _root, driver) in all_backends() {
        assert!(
            driver.list_revisions("bots").await.unwrap().is_empty(),
            "backend: {name}"
        );

        driver
            .upsert_file("bots/bot.config.json", b"v1".to_vec(), true)
            .await
            .unwrap();
        driver
            .upsert_file("bots/bot.config.json", b"v2".to_vec(), true)
            .await
            .unwrap();

        let revisions = driver.list_revisions("bots").await.unwrap();
        assert_eq!(revisions.len(), 2, "backend: {name}");
        assert_ne!(
            revisions[0].revision_id, revisions[1].revision_id,
            "backend: {name}"
        );
        assert!(
            revisions[0].timestamp <= revisions[1].timestamp,
            "backend: {name}"
        );
    }
}

#[tokio::test]
async fn delete_revision_capability_is_detectable() {
    let (_, _root, memory) = all_backends().remove(1);
    let err = memory
        .delete_revision("bots/bot.config.json", "some-id")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotImplemented { .. }));

    let disk_root = TempDir::new().unwrap();
    let disk = DiskStorageDriver::bind(disk_root.path()).unwrap();
    disk.upsert_file("bots/bot.config.json", b"v1".to_vec(), true)
        .await
        .unwrap();
    let revision = disk.list_revisions("bots").await.unwrap().remove(0);
    disk.delete_revision("bots/bot.config.json", &revision.revision_id)
        .await
        .unwrap();
    assert!(disk.list_revisions("bots").await.unwrap().is_empty());
}

#[tokio::test]
async fn archive_round_trip_holds_on_every_backend() {
    for (name, _root, driver) in all_backends() {
        driver
            .upsert_file("bots/welcome/p1.json", b"one".to_vec(), false)
            .await
            .unwrap();
        driver
            .upsert_file("bots/welcome/sub/p2.json", b"two".to_vec(), false)
            .await
            .unwrap();

        let archive = driver
            .create_archive(
                "snapshot",
                "bots/welcome",
                &["p1.json".to_string(), "sub/p2.json".to_string()],
            )
            .await
            .unwrap();
        let extracted = driver.extract_archive(&archive, "restore").await.unwrap();

        let as_strings: Vec<&str> = extracted.iter().map(|p| p.as_str()).collect();
        assert_eq!(as_strings, vec!["p1.json", "sub/p2.json"], "backend: {name}");
        assert_eq!(
            driver.read_file("restore/p1.json").await.unwrap(),
            b"one",
            "backend: {name}"
        );
        assert_eq!(
            driver.read_file("restore/sub/p2.json").await.unwrap(),
            b"two",
            "backend: {name}"
        );
    }
}

#[tokio::test]
async fn concurrent_upserts_on_distinct_paths_are_independent() {
    for (name, _root, driver) in all_backends() {
        let mut handles = Vec::new();
        for i in 0..8 {
            let driver = driver.clone();
            handles.push(tokio::spawn(async move {
                driver
                    .upsert_file(
                        &format!("bots/b{i}/config.json"),
                        format!("{i}").into_bytes(),
                        false,
                    )
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for i in 0..8 {
            assert_eq!(
                driver
                    .read_file(&format!("bots/b{i}/config.json"))
                    .await
                    .unwrap(),
                format!("{i}").into_bytes(),
                "backend: {name}"
            );
        }
    }
}
