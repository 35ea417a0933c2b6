//! End-to-end synchronization scenario between two nodes.
//!
//! Node A owns the authoritative tree; node B receives it through the
//! archive path, the same way the sync service moves content between
//! cluster members or backends.

use ghost_fs::checksum::compute_content_checksum;
use ghost_store::{
    DiskStorageDriver, ListingOptions, MemoryStorageDriver, StorageDriver,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

async fn seed_bot_tree(driver: &dyn StorageDriver) {
    let files: &[(&str, &[u8])] = &[
        ("bots/welcome/bot.config.json", b"{\"id\":\"welcome\"}"),
        ("bots/welcome/flows/main.flow.json", b"{\"nodes\":[]}"),
        ("bots/welcome/models/intent.model", b"\x00\x01\x02\x03"),
        ("bots/archived/bot.config.json", b"{\"id\":\"archived\"}"),
        ("bots/archived/.noghost", b""),
    ];
    for (path, content) in files {
        driver
            .upsert_file(path, content.to_vec(), true)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn full_sync_between_disk_nodes() {
    let root_a = TempDir::new().unwrap();
    let root_b = TempDir::new().unwrap();
    let node_a = DiskStorageDriver::bind(root_a.path()).unwrap().with_author("node-a");
    let node_b = DiskStorageDriver::bind(root_b.path()).unwrap();

    seed_bot_tree(&node_a).await;

    // Scope: the opt-out marker keeps "archived" out of the session
    let trackable = node_a.discover_trackable_folders("bots").await;
    assert_eq!(trackable.len(), 1);
    assert!(trackable.contains("welcome"));

    for folder in &trackable {
        let source = format!("bots/{folder}");
        let members: Vec<String> = node_a
            .directory_listing(
                &source,
                ListingOptions::new()
                    .exclude("revisions.json")
                    .exclude("**/revisions.json"),
            )
            .await
            .unwrap()
            .iter()
            .map(|p| p.as_str().to_string())
            .collect();

        let archive = node_a
            .create_archive(&format!("sync-{folder}"), &source, &members)
            .await
            .unwrap();
        node_b.extract_archive(&archive, &source).await.unwrap();
    }

    // Byte-identical content on the receiving node
    for path in [
        "bots/welcome/bot.config.json",
        "bots/welcome/flows/main.flow.json",
        "bots/welcome/models/intent.model",
    ] {
        let original = node_a.read_file(path).await.unwrap();
        let replica = node_b.read_file(path).await.unwrap();
        assert_eq!(
            compute_content_checksum(&original),
            compute_content_checksum(&replica),
            "drift at {path}"
        );
    }

    // The opted-out bot never travelled
    assert!(!node_b.file_exists("bots/archived/bot.config.json").await.unwrap());
}

#[tokio::test]
async fn disk_to_memory_transfer_preserves_content() {
    let root = TempDir::new().unwrap();
    let disk = DiskStorageDriver::bind(root.path()).unwrap();
    let memory = MemoryStorageDriver::new();

    seed_bot_tree(&disk).await;

    let members = vec![
        "bot.config.json".to_string(),
        "flows/main.flow.json".to_string(),
    ];
    let archive = disk
        .create_archive("handoff", "bots/welcome", &members)
        .await
        .unwrap();
    let extracted = memory
        .extract_archive(&archive, "bots/welcome")
        .await
        .unwrap();

    assert_eq!(extracted.len(), 2);
    assert_eq!(
        memory.read_file("bots/welcome/bot.config.json").await.unwrap(),
        disk.read_file("bots/welcome/bot.config.json").await.unwrap()
    );
}

#[tokio::test]
async fn memory_to_disk_transfer_preserves_content() {
    let memory = MemoryStorageDriver::new();
    memory
        .upsert_file("bots/draft/bot.config.json", b"{\"draft\":true}".to_vec(), false)
        .await
        .unwrap();

    let archive = memory
        .create_archive("promote", "bots/draft", &["bot.config.json".to_string()])
        .await
        .unwrap();

    let root = TempDir::new().unwrap();
    let disk = DiskStorageDriver::bind(root.path()).unwrap();
    disk.extract_archive(&archive, "bots/draft").await.unwrap();

    assert_eq!(
        disk.read_file("bots/draft/bot.config.json").await.unwrap(),
        b"{\"draft\":true}"
    );
}

#[tokio::test]
async fn revision_history_survives_on_the_source_node() {
    let root = TempDir::new().unwrap();
    let node = DiskStorageDriver::bind(root.path()).unwrap().with_author("node-a");

    seed_bot_tree(&node).await;

    let revisions = node.list_revisions("bots/welcome").await.unwrap();
    assert_eq!(revisions.len(), 1);
    assert_eq!(revisions[0].path, "bots/welcome/bot.config.json");
    assert_eq!(revisions[0].author.as_deref(), Some("node-a"));

    let flow_revisions = node.list_revisions("bots/welcome/flows").await.unwrap();
    assert_eq!(flow_revisions.len(), 1);
}
