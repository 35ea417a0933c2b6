//! Pluggable versioned content storage for bot file trees
//!
//! The Ghost store persists and synchronizes a tree of named files (bot
//! configuration, conversational content, trained models) across backing
//! stores and cluster nodes. Every backend implements the same
//! [`StorageDriver`] contract: logical-path file operations, recursive
//! directory enumeration with glob exclusions, trackable-folder discovery
//! honoring `.noghost` opt-out markers, per-prefix revision history, and
//! portable archive transfer.
//!
//! # Architecture
//!
//! `ghost-store` sits above `ghost-fs` and below the content-management and
//! synchronization services:
//!
//! ```text
//!   content manager / sync service
//!               |
//!         StorageDriver
//!          /         \
//!   DiskStorageDriver  MemoryStorageDriver
//!               |
//!           ghost-fs
//! ```
//!
//! # Example
//!
//! ```no_run
//! use ghost_store::{DiskStorageDriver, StorageDriver};
//!
//! # async fn example() -> ghost_store::Result<()> {
//! let driver = DiskStorageDriver::bind("/var/lib/ghost")?;
//! driver.upsert_file("bots/welcome/bot.config.json", b"{}".to_vec(), true).await?;
//! let _content = driver.read_file("bots/welcome/bot.config.json").await?;
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod disk;
pub mod driver;
pub mod error;
pub mod logging;
pub mod memory;
pub mod revision;
pub mod scanner;

pub use archive::ArchiveCodec;
pub use disk::DiskStorageDriver;
pub use driver::{ListingOptions, StorageDriver};
pub use error::{Error, Result};
pub use memory::MemoryStorageDriver;
pub use revision::{FileRevision, RevisionLedger, REVISIONS_FILE};
pub use scanner::{discover_trackable_folders_in, NOGHOST_MARKER};
