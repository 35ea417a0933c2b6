//! Store-root path handling and safe I/O for the Ghost store
//!
//! Provides logical-path normalization, store-root-bound resolution with
//! traversal protection, and atomic write primitives.

pub mod checksum;
pub mod error;
pub mod io;
pub mod path;
pub mod resolver;

pub use error::{Error, Result};
pub use path::LogicalPath;
pub use resolver::PathResolver;
