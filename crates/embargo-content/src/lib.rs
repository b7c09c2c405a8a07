//! # Embargo Content
//!
//! Byte-level access to content trees addressed by URI.
//!
//! - [`ContentReader`] / [`ContentWriter`] - The two seams everything reads
//!   and writes content through.
//! - [`FsContent`] - A content tree rooted at a filesystem directory.
//! - [`MemoryContent`] - An in-memory tree, for tests.
//! - [`CompoundContentReader`] - An overlay checked before a base tree.
//! - [`EncryptedContentReader`] / [`EncryptedContentWriter`] - Views that
//!   open and seal content with a collection's [`SecretKey`].
//! - [`VersionedContentItem`] - A content item with `previous/vN` versions.
//!
//! URIs are absolute (`/economy/inflation/data.json`). A trailing slash is
//! ignored and `.` or `..` segments are rejected.
//!
//! [`SecretKey`]: embargo_core::SecretKey

pub mod compound;
pub mod encrypted;
pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;
pub mod version;

pub use compound::CompoundContentReader;
pub use encrypted::{EncryptedContentReader, EncryptedContentWriter};
pub use error::{ContentError, Result};
pub use fs::FsContent;
pub use memory::MemoryContent;
pub use traits::{normalize_uri, ContentReader, ContentWriter};
pub use version::{ContentItemVersion, VersionedContentItem, VERSION_DIRECTORY};
