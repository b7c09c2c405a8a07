//! # Embargo Testkit
//!
//! Testing utilities for Embargo.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fakes**: Recording implementations of every collaborator seam, each
//!   of which can be told to fail
//! - **Fixtures**: A ready-to-approve collection with reviewed content
//! - **Generators**: Proptest strategies for collection ids, CDIDs and keyrings
//!
//! ## Approval Harness
//!
//! ```rust
//! use embargo_testkit::fixtures::ApprovalFixture;
//!
//! # async fn example() {
//! let fixture = ApprovalFixture::new();
//! let approved = fixture.task().run().await;
//! assert!(approved);
//! assert_eq!(fixture.fakes.notifier.count(), 1);
//! # }
//! ```

pub mod fakes;
pub mod fixtures;
pub mod generators;

pub use fakes::{
    CsvCommandImporter, FlakyCollectionStore, Outcome, RecordingAlerter, RecordingNotifier,
    RecordingPdfRenderer, RecordingTimeseriesGenerator, StaticPermissions, StubCompressor,
    TestFakes,
};
pub use fixtures::{
    reviewed_pages, user_with_keys, ApprovalFixture, COLLECTION_ID, IMPORT_FILE, KNOWN_CDID,
    KNOWN_TIMESERIES_URI, REVIEWER_EMAIL,
};
pub use generators::{cdid, collection_id, email, keyring_entries, secret_key, KeyringParams};
