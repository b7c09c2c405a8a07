//! # Embargo
//!
//! Approval and publishing of embargoed content collections.
//!
//! ## Overview
//!
//! Content is staged into a *collection* and kept encrypted at rest under a
//! per-collection key until it is approved for publication. This crate ties
//! the pieces together:
//!
//! - **Keyring**: custody of collection keys, gated by permission checks
//! - **Approval**: the pipeline that turns reviewed content into a
//!   publishable collection, with failure recovery and alerting
//! - **Versions**: snapshots of published content items (in `content`)
//! - **Scheduling**: a bounded worker pool for approval runs
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use embargo::{Collaborators, Config, Embargo};
//! # use embargo::keyring::PermissionService;
//!
//! # async fn example(permissions: Arc<dyn PermissionService>, collaborators: Collaborators) {
//! let config = Config::load("embargo.toml").unwrap();
//! embargo::logging::init(&config.logging).unwrap();
//!
//! let service = Embargo::open(config, permissions, collaborators).unwrap();
//! service.install_keyring(embargo::keyring::global());
//!
//! // Lock the publishing queue until an administrator logs in.
//! service.start().await;
//! # }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `embargo::core` - Data model (collections, users, keys)
//! - `embargo::store` - Key and collection description storage
//! - `embargo::keyring` - Collection key custody
//! - `embargo::content` - Content trees, encryption and versioning

pub mod alert;
pub mod approval;
pub mod config;
pub mod error;
pub mod logging;
pub mod scheduler;
pub mod service;
pub mod startup;

// Re-export component crates
pub use embargo_content as content;
pub use embargo_core as core;
pub use embargo_keyring as keyring;
pub use embargo_store as store;

// Re-export main types for convenience
pub use alert::{send_quietly, Alert, AlertField, Alerter, Severity, TracingAlerter};
pub use approval::{ApprovalContent, ApprovalServices, ApproveTask};
pub use config::{Config, ConfigError};
pub use error::{ApprovalError, EmbargoError, InvalidArgument, Result, SchedulerError};
pub use scheduler::ApprovalScheduler;
pub use service::{
    Collaborators, Embargo, COMPLETE_DIRECTORY, IN_PROGRESS_DIRECTORY, REVIEWED_DIRECTORY,
};
pub use startup::StartupAlerter;

// Re-export commonly used core types
pub use embargo_content::{ContentItemVersion, VersionedContentItem};
pub use embargo_core::{
    ApprovalStatus, Collection, CollectionDescription, SecretKey, Session, User, UserKeyring,
};
pub use embargo_keyring::{CollectionKeyring, KeyringSlot};
