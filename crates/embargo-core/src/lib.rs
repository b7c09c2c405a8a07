//! # Embargo Core
//!
//! Pure data model for Embargo: collections awaiting approval, their event
//! logs, the identities that act on them, and the per-collection secret keys
//! that protect embargoed content at rest.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Collection`] - A batch of staged content plus its persisted description
//! - [`CollectionDescription`] - The persisted record (status, events, deletes)
//! - [`ApprovalStatus`] - The collection's workflow state
//! - [`SecretKey`] - 256-bit symmetric key, one per collection
//! - [`User`], [`Session`], [`UserKeyring`] - Principals and their key material

pub mod collection;
pub mod crypto;
pub mod error;
pub mod event;
pub mod identity;

pub use collection::{
    ApprovalStatus, Collection, CollectionDescription, CollectionType, ContentDetail,
    PendingDelete,
};
pub use crypto::{SecretKey, KEY_LEN, NONCE_LEN};
pub use error::{CoreError, Result};
pub use event::{error_chain, now_millis, Event, EventType};
pub use identity::{Session, User, UserKeyring};
