//! The permission seam consulted before any key leaves the keyring.

use async_trait::async_trait;
use embargo_core::{Collection, CollectionDescription, User};

use crate::error::PermissionError;

/// Answers access questions about collections.
///
/// `Ok(false)` is a denial; `Err` means the question could not be answered
/// and is surfaced to keyring callers as
/// [`KeyringError::PermissionCheckFailed`](crate::KeyringError::PermissionCheckFailed).
#[async_trait]
pub trait PermissionService: Send + Sync {
    /// Whether the user may read the collection's content.
    async fn has_access(
        &self,
        user: &User,
        collection: &Collection,
    ) -> std::result::Result<bool, PermissionError>;

    /// Whether the user may edit the collection. Stricter than access.
    async fn can_edit(
        &self,
        user: &User,
        description: &CollectionDescription,
    ) -> std::result::Result<bool, PermissionError>;
}
