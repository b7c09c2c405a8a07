//! Encrypted views over a content tree.
//!
//! Embargoed content is stored sealed with the collection's key. These
//! wrappers open on read and seal on write; the key itself comes from the
//! collection keyring.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use embargo_core::SecretKey;

use crate::error::Result;
use crate::traits::{ContentReader, ContentWriter};

/// Opens content read from `inner` with a collection key.
pub struct EncryptedContentReader {
    inner: Arc<dyn ContentReader>,
    key: SecretKey,
}

impl EncryptedContentReader {
    pub fn new(inner: Arc<dyn ContentReader>, key: SecretKey) -> Self {
        Self { inner, key }
    }
}

#[async_trait]
impl ContentReader for EncryptedContentReader {
    async fn read(&self, uri: &str) -> Result<Option<Bytes>> {
        match self.inner.read(uri).await? {
            Some(sealed) => Ok(Some(Bytes::from(self.key.open(&sealed)?))),
            None => Ok(None),
        }
    }

    async fn list_uris(&self) -> Result<Vec<String>> {
        self.inner.list_uris().await
    }
}

/// Seals content with a collection key before writing it to `inner`.
pub struct EncryptedContentWriter {
    inner: Arc<dyn ContentWriter>,
    key: SecretKey,
}

impl EncryptedContentWriter {
    pub fn new(inner: Arc<dyn ContentWriter>, key: SecretKey) -> Self {
        Self { inner, key }
    }
}

#[async_trait]
impl ContentWriter for EncryptedContentWriter {
    async fn write(&self, uri: &str, data: Bytes) -> Result<()> {
        let sealed = self.key.seal(&data)?;
        self.inner.write(uri, Bytes::from(sealed)).await
    }
}
