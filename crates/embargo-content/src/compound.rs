//! Overlay-then-base reader.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::traits::ContentReader;

/// Reads from `overlay` first and falls back to `base`.
///
/// Used so a collection's pending changes take precedence over the
/// published tree they will replace.
#[derive(Clone)]
pub struct CompoundContentReader {
    overlay: Arc<dyn ContentReader>,
    base: Arc<dyn ContentReader>,
}

impl CompoundContentReader {
    pub fn new(overlay: Arc<dyn ContentReader>, base: Arc<dyn ContentReader>) -> Self {
        Self { overlay, base }
    }
}

#[async_trait]
impl ContentReader for CompoundContentReader {
    async fn read(&self, uri: &str) -> Result<Option<Bytes>> {
        match self.overlay.read(uri).await? {
            Some(data) => Ok(Some(data)),
            None => self.base.read(uri).await,
        }
    }

    async fn list_uris(&self) -> Result<Vec<String>> {
        let mut uris: BTreeSet<String> = self.base.list_uris().await?.into_iter().collect();
        uris.extend(self.overlay.list_uris().await?);
        Ok(uris.into_iter().collect())
    }
}
