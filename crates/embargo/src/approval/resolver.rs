//! Default [`ContentDetailResolver`]: reads each page's `data.json`.

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use embargo_content::ContentReader;
use embargo_core::ContentDetail;

use super::collaborators::ContentDetailResolver;

pub const PAGE_FILE: &str = "data.json";

#[derive(Debug, Deserialize)]
struct PageJson {
    #[serde(rename = "type", default)]
    page_type: String,
    #[serde(default)]
    description: Option<PageDescription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageDescription {
    title: Option<String>,
    release_date: Option<String>,
}

/// Resolves every reviewed `<uri>/data.json` to a [`ContentDetail`] for `<uri>`.
///
/// Reviewed files that are not page JSON (CSV, images) are skipped.
#[derive(Debug, Default, Clone)]
pub struct JsonContentDetailResolver;

impl JsonContentDetailResolver {
    pub fn new() -> Self {
        Self
    }
}

/// The page URI of a `data.json` file URI.
pub fn page_uri(file_uri: &str) -> Option<&str> {
    let parent = file_uri.strip_suffix(PAGE_FILE)?.strip_suffix('/')?;
    Some(if parent.is_empty() { "/" } else { parent })
}

#[async_trait]
impl ContentDetailResolver for JsonContentDetailResolver {
    async fn resolve(
        &self,
        reviewed: &[String],
        reader: &dyn ContentReader,
    ) -> anyhow::Result<Vec<ContentDetail>> {
        let mut details = Vec::new();

        for file_uri in reviewed {
            let Some(uri) = page_uri(file_uri) else {
                continue;
            };

            let data = reader
                .read(file_uri)
                .await
                .with_context(|| format!("reading {}", file_uri))?
                .with_context(|| format!("reviewed page {} not found", file_uri))?;
            let page: PageJson = serde_json::from_slice(&data)
                .with_context(|| format!("parsing {}", file_uri))?;

            let mut detail = ContentDetail::new(uri, page.page_type);
            if let Some(description) = page.description {
                detail.title = description.title;
                detail.release_date = description.release_date;
            }
            details.push(detail);
        }

        tracing::debug!(items = details.len(), "resolved content details");
        Ok(details)
    }
}
