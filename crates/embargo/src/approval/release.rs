//! Default [`ReleasePopulator`]: links collection content into the release page.

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};

use embargo_content::{ContentReader, ContentWriter};
use embargo_core::{Collection, ContentDetail};

use super::collaborators::ReleasePopulator;
use super::resolver::PAGE_FILE;

const DOCUMENT_TYPES: &[&str] = &["article", "article_download", "bulletin", "compendium_landing_page"];
const DATASET_TYPES: &[&str] = &["dataset_landing_page", "timeseries_dataset"];

/// Adds every document in the collection to the release page's
/// `relatedDocuments` and every dataset to `relatedDatasets`.
///
/// Collections without a release URI are left alone. Links already on the
/// page are not duplicated.
#[derive(Debug, Default, Clone)]
pub struct LinkingReleasePopulator;

impl LinkingReleasePopulator {
    pub fn new() -> Self {
        Self
    }
}

fn add_link(page: &mut Value, field: &str, uri: &str) -> anyhow::Result<bool> {
    let object = page
        .as_object_mut()
        .context("release page is not a JSON object")?;
    let links = object
        .entry(field)
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
        .with_context(|| format!("release page {} is not an array", field))?;

    let present = links
        .iter()
        .any(|link| link.get("uri").and_then(Value::as_str) == Some(uri));
    if !present {
        links.push(json!({ "uri": uri }));
    }
    Ok(!present)
}

#[async_trait]
impl ReleasePopulator for LinkingReleasePopulator {
    async fn populate(
        &self,
        collection: &Collection,
        reader: &dyn ContentReader,
        writer: &dyn ContentWriter,
        details: &[ContentDetail],
    ) -> anyhow::Result<()> {
        let Some(release_uri) = collection
            .description
            .as_ref()
            .and_then(|d| d.release_uri.as_deref())
        else {
            return Ok(());
        };

        let page_uri = format!("{}/{}", release_uri.trim_end_matches('/'), PAGE_FILE);
        let data = reader
            .read(&page_uri)
            .await?
            .with_context(|| format!("release page {} not in collection", page_uri))?;
        let mut page: Value = serde_json::from_slice(&data)?;

        let mut added = 0;
        for detail in details {
            let field = if DOCUMENT_TYPES.contains(&detail.content_type.as_str()) {
                "relatedDocuments"
            } else if DATASET_TYPES.contains(&detail.content_type.as_str()) {
                "relatedDatasets"
            } else {
                continue;
            };
            if add_link(&mut page, field, &detail.uri)? {
                added += 1;
            }
        }

        writer
            .write(&page_uri, Bytes::from(serde_json::to_vec_pretty(&page)?))
            .await?;
        tracing::info!(release = %release_uri, links = added, "populated release page");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embargo_content::MemoryContent;
    use embargo_core::CollectionDescription;

    #[tokio::test]
    async fn test_links_documents_and_datasets() {
        let content = MemoryContent::with_items([(
            "/releases/inflation/data.json",
            r#"{"type":"release","relatedDocuments":[{"uri":"/economy/bulletin"}]}"#,
        )])
        .unwrap();

        let mut description = CollectionDescription::new("c-1", "Inflation");
        description.release_uri = Some("/releases/inflation".to_string());
        let collection = Collection::new(description);

        let details = vec![
            ContentDetail::new("/economy/bulletin", "bulletin"),
            ContentDetail::new("/economy/article", "article"),
            ContentDetail::new("/economy/dataset", "dataset_landing_page"),
            ContentDetail::new("/economy/taxonomy", "taxonomy_landing_page"),
        ];

        LinkingReleasePopulator::new()
            .populate(&collection, &content, &content, &details)
            .await
            .unwrap();

        let page: Value = serde_json::from_slice(
            &content.read("/releases/inflation/data.json").await.unwrap().unwrap(),
        )
        .unwrap();
        assert_eq!(
            page["relatedDocuments"],
            json!([{"uri": "/economy/bulletin"}, {"uri": "/economy/article"}])
        );
        assert_eq!(page["relatedDatasets"], json!([{"uri": "/economy/dataset"}]));
    }

    #[tokio::test]
    async fn test_no_release_is_noop() {
        let content = MemoryContent::new();
        let collection = Collection::new(CollectionDescription::new("c-1", "Plain"));

        LinkingReleasePopulator::new()
            .populate(&collection, &content, &content, &[])
            .await
            .unwrap();
        assert!(content.is_empty());
    }
}
