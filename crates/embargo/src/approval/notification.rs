//! Building the publish notification.

use std::collections::HashSet;

use embargo_core::{CollectionDescription, ContentDetail};

use super::collaborators::PublishNotification;

/// Path segment that marks a versioned copy of a page.
const PREVIOUS_SEGMENT: &str = "/previous/";

/// Whether `uri` lies inside a versioned copy of some item.
pub(crate) fn is_previous_version(uri: &str) -> bool {
    uri.contains(PREVIOUS_SEGMENT)
}

/// The URIs to publish and the content to delete for a collection.
///
/// `uris` is the reviewed content listing: versioned `/previous/` copies are
/// dropped and the rest sorted. Deletes come from walking every pending
/// delete root and keeping the first node seen for each URI.
pub fn build_publish_notification(
    description: &CollectionDescription,
    uris: Vec<String>,
) -> PublishNotification {
    let mut uris: Vec<String> = uris
        .into_iter()
        .filter(|uri| !is_previous_version(uri))
        .collect();
    uris.sort();
    uris.dedup();

    let mut seen = HashSet::new();
    let mut deletes = Vec::new();
    for pending in &description.pending_deletes {
        pending.root.walk(&mut |node: &ContentDetail| {
            if seen.insert(node.uri.clone()) {
                tracing::debug!(collection_id = %description.id, uri = %node.uri, "adding uri to delete");
                deletes.push(ContentDetail::new(node.uri.clone(), node.content_type.clone()));
            }
        });
    }

    PublishNotification {
        collection_id: description.id.clone(),
        publish_date: description.publish_date,
        uris,
        deletes,
    }
}
