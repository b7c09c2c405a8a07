//! Test fixtures and helpers.
//!
//! [`ApprovalFixture`] stages a collection the way the service would: its
//! reviewed content and import files sealed under the collection key, a
//! published tree beside it, and a data index covering one CDID.

use std::sync::Arc;

use bytes::Bytes;

use embargo::approval::{ApprovalContent, ApproveTask, MemoryDataIndex};
use embargo_content::{
    ContentReader, EncryptedContentReader, EncryptedContentWriter, MemoryContent,
};
use embargo_core::{Collection, CollectionDescription, SecretKey, Session, User, UserKeyring};

use crate::fakes::TestFakes;

pub const COLLECTION_ID: &str = "inflation-march";
pub const REVIEWER_EMAIL: &str = "reviewer@example.com";

/// CDID present in the fixture's data index.
pub const KNOWN_CDID: &str = "D7G7";
/// URI the data index maps [`KNOWN_CDID`] to.
pub const KNOWN_TIMESERIES_URI: &str = "/economy/inflation/timeseries/d7g7";
/// Import file attached to the fixture collection.
pub const IMPORT_FILE: &str = "updates.csv";

/// Reviewed pages staged in the fixture, as `(file uri, json)`.
pub fn reviewed_pages() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "/economy/inflation/bulletins/cpi/march/data.json",
            r#"{"type":"bulletin","description":{"title":"Consumer price inflation","releaseDate":"2026-04-15"}}"#,
        ),
        (
            "/economy/inflation/datasets/mm23/data.json",
            r#"{"type":"dataset_landing_page","description":{"title":"Consumer price inflation dataset"}}"#,
        ),
    ]
}

/// A collection ready to approve, plus everything an approval touches.
pub struct ApprovalFixture {
    pub fakes: TestFakes,
    pub key: SecretKey,
    pub description: CollectionDescription,
    /// Sealed bytes, as they would sit on disk.
    pub root: Arc<MemoryContent>,
    pub reviewed: Arc<MemoryContent>,
    pub published: Arc<MemoryContent>,
    pub index: MemoryDataIndex,
    pub session: Session,
}

impl ApprovalFixture {
    pub fn new() -> Self {
        let key = SecretKey::generate();

        let seal = |data: &[u8]| -> Bytes {
            Bytes::from(key.seal(data).expect("sealing fixture content"))
        };

        let reviewed = MemoryContent::with_items(
            reviewed_pages()
                .into_iter()
                .map(|(uri, json)| (uri, seal(json.as_bytes()))),
        )
        .expect("fixture uris are valid");

        let csv = format!("cdid,title\n{},CPI annual rate\nZZZZ,Unknown series\n", KNOWN_CDID);
        let root = MemoryContent::with_items([(IMPORT_FILE, seal(csv.as_bytes()))])
            .expect("fixture uris are valid");

        let published = MemoryContent::with_items([(
            "/economy/inflation/timeseries/d7g7/data.json",
            Bytes::from_static(br#"{"type":"timeseries","description":{"cdid":"D7G7"}}"#),
        )])
        .expect("fixture uris are valid");

        let mut description = CollectionDescription::new(COLLECTION_ID, "Inflation, March");
        description.timeseries_import_files = vec![IMPORT_FILE.to_string()];

        Self {
            fakes: TestFakes::new(),
            key,
            description,
            root: Arc::new(root),
            reviewed: Arc::new(reviewed),
            published: Arc::new(published),
            index: [(KNOWN_CDID, KNOWN_TIMESERIES_URI)].into_iter().collect(),
            session: Session::new("session-1", REVIEWER_EMAIL),
        }
    }

    /// The collection with every staged item marked reviewed.
    pub fn collection(&self) -> Collection {
        Collection::new(self.description.clone())
            .with_reviewed(reviewed_pages().into_iter().map(|(uri, _)| uri))
    }

    /// Encrypted views over the fixture's trees.
    pub fn content(&self) -> ApprovalContent {
        ApprovalContent {
            collection_root: Arc::new(EncryptedContentReader::new(self.root.clone(), self.key.clone())),
            reviewed_reader: Arc::new(EncryptedContentReader::new(
                self.reviewed.clone(),
                self.key.clone(),
            )),
            reviewed_writer: Arc::new(EncryptedContentWriter::new(
                self.reviewed.clone(),
                self.key.clone(),
            )),
            published: self.published.clone(),
        }
    }

    /// A task approving the fixture collection with the fake services.
    pub fn task(&self) -> ApproveTask {
        ApproveTask::new(
            Some(self.collection()),
            Some(self.session.clone()),
            self.content(),
            Arc::new(self.index.clone()),
            Arc::new(self.fakes.services()),
        )
    }

    /// The stored description after a run.
    pub async fn stored(&self) -> Option<CollectionDescription> {
        use embargo_store::CollectionStore;
        self.fakes
            .collections
            .load(COLLECTION_ID)
            .await
            .expect("memory store does not fail loads")
    }

    /// Read and decrypt a reviewed item.
    pub async fn read_reviewed(&self, uri: &str) -> Option<Bytes> {
        EncryptedContentReader::new(self.reviewed.clone(), self.key.clone())
            .read(uri)
            .await
            .expect("fixture content decrypts")
    }
}

impl Default for ApprovalFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A user whose unlocked keyring holds `keys`.
pub fn user_with_keys<I>(email: &str, keys: I) -> User
where
    I: IntoIterator<Item = (String, SecretKey)>,
{
    let mut keyring = UserKeyring::unlocked();
    for (collection_id, key) in keys {
        keyring.put(collection_id, key);
    }
    User::new(email).with_keyring(keyring)
}
