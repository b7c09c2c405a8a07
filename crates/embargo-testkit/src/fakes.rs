//! Recording test doubles for the collaborator seams.
//!
//! Every fake counts its calls and can be switched to failing, so a test
//! can inject a fault at any stage and check which later stages ran.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;

use embargo::alert::{Alert, Alerter};
use embargo::approval::{
    ApprovalServices, ArchiveCompressor, DataIndex, PdfRenderer, PublishNotification,
    PublishNotifier, RenderedDocument, TimeseriesGenerator, TimeseriesUpdateCommand,
    UpdateCommandImporter,
};
use embargo::Collaborators;
use embargo_content::{ContentReader, ContentWriter};
use embargo_core::{Collection, CollectionDescription, ContentDetail, Session, User};
use embargo_keyring::{PermissionError, PermissionService};
use embargo_store::{CollectionStore, MemoryCollectionStore, StoreError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Call counter plus a failure switch.
#[derive(Debug, Default)]
pub struct Outcome {
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl Outcome {
    /// Make every following call fail.
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn succeed(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Record a call; fails if the switch is on.
    pub fn hit(&self, what: &str) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("injected {} failure", what);
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Alerts and notifications
// ─────────────────────────────────────────────────────────────────────────────

/// Keeps every alert it is asked to send.
#[derive(Debug, Default)]
pub struct RecordingAlerter {
    pub outcome: Outcome,
    alerts: Mutex<Vec<Alert>>,
    broken_channels: Mutex<HashSet<String>>,
}

impl RecordingAlerter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail sends addressed to `channel`.
    pub fn break_channel(&self, channel: impl Into<String>) {
        lock(&self.broken_channels).insert(channel.into());
    }

    /// Every alert sent, including ones that failed to deliver.
    pub fn alerts(&self) -> Vec<Alert> {
        lock(&self.alerts).clone()
    }

    pub fn count(&self) -> usize {
        lock(&self.alerts).len()
    }

    pub fn titled(&self, title: &str) -> Vec<Alert> {
        lock(&self.alerts)
            .iter()
            .filter(|a| a.title == title)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Alerter for RecordingAlerter {
    async fn send(&self, alert: &Alert) -> anyhow::Result<()> {
        lock(&self.alerts).push(alert.clone());
        self.outcome.hit("alert")?;
        if let Some(channel) = &alert.channel {
            if lock(&self.broken_channels).contains(channel) {
                anyhow::bail!("channel {} unavailable", channel);
            }
        }
        Ok(())
    }
}

/// Keeps every publish notification it receives.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub outcome: Outcome,
    notifications: Mutex<Vec<PublishNotification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.outcome.calls()
    }

    pub fn last(&self) -> Option<PublishNotification> {
        lock(&self.notifications).last().cloned()
    }
}

#[async_trait]
impl PublishNotifier for RecordingNotifier {
    async fn notify(&self, notification: &PublishNotification) -> anyhow::Result<()> {
        self.outcome.hit("notify")?;
        lock(&self.notifications).push(notification.clone());
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stage collaborators
// ─────────────────────────────────────────────────────────────────────────────

/// Parses `cdid[,title]` lines. A first line starting with `cdid` is a
/// header and skipped.
#[derive(Debug, Default)]
pub struct CsvCommandImporter {
    pub outcome: Outcome,
}

impl CsvCommandImporter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UpdateCommandImporter for CsvCommandImporter {
    async fn import(&self, data: &[u8]) -> anyhow::Result<Vec<TimeseriesUpdateCommand>> {
        self.outcome.hit("import")?;
        let text = std::str::from_utf8(data)?;

        let mut commands = Vec::new();
        for (n, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || (n == 0 && line.to_lowercase().starts_with("cdid")) {
                continue;
            }
            let mut columns = line.splitn(2, ',');
            let cdid = columns.next().unwrap_or_default().trim();
            let mut command = TimeseriesUpdateCommand::new(cdid);
            if let Some(title) = columns.next() {
                command = command.with_title(title.trim());
            }
            commands.push(command);
        }
        Ok(commands)
    }
}

/// Writes a small page for every resolved command and records what it got.
#[derive(Debug, Default)]
pub struct RecordingTimeseriesGenerator {
    pub outcome: Outcome,
    commands: Mutex<Vec<TimeseriesUpdateCommand>>,
}

impl RecordingTimeseriesGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The commands from every call, in order.
    pub fn commands(&self) -> Vec<TimeseriesUpdateCommand> {
        lock(&self.commands).clone()
    }
}

#[async_trait]
impl TimeseriesGenerator for RecordingTimeseriesGenerator {
    async fn generate(
        &self,
        _published: &dyn ContentReader,
        _compound: &dyn ContentReader,
        writer: &dyn ContentWriter,
        _index: &dyn DataIndex,
        commands: &[TimeseriesUpdateCommand],
    ) -> anyhow::Result<()> {
        self.outcome.hit("time series generation")?;
        lock(&self.commands).extend_from_slice(commands);

        for command in commands {
            let Some(uri) = &command.uri else { continue };
            let page = serde_json::json!({
                "type": "timeseries",
                "description": { "cdid": command.cdid, "title": command.title },
            });
            writer
                .write(&format!("{}/data.json", uri), Bytes::from(page.to_string()))
                .await?;
        }
        Ok(())
    }
}

/// Renders one `page.pdf` per content detail.
#[derive(Debug, Default)]
pub struct RecordingPdfRenderer {
    pub outcome: Outcome,
    rendered: Mutex<Vec<String>>,
}

impl RecordingPdfRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.outcome.calls()
    }

    /// URIs of the documents rendered so far.
    pub fn rendered(&self) -> Vec<String> {
        lock(&self.rendered).clone()
    }
}

#[async_trait]
impl PdfRenderer for RecordingPdfRenderer {
    async fn render(
        &self,
        session: &Session,
        _collection: &Collection,
        details: &[ContentDetail],
    ) -> anyhow::Result<Vec<RenderedDocument>> {
        self.outcome.hit("pdf render")?;
        let documents: Vec<RenderedDocument> = details
            .iter()
            .map(|detail| RenderedDocument {
                uri: format!("{}/page.pdf", detail.uri),
                data: Bytes::from(format!("%PDF {} for {}", detail.uri, session.email)),
            })
            .collect();
        lock(&self.rendered).extend(documents.iter().map(|d| d.uri.clone()));
        Ok(documents)
    }
}

/// An archive compressor that reports a fixed verification result.
#[derive(Debug)]
pub struct StubCompressor {
    pub outcome: Outcome,
    verified: AtomicBool,
}

impl StubCompressor {
    pub fn new() -> Self {
        Self {
            outcome: Outcome::default(),
            verified: AtomicBool::new(true),
        }
    }

    /// Report archives as failing verification.
    pub fn unverified(&self) {
        self.verified.store(false, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.outcome.calls()
    }
}

impl Default for StubCompressor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArchiveCompressor for StubCompressor {
    async fn compress(
        &self,
        _collection: &Collection,
        _reader: &dyn ContentReader,
        _writer: &dyn ContentWriter,
    ) -> anyhow::Result<bool> {
        self.outcome.hit("compression")?;
        Ok(self.verified.load(Ordering::SeqCst))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Permissions and storage
// ─────────────────────────────────────────────────────────────────────────────

/// Permissions granted per user email.
#[derive(Debug, Default)]
pub struct StaticPermissions {
    everyone: bool,
    readers: Mutex<HashSet<String>>,
    editors: Mutex<HashSet<String>>,
    broken: AtomicBool,
}

impl StaticPermissions {
    /// Nobody has access until granted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everyone may read and edit everything.
    pub fn allow_all() -> Self {
        Self {
            everyone: true,
            ..Self::default()
        }
    }

    pub fn grant_access(&self, email: impl Into<String>) {
        lock(&self.readers).insert(email.into());
    }

    /// Editing implies access.
    pub fn grant_edit(&self, email: impl Into<String>) {
        let email = email.into();
        lock(&self.readers).insert(email.clone());
        lock(&self.editors).insert(email);
    }

    /// Make every check fail instead of answering.
    pub fn break_backend(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    fn check(&self, set: &Mutex<HashSet<String>>, user: &User) -> Result<bool, PermissionError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(PermissionError::Backend("permission backend offline".into()));
        }
        Ok(self.everyone || lock(set).contains(&user.email))
    }
}

#[async_trait]
impl PermissionService for StaticPermissions {
    async fn has_access(&self, user: &User, _collection: &Collection) -> Result<bool, PermissionError> {
        self.check(&self.readers, user)
    }

    async fn can_edit(
        &self,
        user: &User,
        _description: &CollectionDescription,
    ) -> Result<bool, PermissionError> {
        self.check(&self.editors, user)
    }
}

/// A memory collection store that records saves and can fail them.
#[derive(Default)]
pub struct FlakyCollectionStore {
    inner: MemoryCollectionStore,
    saves: Mutex<Vec<CollectionDescription>>,
    /// Saves at or past this index fail.
    fail_from: Mutex<Option<usize>>,
}

impl FlakyCollectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let `n` more saves through, then fail every one after.
    pub fn fail_saves_after(&self, n: usize) {
        let done = lock(&self.saves).len();
        *lock(&self.fail_from) = Some(done + n);
    }

    /// Every description offered to `save`, including failed ones.
    pub fn saves(&self) -> Vec<CollectionDescription> {
        lock(&self.saves).clone()
    }

    pub fn save_count(&self) -> usize {
        lock(&self.saves).len()
    }
}

#[async_trait]
impl CollectionStore for FlakyCollectionStore {
    async fn save(&self, description: &CollectionDescription) -> embargo_store::Result<()> {
        let index = {
            let mut saves = lock(&self.saves);
            saves.push(description.clone());
            saves.len() - 1
        };
        let failing = lock(&self.fail_from).is_some_and(|from| index >= from);
        if failing {
            return Err(StoreError::Io(std::io::Error::other("injected save failure")));
        }
        self.inner.save(description).await
    }

    async fn load(&self, collection_id: &str) -> embargo_store::Result<Option<CollectionDescription>> {
        self.inner.load(collection_id).await
    }

    async fn delete(&self, collection_id: &str) -> embargo_store::Result<bool> {
        self.inner.delete(collection_id).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Bundle
// ─────────────────────────────────────────────────────────────────────────────

/// One of every fake, shared by `Arc`.
#[derive(Clone, Default)]
pub struct TestFakes {
    pub collections: Arc<FlakyCollectionStore>,
    pub importer: Arc<CsvCommandImporter>,
    pub timeseries: Arc<RecordingTimeseriesGenerator>,
    pub pdf: Arc<RecordingPdfRenderer>,
    pub compressor: Arc<StubCompressor>,
    pub notifier: Arc<RecordingNotifier>,
    pub alerter: Arc<RecordingAlerter>,
}

impl TestFakes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Approval services wired to these fakes, with the stub compressor.
    pub fn services(&self) -> ApprovalServices {
        ApprovalServices::new(
            self.collections.clone(),
            self.importer.clone(),
            self.timeseries.clone(),
            self.pdf.clone(),
            self.notifier.clone(),
            self.alerter.clone(),
        )
        .with_compressor(self.compressor.clone())
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            importer: self.importer.clone(),
            timeseries: self.timeseries.clone(),
            pdf: self.pdf.clone(),
            notifier: self.notifier.clone(),
            alerter: self.alerter.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_csv_importer_skips_header_and_blanks() {
        let importer = CsvCommandImporter::new();
        let commands = importer
            .import(b"CDID,title\nABCD,Inflation\n\nEFGH\n")
            .await
            .unwrap();

        assert_eq!(
            commands,
            vec![
                TimeseriesUpdateCommand::new("ABCD").with_title("Inflation"),
                TimeseriesUpdateCommand::new("EFGH"),
            ]
        );
    }

    #[tokio::test]
    async fn test_flaky_store_fails_after_budget() {
        let store = FlakyCollectionStore::new();
        let description = CollectionDescription::new("c-1", "One");

        store.fail_saves_after(1);
        store.save(&description).await.unwrap();
        assert!(store.save(&description).await.is_err());
        assert_eq!(store.save_count(), 2);
    }

    #[tokio::test]
    async fn test_outcome_counts_failed_calls() {
        let notifier = RecordingNotifier::new();
        notifier.outcome.fail();

        let notification = PublishNotification {
            collection_id: "c-1".into(),
            publish_date: None,
            uris: vec![],
            deletes: vec![],
        };
        assert!(notifier.notify(&notification).await.is_err());
        assert_eq!(notifier.count(), 1);
        assert!(notifier.last().is_none());
    }
}
