//! The service facade: one place that owns the keyring, the stores, the
//! approval pool and the start-up alerter.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinHandle;

use embargo_content::{ContentReader, EncryptedContentReader, EncryptedContentWriter, FsContent};
use embargo_core::{
    ApprovalStatus, Collection, CollectionDescription, Event, EventType, SecretKey, Session, User,
};
use embargo_keyring::{
    CollectionKeyring, KeyringError, KeyringSlot, PermissionService, StoreBackedCache,
};
use embargo_store::{CollectionStore, JsonCollectionStore, SecretKeyStore, SqliteKeyStore};

use crate::alert::Alerter;
use crate::approval::{
    ApprovalContent, ApprovalServices, ApproveTask, DataIndex, PdfRenderer, PublishNotifier,
    TimeseriesGenerator, UpdateCommandImporter, ZipTimeseriesCompressor,
};
use crate::config::Config;
use crate::error::{EmbargoError, Result, SchedulerError};
use crate::scheduler::ApprovalScheduler;
use crate::startup::StartupAlerter;

/// Directory under a collection holding its reviewed content.
pub const REVIEWED_DIRECTORY: &str = "reviewed";
/// Items still being edited.
pub const IN_PROGRESS_DIRECTORY: &str = "inprogress";
/// Items finished and waiting for a reviewer.
pub const COMPLETE_DIRECTORY: &str = "complete";

/// External collaborators the service cannot provide itself.
#[derive(Clone)]
pub struct Collaborators {
    pub importer: Arc<dyn UpdateCommandImporter>,
    pub timeseries: Arc<dyn TimeseriesGenerator>,
    pub pdf: Arc<dyn PdfRenderer>,
    pub notifier: Arc<dyn PublishNotifier>,
    pub alerter: Arc<dyn Alerter>,
}

pub struct Embargo {
    config: Config,
    key_cache: Arc<StoreBackedCache>,
    keyring: Arc<CollectionKeyring>,
    permissions: Arc<dyn PermissionService>,
    services: Arc<ApprovalServices>,
    scheduler: ApprovalScheduler,
    startup: StartupAlerter,
}

impl Embargo {
    /// Wire the service from explicit parts.
    pub fn new(
        config: Config,
        key_store: Arc<dyn SecretKeyStore>,
        permissions: Arc<dyn PermissionService>,
        services: ApprovalServices,
    ) -> Self {
        let key_cache = Arc::new(StoreBackedCache::new(key_store));
        let keyring = Arc::new(CollectionKeyring::new(key_cache.clone(), permissions.clone()));
        let scheduler = ApprovalScheduler::new(config.approval.workers);
        let startup = StartupAlerter::new(services.alerter.clone(), config.alerts.channels.clone());

        Self {
            config,
            key_cache,
            keyring,
            permissions,
            services: Arc::new(services),
            scheduler,
            startup,
        }
    }

    /// Open the stores named by `config` and wire the service.
    pub fn open(
        config: Config,
        permissions: Arc<dyn PermissionService>,
        collaborators: Collaborators,
    ) -> Result<Self> {
        let key_store = match &config.storage.key_database {
            Some(path) => SqliteKeyStore::open(path)?,
            None => SqliteKeyStore::open_memory()?,
        };
        let collections = Arc::new(JsonCollectionStore::new(&config.storage.collections_dir));

        let services = ApprovalServices::new(
            collections,
            collaborators.importer,
            collaborators.timeseries,
            collaborators.pdf,
            collaborators.notifier,
            collaborators.alerter,
        )
        .with_compressor(Arc::new(ZipTimeseriesCompressor::new(
            config.approval.zip_verification_attempts,
        )));

        tracing::info!(
            collections = %config.storage.collections_dir.display(),
            workers = config.approval.workers,
            "embargo service opened"
        );
        Ok(Self::new(config, Arc::new(key_store), permissions, services))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn keyring(&self) -> &Arc<CollectionKeyring> {
        &self.keyring
    }

    pub fn key_cache(&self) -> &Arc<StoreBackedCache> {
        &self.key_cache
    }

    pub fn collections(&self) -> &Arc<dyn CollectionStore> {
        &self.services.collections
    }

    pub fn scheduler(&self) -> &ApprovalScheduler {
        &self.scheduler
    }

    pub fn startup_alerter(&self) -> &StartupAlerter {
        &self.startup
    }

    /// Make this service's keyring the process-wide one.
    pub fn install_keyring(&self, slot: &KeyringSlot) {
        slot.install(self.keyring.clone());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Announce that the publishing queue is locked until an admin logs in.
    pub async fn start(&self) {
        self.startup.queue_locked().await;
    }

    /// Copy the user's keys into the shared keyring. An administrator
    /// logging in also unlocks the publishing queue.
    pub async fn on_login(&self, user: &User) -> Result<()> {
        self.keyring.populate_from_user(Some(user)).await?;
        if user.admin {
            self.startup.queue_unlocked().await;
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Collections
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a collection with a fresh key.
    ///
    /// Returns the key, or `None` if the user may not edit the collection.
    pub async fn create_collection(
        &self,
        user: &User,
        mut description: CollectionDescription,
    ) -> Result<Option<SecretKey>> {
        let key = SecretKey::generate();
        let collection = Collection::new(description.clone());
        if !self.keyring.add(Some(user), Some(&collection), &key).await? {
            return Ok(None);
        }

        description.add_event(Event::new(EventType::Created, user.email.as_str()));
        self.services.collections.save(&description).await?;

        tracing::info!(collection_id = %description.id, user = %user.email, "created collection");
        Ok(Some(key))
    }

    /// Delete a collection's description and key.
    ///
    /// Returns `false` if there is no such collection or the user may not
    /// edit it.
    pub async fn delete_collection(&self, user: &User, collection_id: &str) -> Result<bool> {
        let Some(description) = self.services.collections.load(collection_id).await? else {
            return Ok(false);
        };

        if !self.can_edit(user, &description).await? {
            return Ok(false);
        }

        let collection = Collection::new(description);
        self.keyring.remove(Some(user), Some(&collection)).await?;
        let deleted = self.services.collections.delete(collection_id).await?;

        tracing::info!(collection_id, user = %user.email, "deleted collection");
        Ok(deleted)
    }

    /// Reset a collection so a new approval can start from scratch.
    ///
    /// Clears an `InProgress` left by a dead run or a `Complete` whose
    /// archives need rebuilding. Returns `false` if there is no such
    /// collection or the user may not edit it. A collection with a run in
    /// flight is refused.
    pub async fn unlock_collection(&self, user: &User, collection_id: &str) -> Result<bool> {
        let Some(mut description) = self.services.collections.load(collection_id).await? else {
            return Ok(false);
        };
        if !self.can_edit(user, &description).await? {
            return Ok(false);
        }
        if self.scheduler.is_running(collection_id) {
            return Err(SchedulerError::AlreadyRunning(collection_id.to_string()).into());
        }

        let previous = description.approval_status;
        description.approval_status = ApprovalStatus::NotStarted;
        description.add_event(Event::new(EventType::Unlocked, user.email.as_str()));
        self.services.collections.save(&description).await?;

        tracing::info!(collection_id, user = %user.email, ?previous, "unlocked collection");
        Ok(true)
    }

    async fn can_edit(&self, user: &User, description: &CollectionDescription) -> Result<bool> {
        let permitted = self
            .permissions
            .can_edit(user, description)
            .await
            .map_err(|source| KeyringError::PermissionCheckFailed {
                collection_id: description.id.clone(),
                email: user.email.clone(),
                source,
            })?;
        Ok(permitted)
    }

    fn collection_dir(&self, collection_id: &str) -> PathBuf {
        self.config.storage.content_root.join(collection_id)
    }

    /// Encrypted views of a collection's content for this user.
    pub async fn content_for(
        &self,
        user: &User,
        collection: &Collection,
    ) -> Result<Option<ApprovalContent>> {
        let Some(key) = self.keyring.get(Some(user), Some(collection)).await? else {
            return Ok(None);
        };
        let collection_id = collection.id().unwrap_or_default();

        let root = Arc::new(FsContent::new(self.collection_dir(collection_id)));
        let reviewed = Arc::new(FsContent::new(
            self.collection_dir(collection_id).join(REVIEWED_DIRECTORY),
        ));

        Ok(Some(ApprovalContent {
            collection_root: Arc::new(EncryptedContentReader::new(root, key.clone())),
            reviewed_reader: Arc::new(EncryptedContentReader::new(reviewed.clone(), key.clone())),
            reviewed_writer: Arc::new(EncryptedContentWriter::new(reviewed, key)),
            published: Arc::new(FsContent::new(&self.config.storage.published_root)),
        }))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Approval
    // ─────────────────────────────────────────────────────────────────────────

    /// Schedule an approval of a stored collection.
    ///
    /// Requires edit permission, and every item must have been reviewed:
    /// nothing may remain under `inprogress/` or `complete/`. The handle
    /// resolves to the run's outcome.
    pub async fn approve(
        &self,
        user: &User,
        session: Session,
        collection_id: &str,
        data_index: Arc<dyn DataIndex>,
    ) -> Result<JoinHandle<bool>> {
        let description = self
            .services
            .collections
            .load(collection_id)
            .await?
            .ok_or_else(|| EmbargoError::CollectionNotFound(collection_id.to_string()))?;
        if !self.can_edit(user, &description).await? {
            return Err(EmbargoError::NotPermitted(collection_id.to_string()));
        }
        let collection = Collection::new(description);

        let content = self
            .content_for(user, &collection)
            .await?
            .ok_or_else(|| EmbargoError::KeyUnavailable(collection_id.to_string()))?;

        let dir = self.collection_dir(collection_id);
        let in_progress = FsContent::new(dir.join(IN_PROGRESS_DIRECTORY)).list_uris().await?;
        let complete = FsContent::new(dir.join(COMPLETE_DIRECTORY)).list_uris().await?;
        let reviewed = content.reviewed_reader.list_uris().await?;
        let collection = collection
            .with_reviewed(reviewed)
            .with_in_progress(in_progress)
            .with_complete(complete);

        if !collection.is_fully_reviewed() {
            return Err(EmbargoError::IncompleteItems {
                collection_id: collection_id.to_string(),
                in_progress: collection.in_progress.len(),
                complete: collection.complete.len(),
            });
        }

        let task = ApproveTask::new(
            Some(collection),
            Some(session),
            content,
            data_index,
            self.services.clone(),
        );
        Ok(self.scheduler.submit(task)?)
    }
}
