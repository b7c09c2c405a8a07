//! The approval task.

use std::sync::Arc;

use embargo_content::{CompoundContentReader, ContentReader, ContentWriter};
use embargo_core::{
    error_chain, ApprovalStatus, Collection, CollectionDescription, ContentDetail, Event,
    EventType, Session,
};
use embargo_store::CollectionStore;

use super::collaborators::{
    ArchiveCompressor, ContentDetailResolver, DataIndex, PdfRenderer, PublishNotification,
    PublishNotifier, ReleasePopulator, TimeseriesGenerator, TimeseriesUpdateCommand,
    UpdateCommandImporter,
};
use super::compress::ZipTimeseriesCompressor;
use super::event_log::{ApprovalEventLog, Checkpoint};
use super::notification::build_publish_notification;
use super::release::LinkingReleasePopulator;
use super::resolver::JsonContentDetailResolver;
use crate::alert::{send_quietly, Alert, AlertField, Alerter};
use crate::error::{ApprovalError, InvalidArgument};

pub const APPROVAL_FAILED_ALERT: &str = "Exception approving collection";
pub const VERIFICATION_FAILED_ALERT: &str = "Failed verification of time series zip files";
pub const VERIFICATION_ADVICE: &str = "Unlock the collection and re-approve to try again";

type Result<T> = std::result::Result<T, ApprovalError>;

/// The content trees one approval run works on.
#[derive(Clone)]
pub struct ApprovalContent {
    /// The collection's root, where time series import files live.
    pub collection_root: Arc<dyn ContentReader>,
    /// Reviewed content, decrypted with the collection key.
    pub reviewed_reader: Arc<dyn ContentReader>,
    /// Writes into reviewed content, sealed with the collection key.
    pub reviewed_writer: Arc<dyn ContentWriter>,
    /// The published site.
    pub published: Arc<dyn ContentReader>,
}

/// Collaborators shared by every approval run.
#[derive(Clone)]
pub struct ApprovalServices {
    pub collections: Arc<dyn CollectionStore>,
    pub resolver: Arc<dyn ContentDetailResolver>,
    pub release_populator: Arc<dyn ReleasePopulator>,
    pub importer: Arc<dyn UpdateCommandImporter>,
    pub timeseries: Arc<dyn TimeseriesGenerator>,
    pub pdf: Arc<dyn PdfRenderer>,
    pub compressor: Arc<dyn ArchiveCompressor>,
    pub notifier: Arc<dyn PublishNotifier>,
    pub alerter: Arc<dyn Alerter>,
}

impl ApprovalServices {
    /// Services with the default resolver, release populator and compressor.
    pub fn new(
        collections: Arc<dyn CollectionStore>,
        importer: Arc<dyn UpdateCommandImporter>,
        timeseries: Arc<dyn TimeseriesGenerator>,
        pdf: Arc<dyn PdfRenderer>,
        notifier: Arc<dyn PublishNotifier>,
        alerter: Arc<dyn Alerter>,
    ) -> Self {
        Self {
            collections,
            resolver: Arc::new(JsonContentDetailResolver::new()),
            release_populator: Arc::new(LinkingReleasePopulator::new()),
            importer,
            timeseries,
            pdf,
            compressor: Arc::new(ZipTimeseriesCompressor::default()),
            notifier,
            alerter,
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ContentDetailResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_release_populator(mut self, populator: Arc<dyn ReleasePopulator>) -> Self {
        self.release_populator = populator;
        self
    }

    pub fn with_compressor(mut self, compressor: Arc<dyn ArchiveCompressor>) -> Self {
        self.compressor = compressor;
        self
    }
}

/// One approval of one collection.
///
/// Stages run strictly in order. A failing stage stops the run, puts the
/// collection in [`ApprovalStatus::Error`] with an `ApprovalFailed` event,
/// and alerts operators. Release page population and archive verification
/// are best-effort and never stop the run.
pub struct ApproveTask {
    collection: Option<Collection>,
    session: Option<Session>,
    content: ApprovalContent,
    data_index: Arc<dyn DataIndex>,
    services: Arc<ApprovalServices>,
}

impl ApproveTask {
    pub fn new(
        collection: Option<Collection>,
        session: Option<Session>,
        content: ApprovalContent,
        data_index: Arc<dyn DataIndex>,
        services: Arc<ApprovalServices>,
    ) -> Self {
        Self {
            collection,
            session,
            content,
            data_index,
            services,
        }
    }

    /// Id of the collection to approve, if one with an id was given.
    pub fn collection_id(&self) -> Option<&str> {
        self.collection.as_ref().and_then(|c| c.id())
    }

    /// Current approval status of the collection.
    pub fn approval_status(&self) -> Option<ApprovalStatus> {
        self.collection
            .as_ref()
            .and_then(|c| c.description.as_ref())
            .map(|d| d.approval_status)
    }

    /// Run the approval. Returns whether the collection was approved.
    ///
    /// Never panics outward or errors: contract violations are logged and
    /// reported as `false` like any other failure.
    pub async fn run(self) -> bool {
        let collection_id = self.collection_id().map(str::to_owned);

        match self.try_run().await {
            Ok(approved) => approved,
            Err(e) => {
                tracing::error!(
                    collection_id = ?collection_id,
                    error = %e,
                    "approval task: unrecoverable error while attempting to approve collection"
                );
                false
            }
        }
    }

    /// Run the approval, surfacing contract violations as errors.
    ///
    /// `Ok(false)` means a stage failed and the collection was moved to the
    /// error state.
    pub async fn try_run(mut self) -> Result<bool> {
        let (mut collection, session) = self.validate()?;
        let collection_id = collection.id().unwrap_or_default().to_string();
        let mut log = ApprovalEventLog::start(collection_id.as_str(), session.email.as_str());

        tracing::info!(
            collection_id = %collection_id,
            user = %session.email,
            "approval task: beginning approval process"
        );

        match self.approve(&mut collection, &session, &mut log).await {
            Ok(()) => {
                log.reached(Checkpoint::Completed);
                tracing::info!(
                    collection_id = %collection_id,
                    user = %session.email,
                    events = %log,
                    "approval task: collection approved"
                );
                Ok(true)
            }
            Err(e) => {
                self.recover(&mut collection, &session, &log, &e).await;
                Ok(false)
            }
        }
    }

    fn validate(&mut self) -> Result<(Collection, Session)> {
        let collection = self.collection.take().ok_or(InvalidArgument::CollectionMissing)?;
        if collection.description.is_none() {
            return Err(InvalidArgument::DescriptionMissing.into());
        }
        let session = self.session.take().ok_or(InvalidArgument::SessionMissing)?;
        if session.email.is_empty() {
            return Err(InvalidArgument::SessionEmailMissing.into());
        }
        Ok((collection, session))
    }

    async fn approve(
        &self,
        collection: &mut Collection,
        session: &Session,
        log: &mut ApprovalEventLog,
    ) -> Result<()> {
        self.begin(collection).await?;

        let details = self
            .services
            .resolver
            .resolve(&collection.reviewed, self.content.reviewed_reader.as_ref())
            .await
            .map_err(ApprovalError::ResolveDetails)?;
        log.reached(Checkpoint::ResolvedDetails);

        self.populate_release_page(collection, &details).await;
        log.reached(Checkpoint::PopulatedReleasePage);

        self.generate_timeseries(collection).await?;
        log.reached(Checkpoint::GeneratedTimeseries);

        self.generate_pdfs(collection, session, &details).await?;
        log.reached(Checkpoint::GeneratedPdfs);

        let notification = self.create_publish_notification(collection).await?;
        log.reached(Checkpoint::CreatedPublishNotification);

        self.compress_archives(collection).await?;
        log.reached(Checkpoint::CompressedZipFiles);

        self.seal(collection, session).await?;
        log.reached(Checkpoint::ApprovalStateSet);

        self.services
            .notifier
            .notify(&notification)
            .await
            .map_err(ApprovalError::Notify)?;
        log.reached(Checkpoint::SentPublishNotification);

        Ok(())
    }

    /// Persist the in-progress status so observers see the run.
    async fn begin(&self, collection: &mut Collection) -> Result<()> {
        let description = description_mut(collection)?;
        description.approval_status = ApprovalStatus::InProgress;
        self.services
            .collections
            .save(description)
            .await
            .map_err(ApprovalError::BeginApproval)
    }

    async fn populate_release_page(&self, collection: &Collection, details: &[ContentDetail]) {
        let result = self
            .services
            .release_populator
            .populate(
                collection,
                self.content.reviewed_reader.as_ref(),
                self.content.reviewed_writer.as_ref(),
                details,
            )
            .await;

        if let Err(e) = result {
            tracing::warn!(
                collection_id = collection.id().unwrap_or_default(),
                error = %format!("{:#}", e),
                "approval task: failed to populate release page, continuing"
            );
        }
    }

    async fn generate_timeseries(&self, collection: &Collection) -> Result<()> {
        let commands = self.import_update_commands(collection).await?;

        let compound = CompoundContentReader::new(
            self.content.reviewed_reader.clone(),
            self.content.published.clone(),
        );

        self.services
            .timeseries
            .generate(
                self.content.published.as_ref(),
                &compound,
                self.content.reviewed_writer.as_ref(),
                self.data_index.as_ref(),
                &commands,
            )
            .await
            .map_err(ApprovalError::GenerateTimeseries)
    }

    /// Read every attached import file and resolve its commands' CDIDs.
    /// Commands whose CDID is not in the data index are dropped.
    async fn import_update_commands(
        &self,
        collection: &Collection,
    ) -> Result<Vec<TimeseriesUpdateCommand>> {
        let collection_id = collection.id().unwrap_or_default();
        let files = collection
            .description
            .as_ref()
            .map(|d| d.timeseries_import_files.as_slice())
            .unwrap_or_default();

        let mut commands = Vec::new();
        for file in files {
            tracing::info!(collection_id, filename = %file, "approval task: importing time series update file");

            let data = self
                .content
                .collection_root
                .read(file)
                .await
                .map_err(|source| ApprovalError::ReadImportFile {
                    file: file.clone(),
                    source,
                })?
                .ok_or_else(|| ApprovalError::ImportFileMissing(file.clone()))?;

            let imported = self
                .services
                .importer
                .import(&data)
                .await
                .map_err(|source| ApprovalError::ImportUpdates {
                    file: file.clone(),
                    source,
                })?;

            for mut command in imported {
                match self.data_index.uri_for_cdid(&command.cdid.to_lowercase()) {
                    Some(uri) => {
                        command.uri = Some(uri);
                        commands.push(command);
                    }
                    None => tracing::warn!(
                        collection_id,
                        cdid = %command.cdid,
                        "approval task: no time series found for CDID, skipping update"
                    ),
                }
            }
        }

        Ok(commands)
    }

    async fn generate_pdfs(
        &self,
        collection: &Collection,
        session: &Session,
        details: &[ContentDetail],
    ) -> Result<()> {
        let documents = self
            .services
            .pdf
            .render(session, collection, details)
            .await
            .map_err(ApprovalError::RenderPdfs)?;

        for document in documents {
            self.content
                .reviewed_writer
                .write(&document.uri, document.data)
                .await
                .map_err(|source| ApprovalError::WriteDocument {
                    uri: document.uri.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    async fn create_publish_notification(
        &self,
        collection: &Collection,
    ) -> Result<PublishNotification> {
        let uris = self
            .content
            .reviewed_reader
            .list_uris()
            .await
            .map_err(ApprovalError::ListContent)?;
        let description = collection
            .description
            .as_ref()
            .ok_or(InvalidArgument::DescriptionMissing)?;
        Ok(build_publish_notification(description, uris))
    }

    async fn compress_archives(&self, collection: &Collection) -> Result<()> {
        let verified = self
            .services
            .compressor
            .compress(
                collection,
                self.content.reviewed_reader.as_ref(),
                self.content.reviewed_writer.as_ref(),
            )
            .await
            .map_err(ApprovalError::CompressArchives)?;

        if !verified {
            tracing::warn!(
                collection_id = collection.id().unwrap_or_default(),
                "approval task: failed verification of time series zip files"
            );
            if let Some(description) = collection.description.as_ref() {
                let alert = Alert::collection_alarm(VERIFICATION_FAILED_ALERT, description)
                    .with_field(AlertField::new("Advice", VERIFICATION_ADVICE, false));
                send_quietly(self.services.alerter.as_ref(), &alert).await;
            }
        }
        Ok(())
    }

    async fn seal(&self, collection: &mut Collection, session: &Session) -> Result<()> {
        let description = description_mut(collection)?;
        description.approval_status = ApprovalStatus::Complete;
        description.add_event(Event::new(EventType::Approved, session.email.as_str()));
        self.services
            .collections
            .save(description)
            .await
            .map_err(ApprovalError::SaveCollection)
    }

    /// Move the collection to the error state and tell operators.
    async fn recover(
        &self,
        collection: &mut Collection,
        session: &Session,
        log: &ApprovalEventLog,
        error: &ApprovalError,
    ) {
        let message = error_chain(error);
        tracing::error!(
            collection_id = collection.id().unwrap_or_default(),
            user = %session.email,
            error = %message,
            events = %log,
            "approval task: error approving collection, reverting approval status to error"
        );

        let Some(description) = collection.description.as_mut() else {
            return;
        };
        description.approval_status = ApprovalStatus::Error;
        description.add_event(Event::failure(
            EventType::ApprovalFailed,
            session.email.as_str(),
            error,
        ));

        if let Err(e) = self.services.collections.save(description).await {
            tracing::error!(
                collection_id = %description.id,
                user = %session.email,
                error = %e,
                "approval task: error saving collection after approval failure, \
                 the status may need to be set to error manually"
            );
        }

        let alert = Alert::collection_alarm(APPROVAL_FAILED_ALERT, description)
            .with_field(AlertField::new("Error", message, false))
            .with_field(AlertField::new("Approval events", log.to_string(), false));
        send_quietly(self.services.alerter.as_ref(), &alert).await;
    }
}

fn description_mut(collection: &mut Collection) -> Result<&mut CollectionDescription> {
    collection
        .description
        .as_mut()
        .ok_or_else(|| InvalidArgument::DescriptionMissing.into())
}
