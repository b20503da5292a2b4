use crate::archive::remote::{RemoteArchiveClient, UploadPayload};
use crate::archive::store::ArchiveStore;
use crate::archive::writer::{ArchiveOutcome, ArchiveRequest, ArchiveWriter};
use crate::entry::model::{ArchiveTarget, CompositeArtifact};
use crate::foundation::error::StampResult;

/// Transmission seam between the orchestrator and the archive.
///
/// `send` archives one artifact; `send_batch` archives all artifacts in one
/// call. Implementations perform no internal concurrency and no retries.
pub trait Transport {
    /// Archive one artifact under the target's metadata.
    fn send(
        &mut self,
        target: &ArchiveTarget,
        artifact: &CompositeArtifact,
    ) -> StampResult<ArchiveOutcome>;

    /// Archive all artifacts in one aggregate call.
    fn send_batch(
        &mut self,
        target: &ArchiveTarget,
        artifacts: &[CompositeArtifact],
    ) -> StampResult<Vec<ArchiveOutcome>>;
}

/// [`Transport`] over the tenant's HTTP archive endpoint.
pub struct HttpTransport {
    client: RemoteArchiveClient,
}

impl HttpTransport {
    /// Build a transport for the target's endpoint address.
    pub fn new(target: &ArchiveTarget) -> StampResult<Self> {
        Ok(Self {
            client: RemoteArchiveClient::new(&target.endpoint)?,
        })
    }

    /// Wrap an existing client.
    pub fn from_client(client: RemoteArchiveClient) -> Self {
        Self { client }
    }

    fn payload(target: &ArchiveTarget, artifact: &CompositeArtifact) -> UploadPayload {
        UploadPayload::new(
            &artifact.jpeg,
            &artifact.filename,
            &target.form_name,
            &target.field_data,
            &target.folder_structure,
        )
    }
}

impl Transport for HttpTransport {
    fn send(
        &mut self,
        target: &ArchiveTarget,
        artifact: &CompositeArtifact,
    ) -> StampResult<ArchiveOutcome> {
        self.client.upload(&Self::payload(target, artifact))
    }

    fn send_batch(
        &mut self,
        target: &ArchiveTarget,
        artifacts: &[CompositeArtifact],
    ) -> StampResult<Vec<ArchiveOutcome>> {
        let payloads: Vec<UploadPayload> = artifacts
            .iter()
            .map(|a| Self::payload(target, a))
            .collect();
        self.client.upload_batch(&payloads)
    }
}

/// [`Transport`] that runs the archive writer directly against a store.
///
/// Used for local/offline archival and as the end-to-end test double: the
/// whole folder/filename/header algorithm runs in-process.
pub struct StoreTransport<S: ArchiveStore> {
    store: S,
    writer: ArchiveWriter,
}

impl<S: ArchiveStore> StoreTransport<S> {
    /// Build a transport writing into `store` under the named root folder.
    pub fn new(store: S, root_name: impl Into<String>) -> Self {
        Self {
            store,
            writer: ArchiveWriter::new(root_name),
        }
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the backing store.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    fn request(target: &ArchiveTarget, artifact: &CompositeArtifact) -> ArchiveRequest {
        ArchiveRequest {
            form_name: target.form_name.clone(),
            folder_structure: target.folder_structure.clone(),
            field_data: target.field_data.clone(),
            filename: artifact.filename.clone(),
            payload: artifact.jpeg.clone(),
        }
    }
}

impl<S: ArchiveStore> Transport for StoreTransport<S> {
    fn send(
        &mut self,
        target: &ArchiveTarget,
        artifact: &CompositeArtifact,
    ) -> StampResult<ArchiveOutcome> {
        self.writer
            .write(&mut self.store, &Self::request(target, artifact))
    }

    fn send_batch(
        &mut self,
        target: &ArchiveTarget,
        artifacts: &[CompositeArtifact],
    ) -> StampResult<Vec<ArchiveOutcome>> {
        let mut outcomes = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            outcomes.push(self.send(target, artifact)?);
        }
        Ok(outcomes)
    }
}
