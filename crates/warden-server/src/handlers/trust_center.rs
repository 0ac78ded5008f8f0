//! Trust center and trust-center document coordinator.
//!
//! Document state changes run through the visibility state machine; the
//! lifecycle manager turns the before and after images into wildcard and
//! association tuple changes committed with the document row.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use ulid::Ulid;
use warden_domain::error::{DomainError, DomainResult};
use warden_domain::identity::Subject;
use warden_domain::lifecycle::ResourceEvent;
use warden_domain::model::{ObjectKind, ObjectRef, Relation, Resource, TrustCenterSettings, Tuple};
use warden_domain::visibility::{
    DocumentPatch, NewDocument, TrustCenterDocument, Visibility, VisibilityTransition,
    WatermarkStatus,
};
use warden_storage::{DataStore, Transaction};

use super::{creation_scope, load, load_editable, load_visible};
use crate::adapters::resource_to_stored;
use crate::authz::Authz;
use crate::watermark::{WatermarkJob, WatermarkQueue};

/// Input for creating a trust center.
#[derive(Debug, Clone, Default)]
pub struct NewTrustCenter {
    pub id: Option<String>,
    pub organization_id: Option<String>,
    /// Overrides the configured default for documents of this trust center.
    pub watermarking_default: Option<bool>,
    /// Groups that manage the trust center and its documents.
    pub editors: Vec<String>,
}

/// Input for creating a trust-center document.
#[derive(Debug, Clone, Default)]
pub struct NewTrustCenterDocument {
    pub id: Option<String>,
    pub document: NewDocument,
}

/// Outcome of a document update.
#[derive(Debug, Clone)]
pub struct DocumentUpdate {
    pub resource: Resource,
    /// The request asked to turn watermarking off, which is not possible.
    pub latch_ignored: bool,
    pub watermark_enqueued: bool,
}

/// A document as shown to a caller. The file reference is present only when
/// the caller may read the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentView {
    pub id: String,
    pub trust_center_id: String,
    pub visibility: Visibility,
    pub watermarking_enabled: bool,
    pub watermark_status: WatermarkStatus,
    pub file_id: Option<String>,
}

/// Coordinates trust centers, their documents and the watermark callbacks.
pub struct TrustCenterService<S, Q> {
    authz: Arc<Authz<S>>,
    queue: Arc<Q>,
    watermarking_default: bool,
}

impl<S: DataStore, Q: WatermarkQueue> TrustCenterService<S, Q> {
    /// `watermarking_default` applies to trust centers created without
    /// their own setting.
    pub fn new(authz: Arc<Authz<S>>, queue: Arc<Q>, watermarking_default: bool) -> Self {
        Self {
            authz,
            queue,
            watermarking_default,
        }
    }

    #[instrument(skip(self, subject, input))]
    pub async fn create_trust_center(
        &self,
        subject: &Subject,
        input: NewTrustCenter,
    ) -> DomainResult<Resource> {
        let organization_id = creation_scope(
            &self.authz,
            subject,
            input.organization_id.as_deref(),
            ObjectKind::TrustCenter,
        )
        .await?;

        let id = input.id.unwrap_or_else(|| Ulid::new().to_string());
        let mut resource = Resource::new(ObjectKind::TrustCenter, id, organization_id);
        resource.editors.extend(input.editors);
        resource.trust_center = Some(TrustCenterSettings {
            watermarking_default: input
                .watermarking_default
                .unwrap_or(self.watermarking_default),
        });

        let mut transaction = Transaction::new();
        transaction.insert_resource(resource_to_stored(&resource)?);
        self.authz
            .stage_event(&mut transaction, &ResourceEvent::Created(resource.clone()))
            .await?;
        self.authz.commit(transaction).await?;

        info!(object = %resource.object_ref(), "trust center created");
        load(&self.authz, &resource.object_ref()).await
    }

    /// Changes the watermarking default. Existing documents keep their
    /// setting.
    pub async fn set_watermarking_default(
        &self,
        subject: &Subject,
        trust_center_id: &str,
        enabled: bool,
    ) -> DomainResult<Resource> {
        let object = ObjectRef::new(ObjectKind::TrustCenter, trust_center_id);
        let before = load_editable(&self.authz, subject, &object, "update").await?;
        let mut after = before.clone();
        after.trust_center = Some(TrustCenterSettings {
            watermarking_default: enabled,
        });
        self.commit_update(before, after).await
    }

    /// Creates a document under a trust center the caller can edit.
    #[instrument(skip(self, subject, input), fields(trust_center = %input.document.trust_center_id))]
    pub async fn create_document(
        &self,
        subject: &Subject,
        input: NewTrustCenterDocument,
    ) -> DomainResult<Resource> {
        let trust_center_ref =
            ObjectRef::new(ObjectKind::TrustCenter, &input.document.trust_center_id);
        let trust_center =
            load_editable(&self.authz, subject, &trust_center_ref, "add documents to").await?;
        let watermarking_default = trust_center
            .trust_center
            .as_ref()
            .map_or(self.watermarking_default, |s| s.watermarking_default);

        let transition = TrustCenterDocument::create(input.document, watermarking_default);
        log_visibility(Visibility::NotVisible, transition.document.visibility);

        let id = input.id.unwrap_or_else(|| Ulid::new().to_string());
        let mut resource = Resource::new(
            ObjectKind::TrustCenterDoc,
            id,
            trust_center.organization_id.clone(),
        );
        // Documents are managed by whoever manages the trust center.
        resource.editors = trust_center.editors.clone();
        resource.document = Some(transition.document);

        let mut transaction = Transaction::new();
        transaction.insert_resource(resource_to_stored(&resource)?);
        self.authz
            .stage_event(&mut transaction, &ResourceEvent::Created(resource.clone()))
            .await?;
        self.authz.commit(transaction).await?;

        if transition.enqueue_watermark {
            self.enqueue(&resource).await;
        }
        load(&self.authz, &resource.object_ref()).await
    }

    /// Applies a partial update to a document.
    #[instrument(skip(self, subject, patch))]
    pub async fn update_document(
        &self,
        subject: &Subject,
        document_id: &str,
        patch: DocumentPatch,
    ) -> DomainResult<DocumentUpdate> {
        let object = ObjectRef::new(ObjectKind::TrustCenterDoc, document_id);
        let before = load_editable(&self.authz, subject, &object, "update").await?;
        let current = document_of(&before)?;

        let transition = current.apply_patch(patch);
        if transition.latch_ignored {
            info!(document = document_id, "watermarking stays enabled once turned on");
        }
        log_visibility(current.visibility, transition.document.visibility);

        let mut after = before.clone();
        after.document = Some(transition.document);
        if after == before {
            return Ok(DocumentUpdate {
                resource: before,
                latch_ignored: transition.latch_ignored,
                watermark_enqueued: false,
            });
        }

        let resource = self.commit_update(before, after).await?;
        if transition.enqueue_watermark {
            self.enqueue(&resource).await;
        }
        Ok(DocumentUpdate {
            resource,
            latch_ignored: transition.latch_ignored,
            watermark_enqueued: transition.enqueue_watermark,
        })
    }

    /// Reads a document. Callers that cannot read the served file get no
    /// file reference.
    pub async fn get_document(
        &self,
        subject: &Subject,
        document_id: &str,
    ) -> DomainResult<DocumentView> {
        let object = ObjectRef::new(ObjectKind::TrustCenterDoc, document_id);
        let resource = load_visible(&self.authz, subject, &object).await?;
        let document = document_of(&resource)?;

        let file_id = match &document.file_id {
            Some(file_id) => {
                let file = ObjectRef::new(ObjectKind::File, file_id);
                self.authz
                    .check(subject, Relation::Viewer, &file)
                    .await
                    .then(|| file_id.clone())
            }
            None => None,
        };

        Ok(DocumentView {
            id: resource.id.clone(),
            trust_center_id: document.trust_center_id.clone(),
            visibility: document.visibility,
            watermarking_enabled: document.watermarking_enabled,
            watermark_status: document.watermark_status,
            file_id,
        })
    }

    /// Records that an anonymous visitor signed their trust center's NDA.
    #[instrument(skip(self, subject))]
    pub async fn sign_nda(&self, subject: &Subject) -> DomainResult<()> {
        let Some(trust_center_id) = subject.trust_center_id() else {
            return Err(DomainError::invalid_input(
                "only trust center visitors sign an NDA",
            ));
        };
        let trust_center = ObjectRef::new(ObjectKind::TrustCenter, trust_center_id);
        load_visible(&self.authz, subject, &trust_center).await?;

        self.authz
            .write_tuples(&[Tuple::new(
                subject.subject_ref(),
                Relation::NdaSigned,
                trust_center,
            )])
            .await?;
        info!(visitor = %subject.subject_ref(), trust_center = trust_center_id, "NDA signed");
        Ok(())
    }

    /// Watermark worker picked up the job for `source_file_id`.
    pub async fn start_watermark(
        &self,
        document_id: &str,
        source_file_id: &str,
    ) -> DomainResult<Resource> {
        self.watermark_callback(document_id, source_file_id, |doc| doc.start_watermark())
            .await
    }

    /// Watermark worker produced `derived_file_id`. The served file and its
    /// tuples move to the derived file.
    pub async fn complete_watermark(
        &self,
        document_id: &str,
        source_file_id: &str,
        derived_file_id: &str,
    ) -> DomainResult<Resource> {
        self.watermark_callback(document_id, source_file_id, |doc| {
            doc.complete_watermark(derived_file_id)
        })
        .await
    }

    /// Watermark worker gave up.
    pub async fn fail_watermark(
        &self,
        document_id: &str,
        source_file_id: &str,
    ) -> DomainResult<Resource> {
        self.watermark_callback(document_id, source_file_id, |doc| doc.fail_watermark())
            .await
    }

    #[instrument(skip(self, step))]
    async fn watermark_callback<F>(
        &self,
        document_id: &str,
        source_file_id: &str,
        step: F,
    ) -> DomainResult<Resource>
    where
        F: FnOnce(&TrustCenterDocument) -> DomainResult<TrustCenterDocument>,
    {
        let object = ObjectRef::new(ObjectKind::TrustCenterDoc, document_id);
        let before = load(&self.authz, &object).await?;
        let current = document_of(&before)?;
        if current.original_file_id.as_deref() != Some(source_file_id) {
            return Err(DomainError::Conflict {
                message: format!(
                    "watermark job for {source_file_id} is stale on {object}"
                ),
            });
        }

        let mut after = before.clone();
        after.document = Some(step(current)?);
        self.commit_update(before, after).await
    }

    async fn commit_update(&self, before: Resource, after: Resource) -> DomainResult<Resource> {
        let object = after.object_ref();
        let mut transaction = Transaction::new();
        transaction.update_resource(resource_to_stored(&after)?, before.version);
        self.authz
            .stage_event(&mut transaction, &ResourceEvent::Updated { before, after })
            .await?;
        self.authz.commit(transaction).await?;
        load(&self.authz, &object).await
    }

    /// Hands the uploaded file to the watermark worker. The document is
    /// already committed as `PENDING`, so a full queue is only logged.
    async fn enqueue(&self, resource: &Resource) {
        let Some(document) = &resource.document else {
            return;
        };
        let Some(source_file_id) = &document.original_file_id else {
            return;
        };
        let job = WatermarkJob {
            document_id: resource.id.clone(),
            trust_center_id: document.trust_center_id.clone(),
            source_file_id: source_file_id.clone(),
        };
        if let Err(err) = self.queue.enqueue(job).await {
            warn!(document = %resource.id, error = %err, "failed to enqueue watermark job");
        }
    }
}

fn document_of(resource: &Resource) -> DomainResult<&TrustCenterDocument> {
    resource.document.as_ref().ok_or_else(|| DomainError::Storage {
        message: format!("{} has no document state", resource.object_ref()),
    })
}

fn log_visibility(old: Visibility, new: Visibility) {
    if old != new {
        let effects = VisibilityTransition::between(old, new);
        debug!(
            ?old,
            ?new,
            doc_grant = ?effects.doc,
            file_grant = ?effects.file,
            "visibility transition"
        );
    }
}
