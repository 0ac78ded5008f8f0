//! Trust-center document visibility and watermark state machine.
//!
//! A document is `NOT_VISIBLE` whenever it has no uploaded file. With a file
//! attached it may move freely between the three visibility states. The
//! watermark status follows `watermarking_enabled`, which is a one-way latch.
//!
//! The state machine is pure: it returns the next document state together
//! with the side effects (watermark job, ignored latch reset) and leaves the
//! tuple bookkeeping to the lifecycle manager, which derives wildcard grants
//! from [`TrustCenterDocument::wildcard_grants`].

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Who can see a trust-center document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    #[default]
    NotVisible,
    /// Metadata is public; the file requires a signed NDA.
    Protected,
    PubliclyVisible,
}

/// Progress of the external watermarking job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WatermarkStatus {
    #[default]
    Disabled,
    Pending,
    InProgress,
    Complete,
    Failed,
}

/// Effect of a visibility transition on one wildcard tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantEffect {
    Create,
    Keep,
    Delete,
    None,
}

/// Wildcard tuple effects of moving from one visibility to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityTransition {
    pub doc: GrantEffect,
    pub file: GrantEffect,
}

impl VisibilityTransition {
    pub fn between(old: Visibility, new: Visibility) -> Self {
        fn effect(before: bool, after: bool) -> GrantEffect {
            match (before, after) {
                (false, true) => GrantEffect::Create,
                (true, true) => GrantEffect::Keep,
                (true, false) => GrantEffect::Delete,
                (false, false) => GrantEffect::None,
            }
        }

        Self {
            doc: effect(old.grants_doc(), new.grants_doc()),
            file: effect(old.grants_file(), new.grants_file()),
        }
    }
}

impl Visibility {
    /// Whether `(*, viewer, doc)` exists in this state.
    pub fn grants_doc(&self) -> bool {
        !matches!(self, Visibility::NotVisible)
    }

    /// Whether `(*, viewer, file)` exists in this state.
    pub fn grants_file(&self) -> bool {
        matches!(self, Visibility::PubliclyVisible)
    }
}

/// Wildcard grants implied by a document's current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildcardGrants {
    pub doc: bool,
    /// Served file that anyone may read.
    pub file: Option<String>,
}

/// Change to the uploaded file in a partial update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FileChange {
    #[default]
    Keep,
    Set(String),
    Clear,
}

/// Input for a new document.
#[derive(Debug, Clone, Default)]
pub struct NewDocument {
    pub trust_center_id: String,
    pub file_id: Option<String>,
    pub visibility: Option<Visibility>,
    pub watermarking_enabled: Option<bool>,
}

/// Partial update of a document. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct DocumentPatch {
    pub visibility: Option<Visibility>,
    pub watermarking_enabled: Option<bool>,
    pub file: FileChange,
}

/// Result of applying a create or patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentTransition {
    pub document: TrustCenterDocument,
    /// The uploaded file must be sent to the watermarking collaborator.
    pub enqueue_watermark: bool,
    /// The request tried to turn watermarking off; the value stayed `true`.
    pub latch_ignored: bool,
}

/// Visibility-relevant state of a trust-center document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustCenterDocument {
    pub trust_center_id: String,
    /// The uploaded file.
    pub original_file_id: Option<String>,
    /// The served file: the original when watermarking is off, the derived
    /// watermarked file otherwise.
    pub file_id: Option<String>,
    pub visibility: Visibility,
    pub watermarking_enabled: bool,
    pub watermark_status: WatermarkStatus,
}

impl TrustCenterDocument {
    /// Builds a new document. `watermarking_default` is the trust center's
    /// setting at creation time.
    pub fn create(input: NewDocument, watermarking_default: bool) -> DocumentTransition {
        let watermarking_enabled = input.watermarking_enabled.unwrap_or(watermarking_default);
        let mut document = Self {
            trust_center_id: input.trust_center_id,
            original_file_id: None,
            file_id: None,
            visibility: input.visibility.unwrap_or_default(),
            watermarking_enabled,
            watermark_status: if watermarking_enabled {
                WatermarkStatus::Pending
            } else {
                WatermarkStatus::Disabled
            },
        };

        let enqueue_watermark = match input.file_id {
            Some(file_id) => document.attach_file(file_id),
            None => false,
        };
        document.enforce_file_requirement();

        DocumentTransition {
            document,
            enqueue_watermark,
            latch_ignored: false,
        }
    }

    /// Applies a partial update and returns the next state.
    pub fn apply_patch(&self, patch: DocumentPatch) -> DocumentTransition {
        let mut document = self.clone();
        let mut enqueue_watermark = false;
        let mut latch_ignored = false;

        match patch.watermarking_enabled {
            Some(true) if !document.watermarking_enabled => {
                document.watermarking_enabled = true;
                document.watermark_status = WatermarkStatus::Pending;
                // The current served file stays until the derived one is ready.
                enqueue_watermark = document.original_file_id.is_some();
            }
            Some(false) if document.watermarking_enabled => latch_ignored = true,
            _ => {}
        }

        match patch.file {
            FileChange::Keep => {}
            FileChange::Set(file_id) => {
                enqueue_watermark = document.attach_file(file_id);
            }
            FileChange::Clear => {
                document.original_file_id = None;
                document.file_id = None;
                enqueue_watermark = false;
            }
        }

        if let Some(visibility) = patch.visibility {
            document.visibility = visibility;
        }
        document.enforce_file_requirement();

        DocumentTransition {
            document,
            enqueue_watermark,
            latch_ignored,
        }
    }

    /// Marks the watermark job as picked up by the collaborator.
    pub fn start_watermark(&self) -> DomainResult<Self> {
        self.require_status(&[WatermarkStatus::Pending], "start")?;
        let mut document = self.clone();
        document.watermark_status = WatermarkStatus::InProgress;
        Ok(document)
    }

    /// Swaps the served file for the derived watermarked file.
    pub fn complete_watermark(&self, derived_file_id: impl Into<String>) -> DomainResult<Self> {
        self.require_status(
            &[WatermarkStatus::Pending, WatermarkStatus::InProgress],
            "complete",
        )?;
        if self.original_file_id.is_none() {
            return Err(DomainError::invalid_input(
                "cannot complete watermarking for a document without a file",
            ));
        }
        let mut document = self.clone();
        document.file_id = Some(derived_file_id.into());
        document.watermark_status = WatermarkStatus::Complete;
        Ok(document)
    }

    /// Records a failed watermark job. The served file is left untouched.
    pub fn fail_watermark(&self) -> DomainResult<Self> {
        self.require_status(
            &[WatermarkStatus::Pending, WatermarkStatus::InProgress],
            "fail",
        )?;
        let mut document = self.clone();
        document.watermark_status = WatermarkStatus::Failed;
        Ok(document)
    }

    /// Returns true if an uploaded file is attached.
    pub fn has_file(&self) -> bool {
        self.original_file_id.is_some()
    }

    pub fn wildcard_grants(&self) -> WildcardGrants {
        WildcardGrants {
            doc: self.visibility.grants_doc(),
            file: if self.visibility.grants_file() {
                self.file_id.clone()
            } else {
                None
            },
        }
    }

    /// Attaches an uploaded file, returning whether a watermark job is due.
    fn attach_file(&mut self, file_id: String) -> bool {
        if self.watermarking_enabled {
            self.original_file_id = Some(file_id);
            self.file_id = None;
            self.watermark_status = WatermarkStatus::Pending;
            true
        } else {
            self.file_id = Some(file_id.clone());
            self.original_file_id = Some(file_id);
            false
        }
    }

    fn enforce_file_requirement(&mut self) {
        if !self.has_file() {
            self.visibility = Visibility::NotVisible;
        }
    }

    fn require_status(&self, allowed: &[WatermarkStatus], action: &str) -> DomainResult<()> {
        if !self.watermarking_enabled || !allowed.contains(&self.watermark_status) {
            return Err(DomainError::invalid_input(format!(
                "cannot {action} watermarking in status {:?}",
                self.watermark_status
            )));
        }
        Ok(())
    }
}
