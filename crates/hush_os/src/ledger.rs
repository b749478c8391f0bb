#![forbid(unsafe_code)]

//! Store access for request wiring. Each call takes the store lock for one
//! read or one write only, so identity lookups never run under it.

use std::sync::Mutex;

use hush_engines::moderation::ModerationEffect;
use hush_kernel_contracts::feedback::{FeedbackId, FeedbackRecord, FeedbackRecordInput};
use hush_kernel_contracts::filter::FeedbackFilter;
use hush_storage::feedback::StorageError;
use hush_storage::repo::FeedbackRepo;

use crate::feedback::FeedbackOsError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackWrite {
    Insert(FeedbackRecordInput),
    Apply {
        feedback_id: FeedbackId,
        effect: ModerationEffect,
    },
}

/// A write after it landed, carrying what is needed to replay it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppliedWrite {
    Inserted(FeedbackRecord),
    Updated {
        record: FeedbackRecord,
        effect: ModerationEffect,
    },
    Deleted(FeedbackRecord),
}

impl AppliedWrite {
    pub fn record(&self) -> &FeedbackRecord {
        match self {
            AppliedWrite::Inserted(record)
            | AppliedWrite::Updated { record, .. }
            | AppliedWrite::Deleted(record) => record,
        }
    }
}

pub trait FeedbackLedger: Send + Sync {
    fn feedback_row(&self, id: &FeedbackId) -> Result<Option<FeedbackRecord>, FeedbackOsError>;

    fn feedback_rows(&self, filter: &FeedbackFilter) -> Result<Vec<FeedbackRecord>, FeedbackOsError>;

    fn write(&self, write: FeedbackWrite) -> Result<AppliedWrite, FeedbackOsError>;
}

pub fn apply_write<R>(repo: &mut R, write: FeedbackWrite) -> Result<AppliedWrite, StorageError>
where
    R: FeedbackRepo + ?Sized,
{
    match write {
        FeedbackWrite::Insert(input) => repo.insert_feedback_row(input).map(AppliedWrite::Inserted),
        FeedbackWrite::Apply {
            feedback_id,
            effect,
        } => match effect {
            ModerationEffect::SetVisible(visible) => repo
                .update_feedback_visibility_row(&feedback_id, visible)
                .map(|record| AppliedWrite::Updated { record, effect }),
            ModerationEffect::SetSentiment(sentiment) => repo
                .update_feedback_sentiment_row(&feedback_id, sentiment)
                .map(|record| AppliedWrite::Updated { record, effect }),
            ModerationEffect::Delete => repo
                .delete_feedback_row(&feedback_id)
                .map(AppliedWrite::Deleted),
        },
    }
}

impl<R> FeedbackLedger for Mutex<R>
where
    R: FeedbackRepo + Send,
{
    fn feedback_row(&self, id: &FeedbackId) -> Result<Option<FeedbackRecord>, FeedbackOsError> {
        let repo = self.lock().map_err(|_| FeedbackOsError::lock_poisoned())?;
        Ok(repo.feedback_row(id))
    }

    fn feedback_rows(&self, filter: &FeedbackFilter) -> Result<Vec<FeedbackRecord>, FeedbackOsError> {
        let repo = self.lock().map_err(|_| FeedbackOsError::lock_poisoned())?;
        Ok(repo.feedback_rows(filter))
    }

    fn write(&self, write: FeedbackWrite) -> Result<AppliedWrite, FeedbackOsError> {
        let mut repo = self.lock().map_err(|_| FeedbackOsError::lock_poisoned())?;
        Ok(apply_write(&mut *repo, write)?)
    }
}
