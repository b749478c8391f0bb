#![forbid(unsafe_code)]

use hush_kernel_contracts::feedback::{
    FeedbackId, FeedbackRecord, FeedbackRecordInput, Sentiment,
};
use hush_kernel_contracts::filter::FeedbackFilter;

use crate::feedback::{FeedbackStore, StorageError};

/// Typed repository interface for feedback persistence.
pub trait FeedbackRepo {
    fn insert_feedback_row(
        &mut self,
        input: FeedbackRecordInput,
    ) -> Result<FeedbackRecord, StorageError>;
    fn restore_feedback_row(&mut self, record: FeedbackRecord) -> Result<(), StorageError>;
    fn feedback_row(&self, id: &FeedbackId) -> Option<FeedbackRecord>;
    fn update_feedback_visibility_row(
        &mut self,
        id: &FeedbackId,
        visible: bool,
    ) -> Result<FeedbackRecord, StorageError>;
    fn update_feedback_sentiment_row(
        &mut self,
        id: &FeedbackId,
        sentiment: Sentiment,
    ) -> Result<FeedbackRecord, StorageError>;
    fn delete_feedback_row(&mut self, id: &FeedbackId) -> Result<FeedbackRecord, StorageError>;
    fn feedback_rows(&self, filter: &FeedbackFilter) -> Vec<FeedbackRecord>;
    fn count_feedback_rows(&self, filter: &FeedbackFilter) -> u64;
}

impl FeedbackRepo for FeedbackStore {
    fn insert_feedback_row(
        &mut self,
        input: FeedbackRecordInput,
    ) -> Result<FeedbackRecord, StorageError> {
        self.insert_feedback(input)
    }

    fn restore_feedback_row(&mut self, record: FeedbackRecord) -> Result<(), StorageError> {
        self.restore_feedback(record)
    }

    fn feedback_row(&self, id: &FeedbackId) -> Option<FeedbackRecord> {
        FeedbackStore::feedback_row(self, id).cloned()
    }

    fn update_feedback_visibility_row(
        &mut self,
        id: &FeedbackId,
        visible: bool,
    ) -> Result<FeedbackRecord, StorageError> {
        self.set_feedback_visibility(id, visible)
    }

    fn update_feedback_sentiment_row(
        &mut self,
        id: &FeedbackId,
        sentiment: Sentiment,
    ) -> Result<FeedbackRecord, StorageError> {
        self.set_feedback_sentiment(id, sentiment)
    }

    fn delete_feedback_row(&mut self, id: &FeedbackId) -> Result<FeedbackRecord, StorageError> {
        self.delete_feedback(id)
    }

    fn feedback_rows(&self, filter: &FeedbackFilter) -> Vec<FeedbackRecord> {
        self.feedback_rows_matching(filter)
            .into_iter()
            .cloned()
            .collect()
    }

    fn count_feedback_rows(&self, filter: &FeedbackFilter) -> u64 {
        FeedbackStore::count_feedback_rows(self, filter)
    }
}
