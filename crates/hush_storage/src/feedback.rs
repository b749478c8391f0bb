#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use hush_kernel_contracts::feedback::{
    FeedbackId, FeedbackRecord, FeedbackRecordInput, Sentiment,
};
use hush_kernel_contracts::filter::FeedbackFilter;
use hush_kernel_contracts::{ContractViolation, Validate};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StorageError {
    #[error("{table}: no row for key {key}")]
    NotFound { table: &'static str, key: String },
    #[error("{table}: duplicate key {key}")]
    DuplicateKey { table: &'static str, key: String },
    #[error("contract violation: {0}")]
    ContractViolation(#[from] ContractViolation),
}

/// In-memory feedback table. Single-row writes are atomic under `&mut self`;
/// concurrent callers serialize through whatever lock owns the store.
#[derive(Debug, Clone, Default)]
pub struct FeedbackStore {
    feedback_rows: BTreeMap<FeedbackId, FeedbackRecord>,
    next_feedback_seq: u64,
}

impl FeedbackStore {
    pub fn new_in_memory() -> Self {
        Self {
            feedback_rows: BTreeMap::new(),
            next_feedback_seq: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.feedback_rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feedback_rows.is_empty()
    }

    pub fn insert_feedback(
        &mut self,
        input: FeedbackRecordInput,
    ) -> Result<FeedbackRecord, StorageError> {
        input.validate()?;
        let seq = self.next_feedback_seq.max(1);
        let id = derive_feedback_id(&input, seq)?;
        if self.feedback_rows.contains_key(&id) {
            return Err(StorageError::DuplicateKey {
                table: "feedback",
                key: id.as_str().to_string(),
            });
        }
        let record = FeedbackRecord::from_input(id.clone(), input)?;
        self.next_feedback_seq = seq + 1;
        self.feedback_rows.insert(id, record.clone());
        debug!(feedback_id = %record.id, seq, "feedback row inserted");
        Ok(record)
    }

    /// Re-inserts a row exactly as it was persisted, id included.
    pub fn restore_feedback(&mut self, record: FeedbackRecord) -> Result<(), StorageError> {
        record.validate()?;
        if self.feedback_rows.contains_key(&record.id) {
            return Err(StorageError::DuplicateKey {
                table: "feedback",
                key: record.id.as_str().to_string(),
            });
        }
        self.next_feedback_seq = self.next_feedback_seq.max(1) + 1;
        self.feedback_rows.insert(record.id.clone(), record);
        Ok(())
    }

    pub fn feedback_row(&self, id: &FeedbackId) -> Option<&FeedbackRecord> {
        self.feedback_rows.get(id)
    }

    pub fn set_feedback_visibility(
        &mut self,
        id: &FeedbackId,
        visible: bool,
    ) -> Result<FeedbackRecord, StorageError> {
        let row = self.row_mut(id)?;
        row.visible = visible;
        Ok(row.clone())
    }

    pub fn set_feedback_sentiment(
        &mut self,
        id: &FeedbackId,
        sentiment: Sentiment,
    ) -> Result<FeedbackRecord, StorageError> {
        let row = self.row_mut(id)?;
        row.sentiment = Some(sentiment);
        Ok(row.clone())
    }

    /// Permanent removal; nothing of the row is kept.
    pub fn delete_feedback(&mut self, id: &FeedbackId) -> Result<FeedbackRecord, StorageError> {
        self.feedback_rows
            .remove(id)
            .ok_or_else(|| StorageError::NotFound {
                table: "feedback",
                key: id.as_str().to_string(),
            })
    }

    /// Matching rows in id order. Callers own presentation ordering.
    pub fn feedback_rows_matching(&self, filter: &FeedbackFilter) -> Vec<&FeedbackRecord> {
        self.feedback_rows
            .values()
            .filter(|row| filter.matches(row))
            .collect()
    }

    pub fn count_feedback_rows(&self, filter: &FeedbackFilter) -> u64 {
        self.feedback_rows
            .values()
            .filter(|row| filter.matches(row))
            .count() as u64
    }

    fn row_mut(&mut self, id: &FeedbackId) -> Result<&mut FeedbackRecord, StorageError> {
        self.feedback_rows
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound {
                table: "feedback",
                key: id.as_str().to_string(),
            })
    }
}

fn derive_feedback_id(input: &FeedbackRecordInput, seq: u64) -> Result<FeedbackId, StorageError> {
    let mut hasher = Sha256::new();
    hasher.update(input.experience_id.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(input.user_id.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(input.created_at.0.to_be_bytes());
    hasher.update(b"|");
    hasher.update(seq.to_be_bytes());
    let digest = hasher.finalize();
    let hex: String = digest
        .iter()
        .take(12)
        .map(|b| format!("{:02x}", b))
        .collect();
    Ok(FeedbackId::new(format!("fb_{hex}"))?)
}
