#![forbid(unsafe_code)]

use crate::feedback::{present, FeedbackId, Sentiment};
use crate::ContractViolation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModerationAction {
    Hide,
    Show,
    SetSentiment(Sentiment),
    Delete,
}

impl ModerationAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ModerationAction::Hide => "hide",
            ModerationAction::Show => "show",
            ModerationAction::SetSentiment(_) => "set-sentiment",
            ModerationAction::Delete => "delete",
        }
    }

    /// Parses the wire action name. `sentiment` is only consulted for
    /// `set-sentiment`, where it must be one of the three labels.
    pub fn parse(action: &str, sentiment: Option<&str>) -> Result<Self, ContractViolation> {
        match action {
            "hide" => Ok(ModerationAction::Hide),
            "show" => Ok(ModerationAction::Show),
            "delete" => Ok(ModerationAction::Delete),
            "set-sentiment" => {
                let raw = present(sentiment).ok_or(ContractViolation::InvalidValue {
                    field: "moderation_request.sentiment",
                    reason: "missing",
                })?;
                let sentiment = Sentiment::parse(raw).ok_or(ContractViolation::InvalidValue {
                    field: "moderation_request.sentiment",
                    reason: "must be positive, neutral or negative",
                })?;
                Ok(ModerationAction::SetSentiment(sentiment))
            }
            _ => Err(ContractViolation::InvalidValue {
                field: "moderation_request.action",
                reason: "invalid action",
            }),
        }
    }

    pub fn is_idempotent(self) -> bool {
        !matches!(self, ModerationAction::Delete)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationRequest {
    pub feedback_id: FeedbackId,
    pub action: ModerationAction,
}

impl ModerationRequest {
    pub fn v1(feedback_id: FeedbackId, action: ModerationAction) -> Self {
        Self {
            feedback_id,
            action,
        }
    }

    pub fn from_raw(
        feedback_id: Option<&str>,
        action: Option<&str>,
        sentiment: Option<&str>,
    ) -> Result<Self, ContractViolation> {
        let feedback_id = present(feedback_id).ok_or(ContractViolation::InvalidValue {
            field: "moderation_request.feedback_id",
            reason: "missing",
        })?;
        let action = present(action).ok_or(ContractViolation::InvalidValue {
            field: "moderation_request.action",
            reason: "missing",
        })?;
        Ok(Self {
            feedback_id: FeedbackId::new(feedback_id)?,
            action: ModerationAction::parse(action, sentiment)?,
        })
    }
}
