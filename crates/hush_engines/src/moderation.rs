#![forbid(unsafe_code)]

use hush_kernel_contracts::feedback::{FeedbackId, FeedbackRecord, Sentiment};
use hush_kernel_contracts::moderation::{ModerationAction, ModerationRequest};

/// Single-row change a moderation request resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationEffect {
    SetVisible(bool),
    SetSentiment(Sentiment),
    Delete,
}

impl ModerationEffect {
    pub fn from_action(action: ModerationAction) -> Self {
        match action {
            ModerationAction::Hide => ModerationEffect::SetVisible(false),
            ModerationAction::Show => ModerationEffect::SetVisible(true),
            ModerationAction::SetSentiment(sentiment) => ModerationEffect::SetSentiment(sentiment),
            ModerationAction::Delete => ModerationEffect::Delete,
        }
    }

    /// True when applying the effect would leave the row unchanged.
    pub fn already_applied(self, current: &FeedbackRecord) -> bool {
        match self {
            ModerationEffect::SetVisible(visible) => current.visible == visible,
            ModerationEffect::SetSentiment(sentiment) => current.sentiment == Some(sentiment),
            ModerationEffect::Delete => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationPlan {
    Missing(FeedbackId),
    Unchanged(FeedbackId),
    Apply {
        feedback_id: FeedbackId,
        effect: ModerationEffect,
    },
}

#[derive(Debug, Clone, Default)]
pub struct ModerationEngine;

impl ModerationEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn plan(
        &self,
        request: &ModerationRequest,
        current: Option<&FeedbackRecord>,
    ) -> ModerationPlan {
        let feedback_id = request.feedback_id.clone();
        let Some(current) = current else {
            return ModerationPlan::Missing(feedback_id);
        };
        let effect = ModerationEffect::from_action(request.action);
        if request.action.is_idempotent() && effect.already_applied(current) {
            return ModerationPlan::Unchanged(feedback_id);
        }
        ModerationPlan::Apply {
            feedback_id,
            effect,
        }
    }
}
