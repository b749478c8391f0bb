#![forbid(unsafe_code)]

use hush_kernel_contracts::access::ExperienceRecord;
use hush_kernel_contracts::feedback::{
    CompanyId, FeedbackQuery, FeedbackRecord, FeedbackScope, VisibilityFilter,
};
use hush_kernel_contracts::filter::{newest_first, FeedbackFilter};
use tracing::debug;

use crate::identity::{GateError, IdentityGate};

/// How a company scope is turned into rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanyScopeStrategy {
    /// Match the `company_id` stamped on each row at submission.
    Denormalized,
    /// Match rows whose experience the company owns right now.
    ExperienceJoin,
}

impl CompanyScopeStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            CompanyScopeStrategy::Denormalized => "denormalized",
            CompanyScopeStrategy::ExperienceJoin => "experience_join",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "denormalized" => Some(CompanyScopeStrategy::Denormalized),
            "experience_join" | "join" => Some(CompanyScopeStrategy::ExperienceJoin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackQueryConfig {
    pub company_scope: CompanyScopeStrategy,
}

impl FeedbackQueryConfig {
    pub fn mvp_v1() -> Self {
        Self {
            company_scope: CompanyScopeStrategy::Denormalized,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPlan {
    /// The scope resolves to nothing; skip the store.
    Empty,
    Rows(FeedbackFilter),
}

#[derive(Debug, Clone)]
pub struct FeedbackQueryEngine {
    config: FeedbackQueryConfig,
}

impl FeedbackQueryEngine {
    pub fn new(config: FeedbackQueryConfig) -> Self {
        Self { config }
    }

    pub fn plan(
        &self,
        query: &FeedbackQuery,
        gate: &dyn IdentityGate,
    ) -> Result<QueryPlan, GateError> {
        let filter = match &query.scope {
            FeedbackScope::Experience(experience_id) => {
                FeedbackFilter::for_experiences([experience_id.clone()])
            }
            FeedbackScope::Company(company_id) => match self.config.company_scope {
                CompanyScopeStrategy::Denormalized => FeedbackFilter::for_company(company_id.clone()),
                CompanyScopeStrategy::ExperienceJoin => {
                    let experiences = gate.list_experiences(company_id)?;
                    debug!(
                        company_id = %company_id,
                        experience_count = experiences.len(),
                        "company scope resolved through experiences"
                    );
                    if experiences.is_empty() {
                        return Ok(QueryPlan::Empty);
                    }
                    self.company_filter(company_id, &experiences)
                }
            },
        };
        let filter = match query.visibility {
            Some(VisibilityFilter::Visible) => filter.with_visible(true),
            Some(VisibilityFilter::Hidden) => filter.with_visible(false),
            None => filter,
        };
        Ok(QueryPlan::Rows(filter))
    }

    /// Filter for a company whose owned experiences are already known.
    pub fn company_filter(
        &self,
        company_id: &CompanyId,
        owned: &[ExperienceRecord],
    ) -> FeedbackFilter {
        match self.config.company_scope {
            CompanyScopeStrategy::Denormalized => FeedbackFilter::for_company(company_id.clone()),
            CompanyScopeStrategy::ExperienceJoin => {
                FeedbackFilter::for_experiences(owned.iter().map(|e| e.experience_id.clone()))
            }
        }
    }

    /// Final presentation order: newest first, id ascending on ties.
    pub fn order(&self, mut rows: Vec<FeedbackRecord>) -> Vec<FeedbackRecord> {
        rows.sort_by(newest_first);
        rows
    }
}
