#![forbid(unsafe_code)]

use hush_engines::identity::{AccessResource, GateError, IdentityGate};
use hush_engines::moderation::{ModerationEngine, ModerationPlan};
use hush_engines::query::{FeedbackQueryConfig, FeedbackQueryEngine, QueryPlan};
use hush_engines::summary::{SentimentAggregator, SentimentAggregatorConfig};
use hush_kernel_contracts::access::{
    AccessLevel, CallerIdentity, DashboardAccess, ExperienceView,
};
use hush_kernel_contracts::feedback::{
    CompanyId, ExperienceId, FeedbackQuery, FeedbackRecordInput, FeedbackScope, FeedbackView,
    SubmitFeedbackInput,
};
use hush_kernel_contracts::moderation::ModerationRequest;
use hush_kernel_contracts::summary::SentimentSummary;
use hush_kernel_contracts::{ContractViolation, UnixTimeNs};
use hush_storage::feedback::StorageError;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::ledger::{AppliedWrite, FeedbackLedger, FeedbackWrite};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeedbackOsError {
    #[error("invalid request: {0}")]
    Validation(#[from] ContractViolation),
    #[error("caller identity could not be resolved")]
    Unauthenticated,
    #[error("admin access required for {0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl FeedbackOsError {
    pub fn lock_poisoned() -> Self {
        FeedbackOsError::Internal("feedback store lock poisoned".to_string())
    }
}

impl From<GateError> for FeedbackOsError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Unauthenticated => FeedbackOsError::Unauthenticated,
            other => FeedbackOsError::Internal(other.to_string()),
        }
    }
}

impl From<StorageError> for FeedbackOsError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { table, key } => {
                FeedbackOsError::NotFound(format!("{table} {key}"))
            }
            StorageError::ContractViolation(violation) => FeedbackOsError::Validation(violation),
            other => FeedbackOsError::Internal(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackWiringConfig {
    pub query: FeedbackQueryConfig,
    pub aggregator: SentimentAggregatorConfig,
    /// Require company admin for company-scoped reads and for moderation.
    pub enforce_admin: bool,
}

impl FeedbackWiringConfig {
    pub fn mvp_v1() -> Self {
        Self {
            query: FeedbackQueryConfig::mvp_v1(),
            aggregator: SentimentAggregatorConfig::mvp_v1(),
            enforce_admin: true,
        }
    }
}

/// Result of a moderation call. `applied` is `None` when the row already
/// had the requested state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationOutcome {
    pub applied: Option<AppliedWrite>,
}

/// Composes the identity gate, the engines and the store into the
/// request-level feedback operations.
#[derive(Debug, Clone)]
pub struct FeedbackWiring {
    config: FeedbackWiringConfig,
    query: FeedbackQueryEngine,
    aggregator: SentimentAggregator,
    moderation: ModerationEngine,
}

impl FeedbackWiring {
    pub fn new(config: FeedbackWiringConfig) -> Self {
        Self {
            config,
            query: FeedbackQueryEngine::new(config.query),
            aggregator: SentimentAggregator::new(config.aggregator),
            moderation: ModerationEngine::new(),
        }
    }

    /// Resolves the caller without touching the ledger.
    pub fn authenticate(
        &self,
        gate: &dyn IdentityGate,
        token: &str,
    ) -> Result<CallerIdentity, FeedbackOsError> {
        resolve(gate, token)
    }

    /// Member submission. Returns the stored row and its anonymous view.
    pub fn submit(
        &self,
        gate: &dyn IdentityGate,
        ledger: &dyn FeedbackLedger,
        token: &str,
        experience_id: Option<&str>,
        content: Option<&str>,
        now: UnixTimeNs,
    ) -> Result<(AppliedWrite, FeedbackView), FeedbackOsError> {
        let caller = resolve(gate, token)?;
        let input = SubmitFeedbackInput::from_raw(experience_id, content)?;
        let experience = gate
            .retrieve_experience(&input.experience_id)?
            .ok_or_else(|| FeedbackOsError::NotFound(format!("experience {}", input.experience_id)))?;

        info!(
            experience_id = %input.experience_id,
            company_id = ?experience.company_id.as_ref().map(CompanyId::as_str),
            content_len = input.content.len(),
            "creating feedback"
        );
        let record_input = FeedbackRecordInput::v1(
            input.experience_id,
            experience.company_id,
            caller.user_id,
            input.content,
            now,
        )?;
        let applied = ledger.write(FeedbackWrite::Insert(record_input))?;
        let view = FeedbackView::from(applied.record());
        info!(
            feedback_id = %view.id,
            experience_id = %view.experience_id,
            "feedback created"
        );
        Ok((applied, view))
    }

    pub fn fetch(
        &self,
        gate: &dyn IdentityGate,
        ledger: &dyn FeedbackLedger,
        token: &str,
        company_id: Option<&str>,
        experience_id: Option<&str>,
        visibility: Option<&str>,
    ) -> Result<Vec<FeedbackView>, FeedbackOsError> {
        let caller = resolve(gate, token)?;
        let query = FeedbackQuery::from_raw(company_id, experience_id, visibility)?;
        if let FeedbackScope::Company(company_id) = &query.scope {
            if self.config.enforce_admin {
                require_company_admin(gate, &caller, company_id)?;
            }
        }

        let filter = match self.query.plan(&query, gate)? {
            QueryPlan::Empty => return Ok(Vec::new()),
            QueryPlan::Rows(filter) => filter,
        };
        let rows = self.query.order(ledger.feedback_rows(&filter)?);
        debug!(
            scope = scope_label(&query.scope),
            visibility = query.visibility.map(|v| v.as_str()),
            count = rows.len(),
            "feedback fetched"
        );
        Ok(rows.iter().map(FeedbackView::from).collect())
    }

    pub fn summary(
        &self,
        gate: &dyn IdentityGate,
        ledger: &dyn FeedbackLedger,
        token: &str,
        company_id: Option<&str>,
        now: UnixTimeNs,
    ) -> Result<SentimentSummary, FeedbackOsError> {
        let caller = resolve(gate, token)?;
        let company_id = company_id
            .filter(|v| !v.trim().is_empty())
            .ok_or(ContractViolation::InvalidValue {
                field: "summary.company_id",
                reason: "missing",
            })?;
        let company_id = CompanyId::new(company_id)?;
        if self.config.enforce_admin {
            require_company_admin(gate, &caller, &company_id)?;
        }

        let owned = gate.list_experiences(&company_id)?;
        if owned.is_empty() {
            debug!(company_id = %company_id, "company owns no experiences");
            return Ok(SentimentSummary::empty());
        }
        let rows = ledger.feedback_rows(&self.query.company_filter(&company_id, &owned))?;
        self.aggregator
            .aggregate(&rows, now)
            .map_err(|err| FeedbackOsError::Internal(format!("summary: {err}")))
    }

    pub fn moderate(
        &self,
        gate: &dyn IdentityGate,
        ledger: &dyn FeedbackLedger,
        token: &str,
        feedback_id: Option<&str>,
        action: Option<&str>,
        sentiment: Option<&str>,
    ) -> Result<ModerationOutcome, FeedbackOsError> {
        let caller = resolve(gate, token)?;
        let request = ModerationRequest::from_raw(feedback_id, action, sentiment)?;
        let current = ledger.feedback_row(&request.feedback_id)?;

        if self.config.enforce_admin {
            let record = current
                .as_ref()
                .ok_or_else(|| FeedbackOsError::NotFound(format!("feedback {}", request.feedback_id)))?;
            let company_id = match &record.company_id {
                Some(company_id) => Some(company_id.clone()),
                None => gate
                    .retrieve_experience(&record.experience_id)?
                    .and_then(|experience| experience.company_id),
            };
            let company_id = company_id.ok_or_else(|| {
                FeedbackOsError::Forbidden(format!("experience {}", record.experience_id))
            })?;
            require_company_admin(gate, &caller, &company_id)?;
        }

        match self.moderation.plan(&request, current.as_ref()) {
            ModerationPlan::Missing(feedback_id) => {
                Err(FeedbackOsError::NotFound(format!("feedback {feedback_id}")))
            }
            ModerationPlan::Unchanged(feedback_id) => {
                debug!(
                    feedback_id = %feedback_id,
                    action = request.action.as_str(),
                    "moderation already applied"
                );
                Ok(ModerationOutcome { applied: None })
            }
            ModerationPlan::Apply {
                feedback_id,
                effect,
            } => {
                let applied = ledger.write(FeedbackWrite::Apply {
                    feedback_id: feedback_id.clone(),
                    effect,
                })?;
                info!(
                    feedback_id = %feedback_id,
                    action = request.action.as_str(),
                    "feedback moderated"
                );
                Ok(ModerationOutcome {
                    applied: Some(applied),
                })
            }
        }
    }

    /// Denial is a normal answer here, not an error.
    pub fn check_dashboard_access(
        &self,
        gate: &dyn IdentityGate,
        token: &str,
        company_id: &str,
    ) -> Result<DashboardAccess, FeedbackOsError> {
        let caller = resolve(gate, token)?;
        let company_id = CompanyId::new(company_id)?;
        let level = gate
            .check_access_level(&AccessResource::Company(company_id), &caller.user_id)
            .map_err(internal_on_gate_failure)?;
        Ok(DashboardAccess::from_level(level))
    }

    pub fn resolve_experience_view(
        &self,
        gate: &dyn IdentityGate,
        token: &str,
        experience_id: &str,
    ) -> Result<ExperienceView, FeedbackOsError> {
        let caller = resolve(gate, token)?;
        let experience_id = ExperienceId::new(experience_id)?;
        let level = gate
            .check_access_level(
                &AccessResource::Experience(experience_id.clone()),
                &caller.user_id,
            )
            .map_err(internal_on_gate_failure)?;
        Ok(match level {
            AccessLevel::Admin => ExperienceView::Admin {
                company_id: gate
                    .retrieve_experience(&experience_id)?
                    .and_then(|experience| experience.company_id),
            },
            AccessLevel::Customer => ExperienceView::Member,
            AccessLevel::NoAccess => ExperienceView::NoAccess,
        })
    }
}

fn resolve(gate: &dyn IdentityGate, token: &str) -> Result<CallerIdentity, FeedbackOsError> {
    if token.trim().is_empty() {
        return Err(FeedbackOsError::Unauthenticated);
    }
    Ok(gate.resolve_caller(token)?)
}

pub fn require_company_admin(
    gate: &dyn IdentityGate,
    caller: &CallerIdentity,
    company_id: &CompanyId,
) -> Result<(), FeedbackOsError> {
    let level = gate
        .check_access_level(&AccessResource::Company(company_id.clone()), &caller.user_id)
        .map_err(internal_on_gate_failure)?;
    if level.is_admin() {
        return Ok(());
    }
    warn!(
        company_id = %company_id,
        access_level = level.as_str(),
        "admin access denied"
    );
    Err(FeedbackOsError::Forbidden(format!("company {company_id}")))
}

// An already-resolved caller failing an access check is not an identity problem.
fn internal_on_gate_failure(err: GateError) -> FeedbackOsError {
    FeedbackOsError::Internal(err.to_string())
}

fn scope_label(scope: &FeedbackScope) -> &'static str {
    match scope {
        FeedbackScope::Company(_) => "company",
        FeedbackScope::Experience(_) => "experience",
    }
}
