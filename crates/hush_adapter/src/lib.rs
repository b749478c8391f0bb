#![forbid(unsafe_code)]

pub mod config;

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, SecondsFormat, Utc};
use hush_engines::identity::{IdentityGate, StaticIdentityGate};
use hush_engines::moderation::ModerationEffect;
use hush_engines::platform::{PlatformIdentityGate, USER_TOKEN_HEADER};
use hush_engines::query::FeedbackQueryConfig;
use hush_kernel_contracts::access::{DashboardAccess, ExperienceView};
use hush_kernel_contracts::feedback::{FeedbackId, FeedbackRecord, FeedbackView, Sentiment};
use hush_kernel_contracts::filter::FeedbackFilter;
use hush_kernel_contracts::summary::SentimentSummary;
use hush_kernel_contracts::UnixTimeNs;
use hush_os::feedback::{FeedbackOsError, FeedbackWiring, FeedbackWiringConfig};
use hush_os::ledger::{apply_write, AppliedWrite, FeedbackLedger, FeedbackWrite};
use hush_storage::feedback::FeedbackStore;
use hush_storage::repo::FeedbackRepo;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::AdapterConfig;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedbackRequest {
    pub experience_id: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchFeedbackParams {
    pub company_id: Option<String>,
    pub experience_id: Option<String>,
    pub visibility: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryParams {
    pub company_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerateFeedbackRequest {
    pub feedback_id: Option<String>,
    pub action: Option<String>,
    pub sentiment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackViewBody {
    pub id: String,
    pub experience_id: String,
    pub company_id: Option<String>,
    pub content: String,
    pub visible: bool,
    pub sentiment: Option<Sentiment>,
    pub created_at: String,
}

impl From<&FeedbackView> for FeedbackViewBody {
    fn from(view: &FeedbackView) -> Self {
        Self {
            id: view.id.to_string(),
            experience_id: view.experience_id.to_string(),
            company_id: view.company_id.as_ref().map(ToString::to_string),
            content: view.content.clone(),
            visible: view.visible,
            sentiment: view.sentiment,
            created_at: rfc3339(view.created_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFeedbackResponse {
    pub success: bool,
    pub feedback: FeedbackViewBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFeedbackResponse {
    pub feedbacks: Vec<FeedbackViewBody>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentStatBody {
    pub sentiment: Sentiment,
    pub count: u64,
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentBreakdownBody {
    pub positive: u64,
    pub neutral: u64,
    pub negative: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub summary: Vec<SentimentStatBody>,
    pub total: u64,
    pub recent_count: u64,
    pub hidden_count: u64,
    pub average_sentiment: f64,
    pub sentiment_breakdown: SentimentBreakdownBody,
}

impl From<SentimentSummary> for SummaryResponse {
    fn from(s: SentimentSummary) -> Self {
        Self {
            summary: s
                .summary
                .into_iter()
                .map(|row| SentimentStatBody {
                    sentiment: row.sentiment,
                    count: row.count,
                    percentage: row.percentage,
                })
                .collect(),
            total: s.total,
            recent_count: s.recent_count,
            hidden_count: s.hidden_count,
            average_sentiment: s.average_sentiment,
            sentiment_breakdown: SentimentBreakdownBody {
                positive: s.sentiment_breakdown.positive,
                neutral: s.sentiment_breakdown.neutral,
                negative: s.sentiment_breakdown.negative,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardAccessResponse {
    pub granted: bool,
    pub access_level: String,
}

impl From<DashboardAccess> for DashboardAccessResponse {
    fn from(access: DashboardAccess) -> Self {
        Self {
            granted: access.granted,
            access_level: access.access_level.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceViewResponse {
    pub view: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
}

impl From<ExperienceView> for ExperienceViewResponse {
    fn from(view: ExperienceView) -> Self {
        let company_id = match &view {
            ExperienceView::Admin { company_id } => company_id.as_ref().map(ToString::to_string),
            ExperienceView::Member | ExperienceView::NoAccess => None,
        };
        Self {
            view: view.as_str().to_string(),
            company_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterHealthResponse {
    pub status: String,
    pub records: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("Unauthorized")]
    Unauthenticated,
    #[error("Forbidden")]
    Forbidden,
    #[error("{0}")]
    NotFound(String),
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    /// Maps a wiring failure, logging internal detail that never reaches the
    /// response body.
    pub fn from_os(operation: &'static str, err: FeedbackOsError) -> Self {
        match err {
            FeedbackOsError::Validation(violation) => ApiError::Validation(violation.to_string()),
            FeedbackOsError::Unauthenticated => ApiError::Unauthenticated,
            FeedbackOsError::Forbidden(_) => ApiError::Forbidden,
            FeedbackOsError::NotFound(what) => ApiError::NotFound(format!("{what} not found")),
            FeedbackOsError::Internal(detail) => {
                error!(operation, detail = %detail, "request failed");
                ApiError::Internal
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::Unauthenticated => "unauthenticated",
            ApiError::Forbidden => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Internal => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
            kind: self.kind().to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[derive(Debug, Clone)]
struct AdapterPersistenceConfig {
    journal_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum JournalMutation {
    Insert {
        record: FeedbackRecord,
    },
    SetVisible {
        feedback_id: FeedbackId,
        visible: bool,
    },
    SetSentiment {
        feedback_id: FeedbackId,
        sentiment: Sentiment,
    },
    Delete {
        feedback_id: FeedbackId,
    },
}

impl JournalMutation {
    fn from_applied(applied: &AppliedWrite) -> Self {
        match applied {
            AppliedWrite::Inserted(record) => JournalMutation::Insert {
                record: record.clone(),
            },
            AppliedWrite::Updated { record, effect } => match *effect {
                ModerationEffect::SetVisible(visible) => JournalMutation::SetVisible {
                    feedback_id: record.id.clone(),
                    visible,
                },
                ModerationEffect::SetSentiment(sentiment) => JournalMutation::SetSentiment {
                    feedback_id: record.id.clone(),
                    sentiment,
                },
                ModerationEffect::Delete => JournalMutation::Delete {
                    feedback_id: record.id.clone(),
                },
            },
            AppliedWrite::Deleted(record) => JournalMutation::Delete {
                feedback_id: record.id.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct AdapterJournalEntry {
    schema_version: u8,
    mutation: JournalMutation,
}

impl AdapterJournalEntry {
    fn v1(mutation: JournalMutation) -> Self {
        Self {
            schema_version: 1,
            mutation,
        }
    }
}

/// Feedback store shared across requests. Every write is appended to the
/// journal while the store lock is still held, so journal order is apply
/// order.
#[derive(Debug)]
pub struct JournaledFeedbackStore {
    store: Arc<Mutex<FeedbackStore>>,
    persistence: Option<AdapterPersistenceConfig>,
}

impl JournaledFeedbackStore {
    pub fn in_memory(store: Arc<Mutex<FeedbackStore>>) -> Self {
        Self {
            store,
            persistence: None,
        }
    }

    /// Opens (creating if needed) the journal at `journal_path` and replays it
    /// into `store`.
    pub fn with_journal(
        store: Arc<Mutex<FeedbackStore>>,
        journal_path: PathBuf,
    ) -> Result<Self, String> {
        let journaled = Self {
            store,
            persistence: Some(AdapterPersistenceConfig { journal_path }),
        };
        journaled.ensure_persistence_ready()?;
        journaled.replay_journal_into_store()?;
        Ok(journaled)
    }

    pub fn record_count(&self) -> Result<usize, FeedbackOsError> {
        let store = self
            .store
            .lock()
            .map_err(|_| FeedbackOsError::lock_poisoned())?;
        Ok(store.len())
    }

    fn journal_path(&self) -> Option<&std::path::Path> {
        self.persistence.as_ref().map(|p| p.journal_path.as_path())
    }

    fn ensure_persistence_ready(&self) -> Result<(), String> {
        let Some(path) = self.journal_path() else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| journal_error(path, "create directory", err))?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| journal_error(path, "create", err))?;
        Ok(())
    }

    fn replay_journal_into_store(&self) -> Result<(), String> {
        let Some(path) = self.journal_path() else {
            return Ok(());
        };
        let file = File::open(path).map_err(|err| journal_error(path, "open", err))?;
        let mut store = self
            .store
            .lock()
            .map_err(|_| "feedback store lock poisoned".to_string())?;
        let mut replayed = 0usize;
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line_no = idx + 1;
            let line = line.map_err(|err| journal_error(path, &format!("read line {line_no}"), err))?;
            let Some(mutation) = decode_journal_line(&line)
                .map_err(|err| journal_error(path, &format!("parse line {line_no}"), err))?
            else {
                continue;
            };
            replay_mutation(&mut store, mutation)
                .map_err(|err| journal_error(path, &format!("replay line {line_no}"), err))?;
            replayed += 1;
        }
        info!(
            journal = %path.display(),
            entries = replayed,
            records = store.len(),
            "feedback journal replayed"
        );
        Ok(())
    }

    fn append_journal_entry(&self, mutation: JournalMutation) -> Result<(), String> {
        let Some(path) = self.journal_path() else {
            return Ok(());
        };
        let mut line = serde_json::to_string(&AdapterJournalEntry::v1(mutation))
            .map_err(|err| journal_error(path, "encode entry", err))?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| journal_error(path, "open for append", err))?;
        file.write_all(line.as_bytes())
            .and_then(|()| file.sync_data())
            .map_err(|err| journal_error(path, "append", err))
    }
}

fn journal_error(path: &std::path::Path, action: &str, err: impl std::fmt::Display) -> String {
    format!("feedback journal '{}': {action} failed: {err}", path.display())
}

/// Blank lines decode to `None`.
fn decode_journal_line(line: &str) -> Result<Option<JournalMutation>, String> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    let entry: AdapterJournalEntry = serde_json::from_str(line).map_err(|err| err.to_string())?;
    if entry.schema_version != 1 {
        return Err(format!("unsupported schema_version={}", entry.schema_version));
    }
    Ok(Some(entry.mutation))
}

fn replay_mutation(store: &mut FeedbackStore, mutation: JournalMutation) -> Result<(), String> {
    let write = match mutation {
        JournalMutation::Insert { record } => {
            return store
                .restore_feedback_row(record)
                .map_err(|err| err.to_string());
        }
        JournalMutation::SetVisible {
            feedback_id,
            visible,
        } => FeedbackWrite::Apply {
            feedback_id,
            effect: ModerationEffect::SetVisible(visible),
        },
        JournalMutation::SetSentiment {
            feedback_id,
            sentiment,
        } => FeedbackWrite::Apply {
            feedback_id,
            effect: ModerationEffect::SetSentiment(sentiment),
        },
        JournalMutation::Delete { feedback_id } => FeedbackWrite::Apply {
            feedback_id,
            effect: ModerationEffect::Delete,
        },
    };
    apply_write(store, write)
        .map(|_| ())
        .map_err(|err| err.to_string())
}

impl FeedbackLedger for JournaledFeedbackStore {
    fn feedback_row(&self, id: &FeedbackId) -> Result<Option<FeedbackRecord>, FeedbackOsError> {
        let store = self
            .store
            .lock()
            .map_err(|_| FeedbackOsError::lock_poisoned())?;
        Ok(FeedbackRepo::feedback_row(&*store, id))
    }

    fn feedback_rows(&self, filter: &FeedbackFilter) -> Result<Vec<FeedbackRecord>, FeedbackOsError> {
        let store = self
            .store
            .lock()
            .map_err(|_| FeedbackOsError::lock_poisoned())?;
        Ok(FeedbackRepo::feedback_rows(&*store, filter))
    }

    fn write(&self, write: FeedbackWrite) -> Result<AppliedWrite, FeedbackOsError> {
        let mut store = self
            .store
            .lock()
            .map_err(|_| FeedbackOsError::lock_poisoned())?;
        let applied = apply_write(&mut *store, write)?;
        self.append_journal_entry(JournalMutation::from_applied(&applied))
            .map_err(FeedbackOsError::Internal)?;
        Ok(applied)
    }
}

#[derive(Clone)]
pub struct AdapterRuntime {
    wiring: FeedbackWiring,
    gate: Arc<dyn IdentityGate>,
    ledger: Arc<JournaledFeedbackStore>,
}

impl AdapterRuntime {
    pub fn new_in_memory(gate: Arc<dyn IdentityGate>, config: FeedbackWiringConfig) -> Self {
        Self {
            wiring: FeedbackWiring::new(config),
            gate,
            ledger: Arc::new(JournaledFeedbackStore::in_memory(Arc::new(Mutex::new(
                FeedbackStore::new_in_memory(),
            )))),
        }
    }

    pub fn new_with_persistence(
        gate: Arc<dyn IdentityGate>,
        config: FeedbackWiringConfig,
        journal_path: PathBuf,
    ) -> Result<Self, String> {
        let store = Arc::new(Mutex::new(FeedbackStore::new_in_memory()));
        Ok(Self {
            wiring: FeedbackWiring::new(config),
            gate,
            ledger: Arc::new(JournaledFeedbackStore::with_journal(store, journal_path)?),
        })
    }

    pub fn from_config(config: &AdapterConfig) -> Result<Self, String> {
        let gate = build_identity_gate(config)?;
        let wiring_config = FeedbackWiringConfig {
            query: FeedbackQueryConfig {
                company_scope: config.company_scope,
            },
            enforce_admin: config.enforce_admin,
            ..FeedbackWiringConfig::mvp_v1()
        };
        Self::new_with_persistence(gate, wiring_config, config.store_path.clone())
    }

    pub fn default_from_env() -> Result<Self, String> {
        Self::from_config(&AdapterConfig::from_env())
    }

    pub fn authenticate(&self, token: &str) -> Result<(), FeedbackOsError> {
        self.wiring
            .authenticate(self.gate.as_ref(), token)
            .map(|_| ())
    }

    pub fn submit_feedback(
        &self,
        token: &str,
        request: CreateFeedbackRequest,
    ) -> Result<CreateFeedbackResponse, FeedbackOsError> {
        let (_, view) = self.wiring.submit(
            self.gate.as_ref(),
            self.ledger.as_ref(),
            token,
            request.experience_id.as_deref(),
            request.content.as_deref(),
            UnixTimeNs(system_time_now_ns()),
        )?;
        Ok(CreateFeedbackResponse {
            success: true,
            feedback: FeedbackViewBody::from(&view),
        })
    }

    pub fn fetch_feedback(
        &self,
        token: &str,
        params: FetchFeedbackParams,
    ) -> Result<FetchFeedbackResponse, FeedbackOsError> {
        let views = self.wiring.fetch(
            self.gate.as_ref(),
            self.ledger.as_ref(),
            token,
            params.company_id.as_deref(),
            params.experience_id.as_deref(),
            params.visibility.as_deref(),
        )?;
        Ok(FetchFeedbackResponse {
            feedbacks: views.iter().map(FeedbackViewBody::from).collect(),
        })
    }

    pub fn feedback_summary(
        &self,
        token: &str,
        params: SummaryParams,
    ) -> Result<SummaryResponse, FeedbackOsError> {
        let summary = self.wiring.summary(
            self.gate.as_ref(),
            self.ledger.as_ref(),
            token,
            params.company_id.as_deref(),
            UnixTimeNs(system_time_now_ns()),
        )?;
        Ok(SummaryResponse::from(summary))
    }

    pub fn moderate_feedback(
        &self,
        token: &str,
        request: ModerateFeedbackRequest,
    ) -> Result<SuccessResponse, FeedbackOsError> {
        self.wiring.moderate(
            self.gate.as_ref(),
            self.ledger.as_ref(),
            token,
            request.feedback_id.as_deref(),
            request.action.as_deref(),
            request.sentiment.as_deref(),
        )?;
        Ok(SuccessResponse { success: true })
    }

    pub fn dashboard_access(
        &self,
        token: &str,
        company_id: &str,
    ) -> Result<DashboardAccessResponse, FeedbackOsError> {
        self.wiring
            .check_dashboard_access(self.gate.as_ref(), token, company_id)
            .map(DashboardAccessResponse::from)
    }

    pub fn experience_view(
        &self,
        token: &str,
        experience_id: &str,
    ) -> Result<ExperienceViewResponse, FeedbackOsError> {
        self.wiring
            .resolve_experience_view(self.gate.as_ref(), token, experience_id)
            .map(ExperienceViewResponse::from)
    }

    pub fn health_report(&self) -> Result<AdapterHealthResponse, FeedbackOsError> {
        Ok(AdapterHealthResponse {
            status: "ok".to_string(),
            records: self.ledger.record_count()?,
        })
    }
}

fn build_identity_gate(config: &AdapterConfig) -> Result<Arc<dyn IdentityGate>, String> {
    if let Some(platform) = &config.platform {
        let gate = PlatformIdentityGate::new(platform.clone())
            .map_err(|err| format!("invalid platform gate configuration: {err}"))?;
        info!(base_url = %platform.base_url, "using platform identity gate");
        return Ok(Arc::new(gate));
    }
    if let Some(path) = &config.fixture_path {
        let raw = fs::read_to_string(path).map_err(|err| {
            format!("failed to read identity fixture '{}': {}", path.display(), err)
        })?;
        let gate = StaticIdentityGate::from_fixture_json(&raw)
            .map_err(|err| format!("invalid identity fixture '{}': {}", path.display(), err))?;
        info!(fixture = %path.display(), "using fixture identity gate");
        return Ok(Arc::new(gate));
    }
    warn!("no HUSH_PLATFORM_BASE_URL or HUSH_FIXTURE_PATH; every caller is unauthenticated");
    Ok(Arc::new(StaticIdentityGate::new()))
}

pub fn router(runtime: AdapterRuntime) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/feedback/create", post(create_feedback))
        .route("/api/feedback/fetch", get(fetch_feedback))
        .route("/api/feedback/summary", get(feedback_summary))
        .route("/api/feedback/moderate", post(moderate_feedback))
        .route("/api/dashboard/:company_id/access", get(dashboard_access))
        .route("/api/experiences/:experience_id/view", get(experience_view))
        .with_state(runtime)
}

/// `x-user-token` first, then `Authorization: Bearer`. Empty when neither is
/// present; the identity gate rejects it.
pub fn caller_token(headers: &HeaderMap) -> String {
    if let Some(token) = headers
        .get(USER_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return token.to_string();
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim().to_string())
        .unwrap_or_default()
}

async fn run_blocking<T, F>(operation: &'static str, job: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, FeedbackOsError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(job).await {
        Ok(result) => result.map_err(|err| ApiError::from_os(operation, err)),
        Err(join_err) => {
            error!(operation, error = %join_err, "blocking task failed");
            Err(ApiError::Internal)
        }
    }
}

/// Reports an extractor rejection only for a caller the gate recognises.
async fn reject_after_auth(
    runtime: AdapterRuntime,
    operation: &'static str,
    token: String,
    detail: String,
) -> ApiError {
    match run_blocking(operation, move || runtime.authenticate(&token)).await {
        Ok(()) => ApiError::Validation(detail),
        Err(err) => err,
    }
}

async fn healthz(State(runtime): State<AdapterRuntime>) -> Result<Json<AdapterHealthResponse>, ApiError> {
    runtime
        .health_report()
        .map(Json)
        .map_err(|err| ApiError::from_os("healthz", err))
}

async fn create_feedback(
    State(runtime): State<AdapterRuntime>,
    headers: HeaderMap,
    body: Result<Json<CreateFeedbackRequest>, JsonRejection>,
) -> Result<Json<CreateFeedbackResponse>, ApiError> {
    let token = caller_token(&headers);
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return Err(reject_after_auth(runtime, "create_feedback", token, rejection.body_text()).await)
        }
    };
    run_blocking("create_feedback", move || runtime.submit_feedback(&token, request))
        .await
        .map(Json)
}

async fn fetch_feedback(
    State(runtime): State<AdapterRuntime>,
    headers: HeaderMap,
    params: Result<Query<FetchFeedbackParams>, QueryRejection>,
) -> Result<Json<FetchFeedbackResponse>, ApiError> {
    let token = caller_token(&headers);
    let params = match params {
        Ok(Query(params)) => params,
        Err(rejection) => {
            return Err(reject_after_auth(runtime, "fetch_feedback", token, rejection.body_text()).await)
        }
    };
    run_blocking("fetch_feedback", move || runtime.fetch_feedback(&token, params))
        .await
        .map(Json)
}

async fn feedback_summary(
    State(runtime): State<AdapterRuntime>,
    headers: HeaderMap,
    params: Result<Query<SummaryParams>, QueryRejection>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let token = caller_token(&headers);
    let params = match params {
        Ok(Query(params)) => params,
        Err(rejection) => {
            return Err(reject_after_auth(runtime, "feedback_summary", token, rejection.body_text()).await)
        }
    };
    run_blocking("feedback_summary", move || {
        runtime.feedback_summary(&token, params)
    })
    .await
    .map(Json)
}

async fn moderate_feedback(
    State(runtime): State<AdapterRuntime>,
    headers: HeaderMap,
    body: Result<Json<ModerateFeedbackRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let token = caller_token(&headers);
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return Err(reject_after_auth(runtime, "moderate_feedback", token, rejection.body_text()).await)
        }
    };
    run_blocking("moderate_feedback", move || {
        runtime.moderate_feedback(&token, request)
    })
    .await
    .map(Json)
}

async fn dashboard_access(
    State(runtime): State<AdapterRuntime>,
    headers: HeaderMap,
    Path(company_id): Path<String>,
) -> Result<Json<DashboardAccessResponse>, ApiError> {
    let token = caller_token(&headers);
    run_blocking("dashboard_access", move || {
        runtime.dashboard_access(&token, &company_id)
    })
    .await
    .map(Json)
}

async fn experience_view(
    State(runtime): State<AdapterRuntime>,
    headers: HeaderMap,
    Path(experience_id): Path<String>,
) -> Result<Json<ExperienceViewResponse>, ApiError> {
    let token = caller_token(&headers);
    run_blocking("experience_view", move || {
        runtime.experience_view(&token, &experience_id)
    })
    .await
    .map(Json)
}

fn rfc3339(at: UnixTimeNs) -> String {
    let nanos = i64::try_from(at.0).unwrap_or(i64::MAX);
    DateTime::<Utc>::from_timestamp_nanos(nanos).to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn system_time_now_ns() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(1);
    if nanos > u64::MAX as u128 {
        u64::MAX
    } else {
        nanos as u64
    }
}
