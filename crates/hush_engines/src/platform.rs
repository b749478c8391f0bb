#![forbid(unsafe_code)]

//! HTTP-backed [`IdentityGate`] for the host community platform.

use std::time::Duration;

use hush_kernel_contracts::access::{AccessLevel, CallerIdentity, ExperienceRecord};
use hush_kernel_contracts::feedback::{CompanyId, ExperienceId, UserId};
use serde::Deserialize;
use tracing::warn;
use url::Url;

use crate::identity::{AccessResource, GateError, IdentityGate};

pub const USER_TOKEN_HEADER: &str = "x-user-token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformGateConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl PlatformGateConfig {
    pub fn mvp_v1(base_url: String, api_key: String) -> Self {
        Self {
            base_url,
            api_key,
            timeout_ms: 5_000,
            user_agent: concat!("hush/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlatformIdentityGate {
    agent: ureq::Agent,
    base_url: Url,
    api_key: String,
}

impl PlatformIdentityGate {
    pub fn new(config: PlatformGateConfig) -> Result<Self, GateError> {
        if config.timeout_ms == 0 {
            return Err(GateError::Unavailable("timeout must be > 0".to_string()));
        }
        let base_url = Url::parse(&config.base_url)
            .map_err(|err| GateError::Unavailable(format!("invalid platform base url: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(GateError::Unavailable(
                "platform base url cannot carry a path".to_string(),
            ));
        }
        let timeout = Duration::from_millis(config.timeout_ms.max(100));
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout_write(timeout)
            .user_agent(&config.user_agent)
            .build();
        Ok(Self {
            agent,
            base_url,
            api_key: config.api_key,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, GateError> {
        endpoint_url(&self.base_url, segments)
    }

    fn get(&self, url: &Url) -> ureq::Request {
        self.agent
            .get(url.as_str())
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("Accept", "application/json")
    }
}

impl IdentityGate for PlatformIdentityGate {
    fn resolve_caller(&self, token: &str) -> Result<CallerIdentity, GateError> {
        if token.trim().is_empty() {
            return Err(GateError::Unauthenticated);
        }
        let url = self.endpoint(&["me"])?;
        match self.get(&url).set(USER_TOKEN_HEADER, token).call() {
            Ok(resp) => {
                let body: MeResponse = resp
                    .into_json()
                    .map_err(|err| GateError::MalformedResponse(format!("me: {err}")))?;
                let user_id = UserId::new(body.id)
                    .map_err(|err| GateError::MalformedResponse(format!("me.id: {err}")))?;
                Ok(CallerIdentity::v1(user_id))
            }
            Err(ureq::Error::Status(401, _)) | Err(ureq::Error::Status(403, _)) => {
                Err(GateError::Unauthenticated)
            }
            Err(err) => Err(gate_error_from_ureq("me", err)),
        }
    }

    fn check_access_level(
        &self,
        resource: &AccessResource,
        user_id: &UserId,
    ) -> Result<AccessLevel, GateError> {
        let url = self.endpoint(&["users", user_id.as_str(), "access", resource.id()])?;
        match self.get(&url).call() {
            Ok(resp) => {
                let body: AccessResponse = resp
                    .into_json()
                    .map_err(|err| GateError::MalformedResponse(format!("access: {err}")))?;
                Ok(AccessLevel::parse(&body.access_level))
            }
            Err(ureq::Error::Status(404, _)) => Ok(AccessLevel::NoAccess),
            Err(err) => Err(gate_error_from_ureq("access", err)),
        }
    }

    fn list_experiences(&self, company_id: &CompanyId) -> Result<Vec<ExperienceRecord>, GateError> {
        let url = self.endpoint(&["companies", company_id.as_str(), "experiences"])?;
        match self.get(&url).call() {
            Ok(resp) => {
                let body: ExperienceListResponse = resp.into_json().map_err(|err| {
                    GateError::MalformedResponse(format!("company experiences: {err}"))
                })?;
                body.data
                    .into_iter()
                    .map(ExperienceBody::into_record)
                    .collect()
            }
            Err(ureq::Error::Status(404, _)) => Ok(Vec::new()),
            Err(err) => Err(gate_error_from_ureq("company experiences", err)),
        }
    }

    fn retrieve_experience(
        &self,
        experience_id: &ExperienceId,
    ) -> Result<Option<ExperienceRecord>, GateError> {
        let url = self.endpoint(&["experiences", experience_id.as_str()])?;
        match self.get(&url).call() {
            Ok(resp) => {
                let body: ExperienceBody = resp
                    .into_json()
                    .map_err(|err| GateError::MalformedResponse(format!("experience: {err}")))?;
                body.into_record().map(Some)
            }
            Err(ureq::Error::Status(404, _)) => Ok(None),
            Err(err) => Err(gate_error_from_ureq("experience", err)),
        }
    }
}

fn endpoint_url(base: &Url, segments: &[&str]) -> Result<Url, GateError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| GateError::Unavailable("platform base url cannot carry a path".to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn gate_error_from_ureq(call: &'static str, err: ureq::Error) -> GateError {
    match err {
        ureq::Error::Status(status, _) => {
            warn!(call, status, "platform call rejected");
            GateError::Unavailable(format!("{call}: http status {status}"))
        }
        ureq::Error::Transport(transport) => {
            warn!(call, kind = ?transport.kind(), "platform transport failure");
            GateError::Unavailable(format!("{call}: transport {}", transport.kind()))
        }
    }
}

#[derive(Debug, Deserialize)]
struct MeResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct AccessResponse {
    access_level: String,
}

#[derive(Debug, Deserialize)]
struct ExperienceListResponse {
    #[serde(default)]
    data: Vec<ExperienceBody>,
}

#[derive(Debug, Deserialize)]
struct ExperienceBody {
    id: String,
    company: Option<CompanyRef>,
}

#[derive(Debug, Deserialize)]
struct CompanyRef {
    id: String,
}

impl ExperienceBody {
    fn into_record(self) -> Result<ExperienceRecord, GateError> {
        let experience_id = ExperienceId::new(self.id)
            .map_err(|err| GateError::MalformedResponse(format!("experience.id: {err}")))?;
        let company_id = self
            .company
            .map(|company| CompanyId::new(company.id))
            .transpose()
            .map_err(|err| GateError::MalformedResponse(format!("experience.company.id: {err}")))?;
        Ok(ExperienceRecord {
            experience_id,
            company_id,
        })
    }
}
