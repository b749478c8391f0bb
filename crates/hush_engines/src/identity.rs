#![forbid(unsafe_code)]

//! Capability seam to the host platform: who is calling, what they may do,
//! and which experiences a company owns.

use std::collections::BTreeMap;

use hush_kernel_contracts::access::{AccessLevel, CallerIdentity, ExperienceRecord};
use hush_kernel_contracts::feedback::{CompanyId, ExperienceId, UserId};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccessResource {
    Company(CompanyId),
    Experience(ExperienceId),
}

impl AccessResource {
    pub fn id(&self) -> &str {
        match self {
            AccessResource::Company(id) => id.as_str(),
            AccessResource::Experience(id) => id.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("caller identity could not be resolved")]
    Unauthenticated,
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
    #[error("identity provider returned a malformed response: {0}")]
    MalformedResponse(String),
}

pub trait IdentityGate: Send + Sync {
    fn resolve_caller(&self, token: &str) -> Result<CallerIdentity, GateError>;

    fn check_access_level(
        &self,
        resource: &AccessResource,
        user_id: &UserId,
    ) -> Result<AccessLevel, GateError>;

    /// Experiences currently owned by the company. An unknown company is an
    /// empty list, not an error.
    fn list_experiences(&self, company_id: &CompanyId) -> Result<Vec<ExperienceRecord>, GateError>;

    fn retrieve_experience(
        &self,
        experience_id: &ExperienceId,
    ) -> Result<Option<ExperienceRecord>, GateError>;
}

/// Table-driven gate used for local runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityGate {
    callers: BTreeMap<String, UserId>,
    experiences: BTreeMap<ExperienceId, Option<CompanyId>>,
    access: BTreeMap<(AccessResource, UserId), AccessLevel>,
}

impl StaticIdentityGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_caller(mut self, token: impl Into<String>, user_id: UserId) -> Self {
        self.callers.insert(token.into(), user_id);
        self
    }

    pub fn with_experience(
        mut self,
        experience_id: ExperienceId,
        company_id: Option<CompanyId>,
    ) -> Self {
        self.experiences.insert(experience_id, company_id);
        self
    }

    pub fn with_access(
        mut self,
        resource: AccessResource,
        user_id: UserId,
        level: AccessLevel,
    ) -> Self {
        self.access.insert((resource, user_id), level);
        self
    }

    pub fn from_fixture_json(raw: &str) -> Result<Self, GateError> {
        let fixture: GateFixture = serde_json::from_str(raw)
            .map_err(|err| GateError::MalformedResponse(format!("fixture: {err}")))?;
        let mut gate = Self::new();
        for caller in fixture.callers {
            gate = gate.with_caller(caller.token, caller.user_id);
        }
        for experience in fixture.experiences {
            gate = gate.with_experience(experience.id, experience.company_id);
        }
        for grant in fixture.access {
            let resource = match (grant.company_id, grant.experience_id) {
                (Some(company_id), None) => AccessResource::Company(company_id),
                (None, Some(experience_id)) => AccessResource::Experience(experience_id),
                _ => {
                    return Err(GateError::MalformedResponse(format!(
                        "fixture: grant for {} needs exactly one of companyId or experienceId",
                        grant.user_id.as_str()
                    )))
                }
            };
            gate = gate.with_access(resource, grant.user_id, AccessLevel::parse(&grant.level));
        }
        Ok(gate)
    }
}

impl IdentityGate for StaticIdentityGate {
    fn resolve_caller(&self, token: &str) -> Result<CallerIdentity, GateError> {
        self.callers
            .get(token)
            .cloned()
            .map(CallerIdentity::v1)
            .ok_or(GateError::Unauthenticated)
    }

    fn check_access_level(
        &self,
        resource: &AccessResource,
        user_id: &UserId,
    ) -> Result<AccessLevel, GateError> {
        Ok(self
            .access
            .get(&(resource.clone(), user_id.clone()))
            .copied()
            .unwrap_or(AccessLevel::NoAccess))
    }

    fn list_experiences(&self, company_id: &CompanyId) -> Result<Vec<ExperienceRecord>, GateError> {
        Ok(self
            .experiences
            .iter()
            .filter(|(_, owner)| owner.as_ref() == Some(company_id))
            .map(|(experience_id, owner)| ExperienceRecord {
                experience_id: experience_id.clone(),
                company_id: owner.clone(),
            })
            .collect())
    }

    fn retrieve_experience(
        &self,
        experience_id: &ExperienceId,
    ) -> Result<Option<ExperienceRecord>, GateError> {
        Ok(self
            .experiences
            .get(experience_id)
            .map(|owner| ExperienceRecord {
                experience_id: experience_id.clone(),
                company_id: owner.clone(),
            }))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GateFixture {
    #[serde(default)]
    callers: Vec<FixtureCaller>,
    #[serde(default)]
    experiences: Vec<FixtureExperience>,
    #[serde(default)]
    access: Vec<FixtureGrant>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixtureCaller {
    token: String,
    user_id: UserId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixtureExperience {
    id: ExperienceId,
    company_id: Option<CompanyId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixtureGrant {
    user_id: UserId,
    company_id: Option<CompanyId>,
    experience_id: Option<ExperienceId>,
    level: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[test]
    fn at_gate_01_unknown_token_is_unauthenticated() {
        let gate = StaticIdentityGate::new().with_caller("tok_a", user("user_a"));
        assert_eq!(
            gate.resolve_caller("tok_a").unwrap().user_id,
            user("user_a")
        );
        assert_eq!(gate.resolve_caller("nope"), Err(GateError::Unauthenticated));
    }

    #[test]
    fn at_gate_02_unknown_company_lists_nothing() {
        let gate = StaticIdentityGate::new().with_experience(
            ExperienceId::new("exp_1").unwrap(),
            Some(CompanyId::new("biz_1").unwrap()),
        );
        let listed = gate
            .list_experiences(&CompanyId::new("biz_1").unwrap())
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert!(gate
            .list_experiences(&CompanyId::new("biz_404").unwrap())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn at_gate_03_fixture_json_loads_all_tables() {
        let raw = r#"{
            "callers": [{"token": "tok_admin", "userId": "user_admin"}],
            "experiences": [{"id": "exp_1", "companyId": "biz_1"}],
            "access": [{"userId": "user_admin", "companyId": "biz_1", "level": "admin"}]
        }"#;
        let gate = StaticIdentityGate::from_fixture_json(raw).unwrap();
        let caller = gate.resolve_caller("tok_admin").unwrap();
        let level = gate
            .check_access_level(
                &AccessResource::Company(CompanyId::new("biz_1").unwrap()),
                &caller.user_id,
            )
            .unwrap();
        assert_eq!(level, AccessLevel::Admin);
        let exp = gate
            .retrieve_experience(&ExperienceId::new("exp_1").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(exp.company_id, Some(CompanyId::new("biz_1").unwrap()));
    }

    #[test]
    fn at_gate_04_bad_fixture_is_reported() {
        assert!(matches!(
            StaticIdentityGate::from_fixture_json("{\"callers\": 3}"),
            Err(GateError::MalformedResponse(_))
        ));
        let ambiguous = r#"{"access": [{"userId": "user_a", "level": "admin"}]}"#;
        assert!(matches!(
            StaticIdentityGate::from_fixture_json(ambiguous),
            Err(GateError::MalformedResponse(_))
        ));
    }

    #[test]
    fn at_gate_05_grants_are_keyed_by_resource_kind() {
        let gate = StaticIdentityGate::new().with_access(
            AccessResource::Company(CompanyId::new("shared_1").unwrap()),
            user("user_a"),
            AccessLevel::Admin,
        );
        assert_eq!(
            gate.check_access_level(
                &AccessResource::Company(CompanyId::new("shared_1").unwrap()),
                &user("user_a"),
            ),
            Ok(AccessLevel::Admin)
        );
        assert_eq!(
            gate.check_access_level(
                &AccessResource::Experience(ExperienceId::new("shared_1").unwrap()),
                &user("user_a"),
            ),
            Ok(AccessLevel::NoAccess)
        );
    }
}
