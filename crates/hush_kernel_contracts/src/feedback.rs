#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::common::{validate_id, validate_text};
use crate::{ContractViolation, UnixTimeNs, Validate};

pub const ID_MAX_LEN: usize = 128;
pub const CONTENT_MAX_LEN: usize = 4_000;

macro_rules! string_id {
    ($name:ident, $field:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Result<Self, ContractViolation> {
                let v = Self(id.into());
                v.validate()?;
                Ok(v)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Validate for $name {
            fn validate(&self) -> Result<(), ContractViolation> {
                validate_id($field, &self.0, ID_MAX_LEN)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ContractViolation;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(FeedbackId, "feedback_id");
string_id!(ExperienceId, "experience_id");
string_id!(CompanyId, "company_id");
string_id!(UserId, "user_id");

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative];

    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "positive" => Some(Sentiment::Positive),
            "neutral" => Some(Sentiment::Neutral),
            "negative" => Some(Sentiment::Negative),
            _ => None,
        }
    }

    pub fn score(self) -> i64 {
        match self {
            Sentiment::Positive => 1,
            Sentiment::Neutral => 0,
            Sentiment::Negative => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisibilityFilter {
    Visible,
    Hidden,
}

impl VisibilityFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            VisibilityFilter::Visible => "visible",
            VisibilityFilter::Hidden => "hidden",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "visible" => Some(VisibilityFilter::Visible),
            "hidden" => Some(VisibilityFilter::Hidden),
            _ => None,
        }
    }
}

/// Stored feedback row. `user_id` never leaves the service; read paths go
/// through [`FeedbackView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: FeedbackId,
    pub experience_id: ExperienceId,
    pub company_id: Option<CompanyId>,
    pub user_id: UserId,
    pub content: String,
    pub visible: bool,
    pub sentiment: Option<Sentiment>,
    pub created_at: UnixTimeNs,
}

impl FeedbackRecord {
    pub fn from_input(id: FeedbackId, input: FeedbackRecordInput) -> Result<Self, ContractViolation> {
        let record = Self {
            id,
            experience_id: input.experience_id,
            company_id: input.company_id,
            user_id: input.user_id,
            content: input.content,
            visible: true,
            sentiment: None,
            created_at: input.created_at,
        };
        record.validate()?;
        Ok(record)
    }
}

impl Validate for FeedbackRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.id.validate()?;
        self.experience_id.validate()?;
        if let Some(company_id) = &self.company_id {
            company_id.validate()?;
        }
        self.user_id.validate()?;
        validate_text("feedback_record.content", &self.content, CONTENT_MAX_LEN)?;
        if self.created_at.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "feedback_record.created_at",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackRecordInput {
    pub experience_id: ExperienceId,
    pub company_id: Option<CompanyId>,
    pub user_id: UserId,
    pub content: String,
    pub created_at: UnixTimeNs,
}

impl FeedbackRecordInput {
    pub fn v1(
        experience_id: ExperienceId,
        company_id: Option<CompanyId>,
        user_id: UserId,
        content: String,
        created_at: UnixTimeNs,
    ) -> Result<Self, ContractViolation> {
        let input = Self {
            experience_id,
            company_id,
            user_id,
            content,
            created_at,
        };
        input.validate()?;
        Ok(input)
    }
}

impl Validate for FeedbackRecordInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.experience_id.validate()?;
        if let Some(company_id) = &self.company_id {
            company_id.validate()?;
        }
        self.user_id.validate()?;
        validate_text("feedback_record_input.content", &self.content, CONTENT_MAX_LEN)?;
        if self.created_at.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "feedback_record_input.created_at",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}

/// Anonymous projection of a record: everything except the submitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackView {
    pub id: FeedbackId,
    pub experience_id: ExperienceId,
    pub company_id: Option<CompanyId>,
    pub content: String,
    pub visible: bool,
    pub sentiment: Option<Sentiment>,
    pub created_at: UnixTimeNs,
}

impl From<&FeedbackRecord> for FeedbackView {
    fn from(record: &FeedbackRecord) -> Self {
        Self {
            id: record.id.clone(),
            experience_id: record.experience_id.clone(),
            company_id: record.company_id.clone(),
            content: record.content.clone(),
            visible: record.visible,
            sentiment: record.sentiment,
            created_at: record.created_at,
        }
    }
}

/// Validated submission payload. The submitter comes from the identity gate,
/// never from the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitFeedbackInput {
    pub experience_id: ExperienceId,
    pub content: String,
}

impl SubmitFeedbackInput {
    pub fn from_raw(
        experience_id: Option<&str>,
        content: Option<&str>,
    ) -> Result<Self, ContractViolation> {
        let experience_id = present(experience_id).ok_or(ContractViolation::InvalidValue {
            field: "submit_feedback.experience_id",
            reason: "missing",
        })?;
        let content = present(content).ok_or(ContractViolation::InvalidValue {
            field: "submit_feedback.content",
            reason: "missing",
        })?;
        let input = Self {
            experience_id: ExperienceId::new(experience_id)?,
            content: content.to_string(),
        };
        input.validate()?;
        Ok(input)
    }
}

impl Validate for SubmitFeedbackInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.experience_id.validate()?;
        validate_text("submit_feedback.content", &self.content, CONTENT_MAX_LEN)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeedbackScope {
    Company(CompanyId),
    Experience(ExperienceId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackQuery {
    pub scope: FeedbackScope,
    pub visibility: Option<VisibilityFilter>,
}

impl FeedbackQuery {
    pub fn v1(scope: FeedbackScope, visibility: Option<VisibilityFilter>) -> Self {
        Self { scope, visibility }
    }

    /// Builds a query from raw request parameters. Empty strings count as
    /// absent. When both scopes are given the experience wins.
    pub fn from_raw(
        company_id: Option<&str>,
        experience_id: Option<&str>,
        visibility: Option<&str>,
    ) -> Result<Self, ContractViolation> {
        let scope = match (present(company_id), present(experience_id)) {
            (_, Some(experience_id)) => FeedbackScope::Experience(ExperienceId::new(experience_id)?),
            (Some(company_id), None) => FeedbackScope::Company(CompanyId::new(company_id)?),
            (None, None) => {
                return Err(ContractViolation::InvalidValue {
                    field: "feedback_query.scope",
                    reason: "companyId or experienceId is required",
                })
            }
        };
        let visibility = match present(visibility) {
            None => None,
            Some(raw) => Some(VisibilityFilter::parse(raw).ok_or(
                ContractViolation::InvalidValue {
                    field: "feedback_query.visibility",
                    reason: "must be visible or hidden",
                },
            )?),
        };
        Ok(Self { scope, visibility })
    }
}

pub(crate) fn present(raw: Option<&str>) -> Option<&str> {
    raw.filter(|v| !v.trim().is_empty())
}
