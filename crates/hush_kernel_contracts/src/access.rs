#![forbid(unsafe_code)]

use crate::feedback::{CompanyId, ExperienceId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessLevel {
    Admin,
    Customer,
    NoAccess,
}

impl AccessLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessLevel::Admin => "admin",
            AccessLevel::Customer => "customer",
            AccessLevel::NoAccess => "no_access",
        }
    }

    /// Unknown levels degrade to `NoAccess`.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "admin" => AccessLevel::Admin,
            "customer" => AccessLevel::Customer,
            _ => AccessLevel::NoAccess,
        }
    }

    pub fn is_admin(self) -> bool {
        self == AccessLevel::Admin
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: UserId,
}

impl CallerIdentity {
    pub fn v1(user_id: UserId) -> Self {
        Self { user_id }
    }
}

/// Experience metadata as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperienceRecord {
    pub experience_id: ExperienceId,
    pub company_id: Option<CompanyId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardAccess {
    pub granted: bool,
    pub access_level: AccessLevel,
}

impl DashboardAccess {
    pub fn from_level(access_level: AccessLevel) -> Self {
        Self {
            granted: access_level.is_admin(),
            access_level,
        }
    }
}

/// Which surface a caller gets when opening an experience.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExperienceView {
    Admin { company_id: Option<CompanyId> },
    Member,
    NoAccess,
}

impl ExperienceView {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceView::Admin { .. } => "admin",
            ExperienceView::Member => "member",
            ExperienceView::NoAccess => "no_access",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_access_contract_01_levels_round_trip_and_unknown_degrades() {
        for level in [AccessLevel::Admin, AccessLevel::Customer, AccessLevel::NoAccess] {
            assert_eq!(AccessLevel::parse(level.as_str()), level);
        }
        assert_eq!(AccessLevel::parse("owner"), AccessLevel::NoAccess);
    }

    #[test]
    fn at_access_contract_02_dashboard_needs_admin() {
        assert!(DashboardAccess::from_level(AccessLevel::Admin).granted);
        assert!(!DashboardAccess::from_level(AccessLevel::Customer).granted);
    }
}
