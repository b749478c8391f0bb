#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::feedback::{CompanyId, ExperienceId, FeedbackRecord};
use crate::UnixTimeNs;

/// Conjunctive row predicate evaluated by the feedback store. Unset fields
/// match everything.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeedbackFilter {
    pub company_id: Option<CompanyId>,
    pub experience_ids: Option<BTreeSet<ExperienceId>>,
    pub visible: Option<bool>,
    pub created_at_or_after: Option<UnixTimeNs>,
    pub created_at_or_before: Option<UnixTimeNs>,
}

impl FeedbackFilter {
    pub fn for_company(company_id: CompanyId) -> Self {
        Self {
            company_id: Some(company_id),
            ..Self::default()
        }
    }

    pub fn for_experiences(experience_ids: impl IntoIterator<Item = ExperienceId>) -> Self {
        Self {
            experience_ids: Some(experience_ids.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    pub fn with_created_between(mut self, from: UnixTimeNs, to: UnixTimeNs) -> Self {
        self.created_at_or_after = Some(from);
        self.created_at_or_before = Some(to);
        self
    }

    pub fn matches(&self, record: &FeedbackRecord) -> bool {
        if let Some(company_id) = &self.company_id {
            if record.company_id.as_ref() != Some(company_id) {
                return false;
            }
        }
        if let Some(experience_ids) = &self.experience_ids {
            if !experience_ids.contains(&record.experience_id) {
                return false;
            }
        }
        if let Some(visible) = self.visible {
            if record.visible != visible {
                return false;
            }
        }
        if let Some(from) = self.created_at_or_after {
            if record.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.created_at_or_before {
            if record.created_at > to {
                return false;
            }
        }
        true
    }
}

/// Newest first; equal timestamps fall back to id ascending.
pub fn newest_first(a: &FeedbackRecord, b: &FeedbackRecord) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::{FeedbackId, UserId};

    fn record(id: &str, exp: &str, company: Option<&str>, at: u64) -> FeedbackRecord {
        FeedbackRecord {
            id: FeedbackId::new(id).unwrap(),
            experience_id: ExperienceId::new(exp).unwrap(),
            company_id: company.map(|c| CompanyId::new(c).unwrap()),
            user_id: UserId::new("user_1").unwrap(),
            content: "text".to_string(),
            visible: true,
            sentiment: None,
            created_at: UnixTimeNs(at),
        }
    }

    #[test]
    fn at_filter_01_default_matches_everything() {
        assert!(FeedbackFilter::default().matches(&record("fb_1", "exp_1", None, 5)));
    }

    #[test]
    fn at_filter_02_company_filter_skips_unlinked_rows() {
        let f = FeedbackFilter::for_company(CompanyId::new("biz_1").unwrap());
        assert!(f.matches(&record("fb_1", "exp_1", Some("biz_1"), 5)));
        assert!(!f.matches(&record("fb_2", "exp_1", None, 5)));
        assert!(!f.matches(&record("fb_3", "exp_1", Some("biz_2"), 5)));
    }

    #[test]
    fn at_filter_03_window_is_inclusive_on_both_ends() {
        let f = FeedbackFilter::default().with_created_between(UnixTimeNs(10), UnixTimeNs(20));
        assert!(f.matches(&record("fb_1", "exp_1", None, 10)));
        assert!(f.matches(&record("fb_2", "exp_1", None, 20)));
        assert!(!f.matches(&record("fb_3", "exp_1", None, 9)));
        assert!(!f.matches(&record("fb_4", "exp_1", None, 21)));
    }

    #[test]
    fn at_filter_04_visibility_and_experience_set() {
        let f = FeedbackFilter::for_experiences([ExperienceId::new("exp_1").unwrap()])
            .with_visible(false);
        let mut r = record("fb_1", "exp_1", None, 5);
        assert!(!f.matches(&r));
        r.visible = false;
        assert!(f.matches(&r));
        assert!(!f.matches(&record("fb_2", "exp_2", None, 5)));
    }

    #[test]
    fn at_filter_05_newest_first_breaks_ties_by_id() {
        let mut rows = vec![
            record("fb_b", "exp_1", None, 5),
            record("fb_c", "exp_1", None, 9),
            record("fb_a", "exp_1", None, 5),
        ];
        rows.sort_by(newest_first);
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["fb_c", "fb_a", "fb_b"]);
    }
}
