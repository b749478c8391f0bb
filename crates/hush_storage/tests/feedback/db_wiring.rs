#![forbid(unsafe_code)]

use hush_kernel_contracts::feedback::{
    CompanyId, ExperienceId, FeedbackId, FeedbackRecordInput, Sentiment, UserId,
};
use hush_kernel_contracts::filter::FeedbackFilter;
use hush_kernel_contracts::UnixTimeNs;
use hush_storage::feedback::{FeedbackStore, StorageError};
use hush_storage::repo::FeedbackRepo;

fn exp(id: &str) -> ExperienceId {
    ExperienceId::new(id).unwrap()
}

fn company(id: &str) -> CompanyId {
    CompanyId::new(id).unwrap()
}

fn submit(
    store: &mut FeedbackStore,
    experience_id: &str,
    company_id: Option<&str>,
    at: u64,
) -> FeedbackId {
    store
        .insert_feedback_row(
            FeedbackRecordInput::v1(
                exp(experience_id),
                company_id.map(company),
                UserId::new("member_1").unwrap(),
                format!("feedback at {at}"),
                UnixTimeNs(at),
            )
            .unwrap(),
        )
        .unwrap()
        .id
}

#[test]
fn at_feedback_db_01_insert_defaults_visible_and_unlabeled() {
    let mut s = FeedbackStore::new_in_memory();
    let id = submit(&mut s, "exp_1", Some("biz_1"), 100);

    let row = s.feedback_row(&id).unwrap();
    assert!(row.visible);
    assert_eq!(row.sentiment, None);
    assert_eq!(row.company_id, Some(company("biz_1")));
}

#[test]
fn at_feedback_db_02_delete_is_permanent() {
    let mut s = FeedbackStore::new_in_memory();
    let id = submit(&mut s, "exp_1", Some("biz_1"), 100);

    s.delete_feedback_row(&id).unwrap();
    assert!(FeedbackRepo::feedback_row(&s, &id).is_none());
    assert!(FeedbackRepo::feedback_rows(&s, &FeedbackFilter::default()).is_empty());
    assert!(matches!(
        s.delete_feedback_row(&id),
        Err(StorageError::NotFound { table: "feedback", .. })
    ));
}

#[test]
fn at_feedback_db_03_updates_touch_only_visibility_and_sentiment() {
    let mut s = FeedbackStore::new_in_memory();
    let id = submit(&mut s, "exp_1", Some("biz_1"), 100);
    let before = FeedbackRepo::feedback_row(&s, &id).unwrap();

    s.update_feedback_visibility_row(&id, false).unwrap();
    let after = s.update_feedback_sentiment_row(&id, Sentiment::Negative).unwrap();

    assert!(!after.visible);
    assert_eq!(after.sentiment, Some(Sentiment::Negative));
    assert_eq!(after.content, before.content);
    assert_eq!(after.created_at, before.created_at);
    assert_eq!(after.user_id, before.user_id);
}

#[test]
fn at_feedback_db_04_updates_on_missing_rows_fail_not_found() {
    let mut s = FeedbackStore::new_in_memory();
    let ghost = FeedbackId::new("fb_missing").unwrap();
    assert!(matches!(
        s.update_feedback_visibility_row(&ghost, true),
        Err(StorageError::NotFound { .. })
    ));
    assert!(matches!(
        s.update_feedback_sentiment_row(&ghost, Sentiment::Positive),
        Err(StorageError::NotFound { .. })
    ));
}

#[test]
fn at_feedback_db_05_company_and_experience_filters_agree() {
    let mut s = FeedbackStore::new_in_memory();
    let a = submit(&mut s, "exp_1", Some("biz_1"), 100);
    let b = submit(&mut s, "exp_2", Some("biz_1"), 200);
    submit(&mut s, "exp_9", Some("biz_2"), 300);

    let by_company: Vec<FeedbackId> =
        FeedbackRepo::feedback_rows(&s, &FeedbackFilter::for_company(company("biz_1")))
            .into_iter()
            .map(|r| r.id)
            .collect();
    let by_experiences: Vec<FeedbackId> = FeedbackRepo::feedback_rows(
        &s,
        &FeedbackFilter::for_experiences([exp("exp_1"), exp("exp_2")]),
    )
    .into_iter()
    .map(|r| r.id)
    .collect();

    assert_eq!(by_company.len(), 2);
    assert!(by_company.contains(&a) && by_company.contains(&b));
    assert_eq!(by_company, by_experiences);
}

#[test]
fn at_feedback_db_06_counts_follow_the_filter() {
    let mut s = FeedbackStore::new_in_memory();
    let a = submit(&mut s, "exp_1", Some("biz_1"), 100);
    submit(&mut s, "exp_1", Some("biz_1"), 200);
    s.update_feedback_visibility_row(&a, false).unwrap();

    let visible = FeedbackFilter::for_company(company("biz_1")).with_visible(true);
    let hidden = FeedbackFilter::for_company(company("biz_1")).with_visible(false);
    assert_eq!(FeedbackRepo::count_feedback_rows(&s, &visible), 1);
    assert_eq!(FeedbackRepo::count_feedback_rows(&s, &hidden), 1);
}

#[test]
fn at_feedback_db_07_invalid_restore_is_a_contract_violation() {
    let mut s = FeedbackStore::new_in_memory();
    let id = submit(&mut s, "exp_1", Some("biz_1"), 100);
    let mut row = FeedbackRepo::feedback_row(&s, &id).unwrap();
    row.content = "  ".to_string();

    let mut replica = FeedbackStore::new_in_memory();
    assert!(matches!(
        replica.restore_feedback_row(row),
        Err(StorageError::ContractViolation(_))
    ));
}
