#![forbid(unsafe_code)]

use hush_kernel_contracts::feedback::{FeedbackRecord, Sentiment};
use hush_kernel_contracts::filter::FeedbackFilter;
use hush_kernel_contracts::summary::{SentimentBreakdown, SentimentStat, SentimentSummary};
use hush_kernel_contracts::{ContractViolation, UnixTimeNs, Validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentimentAggregatorConfig {
    pub recent_window_days: u64,
}

impl SentimentAggregatorConfig {
    pub fn mvp_v1() -> Self {
        Self {
            recent_window_days: 7,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SentimentAggregator {
    config: SentimentAggregatorConfig,
}

impl SentimentAggregator {
    pub fn new(config: SentimentAggregatorConfig) -> Self {
        Self { config }
    }

    /// Summarizes every row in a company's scope, visible or not. Recomputed
    /// on each call.
    pub fn aggregate(
        &self,
        rows: &[FeedbackRecord],
        now: UnixTimeNs,
    ) -> Result<SentimentSummary, ContractViolation> {
        let recent = FeedbackFilter::default().with_created_between(
            now.saturating_sub_days(self.config.recent_window_days),
            now,
        );

        let mut breakdown = SentimentBreakdown::default();
        let mut total = 0u64;
        let mut recent_count = 0u64;
        let mut hidden_count = 0u64;
        let mut score_sum = 0i64;

        for row in rows {
            if !row.visible {
                hidden_count += 1;
                continue;
            }
            total += 1;
            if recent.matches(row) {
                recent_count += 1;
            }
            if let Some(sentiment) = row.sentiment {
                score_sum += sentiment.score();
                match sentiment {
                    Sentiment::Positive => breakdown.positive += 1,
                    Sentiment::Neutral => breakdown.neutral += 1,
                    Sentiment::Negative => breakdown.negative += 1,
                }
            }
        }

        let summary = Sentiment::ALL
            .iter()
            .map(|&sentiment| (sentiment, breakdown.count(sentiment)))
            .filter(|&(_, count)| count > 0)
            .map(|(sentiment, count)| SentimentStat {
                sentiment,
                count,
                percentage: whole_percent(count, total),
            })
            .collect();

        let out = SentimentSummary {
            summary,
            total,
            recent_count,
            hidden_count,
            average_sentiment: average_score(score_sum, breakdown.labeled_total()),
            sentiment_breakdown: breakdown,
        };
        out.validate()?;
        Ok(out)
    }
}

fn whole_percent(count: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((count as f64 / total as f64) * 100.0).round() as u32
}

fn average_score(score_sum: i64, labeled: u64) -> f64 {
    if labeled == 0 {
        return 0.0;
    }
    let rounded = ((score_sum as f64 / labeled as f64) * 100.0).round() / 100.0;
    // -0.0 would serialize with a sign
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hush_kernel_contracts::feedback::{CompanyId, ExperienceId, FeedbackId, UserId};

    const DAY: u64 = UnixTimeNs::NANOS_PER_DAY;

    fn aggregator() -> SentimentAggregator {
        SentimentAggregator::new(SentimentAggregatorConfig::mvp_v1())
    }

    fn row(id: &str, visible: bool, sentiment: Option<Sentiment>, at: u64) -> FeedbackRecord {
        FeedbackRecord {
            id: FeedbackId::new(id).unwrap(),
            experience_id: ExperienceId::new("exp_1").unwrap(),
            company_id: Some(CompanyId::new("biz_1").unwrap()),
            user_id: UserId::new("user_1").unwrap(),
            content: "x".to_string(),
            visible,
            sentiment,
            created_at: UnixTimeNs(at),
        }
    }

    #[test]
    fn at_summary_01_mixed_visible_and_hidden_rows() {
        let now = UnixTimeNs(30 * DAY);
        let rows = vec![
            row("fb_1", true, Some(Sentiment::Positive), now.0),
            row("fb_2", true, Some(Sentiment::Positive), now.0),
            row("fb_3", true, Some(Sentiment::Negative), now.0),
            row("fb_4", false, Some(Sentiment::Neutral), now.0),
        ];
        let s = aggregator().aggregate(&rows, now).unwrap();

        assert_eq!(s.total, 3);
        assert_eq!(s.hidden_count, 1);
        assert_eq!(
            s.summary,
            vec![
                SentimentStat {
                    sentiment: Sentiment::Positive,
                    count: 2,
                    percentage: 67,
                },
                SentimentStat {
                    sentiment: Sentiment::Negative,
                    count: 1,
                    percentage: 33,
                },
            ]
        );
        assert_eq!(
            s.sentiment_breakdown,
            SentimentBreakdown {
                positive: 2,
                neutral: 0,
                negative: 1,
            }
        );
        assert_eq!(s.average_sentiment, 0.33);
    }

    #[test]
    fn at_summary_02_no_rows_is_the_empty_shape() {
        let s = aggregator().aggregate(&[], UnixTimeNs(DAY)).unwrap();
        assert_eq!(s, SentimentSummary::empty());
    }

    #[test]
    fn at_summary_03_recent_window_is_sliding_and_inclusive() {
        let now = UnixTimeNs(30 * DAY + 12_345);
        let rows = vec![
            row("fb_edge", true, None, now.0 - 7 * DAY),
            row("fb_old", true, None, now.0 - 7 * DAY - 1),
            row("fb_new", true, None, now.0 - 1),
            row("fb_hidden", false, None, now.0 - 1),
            row("fb_future", true, None, now.0 + 1),
        ];
        let s = aggregator().aggregate(&rows, now).unwrap();
        assert_eq!(s.total, 4);
        assert_eq!(s.recent_count, 2);
    }

    #[test]
    fn at_summary_04_unlabeled_rows_count_in_total_only() {
        let now = UnixTimeNs(DAY);
        let rows = vec![
            row("fb_1", true, None, now.0),
            row("fb_2", true, None, now.0),
            row("fb_3", true, Some(Sentiment::Negative), now.0),
            row("fb_4", true, Some(Sentiment::Neutral), now.0),
        ];
        let s = aggregator().aggregate(&rows, now).unwrap();
        assert_eq!(s.total, 4);
        assert_eq!(s.summary.len(), 2);
        assert_eq!(s.summary[0].sentiment, Sentiment::Neutral);
        assert_eq!(s.summary[0].percentage, 25);
        assert_eq!(s.average_sentiment, -0.5);
    }

    #[test]
    fn at_summary_05_balanced_scores_average_to_plain_zero() {
        let now = UnixTimeNs(DAY);
        let rows = vec![
            row("fb_1", true, Some(Sentiment::Positive), now.0),
            row("fb_2", true, Some(Sentiment::Negative), now.0),
        ];
        let s = aggregator().aggregate(&rows, now).unwrap();
        assert_eq!(s.average_sentiment, 0.0);
        assert!(s.average_sentiment.is_sign_positive());
    }

    #[test]
    fn at_summary_06_only_hidden_rows() {
        let now = UnixTimeNs(DAY);
        let rows = vec![row("fb_1", false, Some(Sentiment::Positive), now.0)];
        let s = aggregator().aggregate(&rows, now).unwrap();
        assert_eq!(s.total, 0);
        assert_eq!(s.hidden_count, 1);
        assert!(s.summary.is_empty());
        assert_eq!(s.average_sentiment, 0.0);
    }

    #[test]
    fn at_summary_07_half_way_values_round_away_from_zero() {
        assert_eq!(whole_percent(1, 8), 13);
        assert_eq!(whole_percent(3, 8), 38);
        assert_eq!(average_score(-2, 3), -0.67);
        assert_eq!(average_score(-1, 8), -0.13);

        let now = UnixTimeNs(DAY);
        let mut rows = vec![row("fb_0", true, Some(Sentiment::Positive), now.0)];
        for i in 1..8 {
            rows.push(row(&format!("fb_{i}"), true, Some(Sentiment::Neutral), now.0));
        }
        let s = aggregator().aggregate(&rows, now).unwrap();
        assert_eq!(s.summary[0].sentiment, Sentiment::Positive);
        assert_eq!(s.summary[0].percentage, 13);
        assert_eq!(s.summary[1].percentage, 88);

        let rows = vec![
            row("fb_1", true, Some(Sentiment::Negative), now.0),
            row("fb_2", true, Some(Sentiment::Negative), now.0),
            row("fb_3", true, Some(Sentiment::Neutral), now.0),
        ];
        let s = aggregator().aggregate(&rows, now).unwrap();
        assert_eq!(s.average_sentiment, -0.67);
    }
}
