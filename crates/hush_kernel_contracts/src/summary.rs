#![forbid(unsafe_code)]

use crate::feedback::Sentiment;
use crate::{ContractViolation, Validate};

/// One grouped row: a sentiment label that has at least one visible record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentimentStat {
    pub sentiment: Sentiment,
    pub count: u64,
    pub percentage: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SentimentBreakdown {
    pub positive: u64,
    pub neutral: u64,
    pub negative: u64,
}

impl SentimentBreakdown {
    pub fn count(&self, sentiment: Sentiment) -> u64 {
        match sentiment {
            Sentiment::Positive => self.positive,
            Sentiment::Neutral => self.neutral,
            Sentiment::Negative => self.negative,
        }
    }

    pub fn labeled_total(&self) -> u64 {
        self.positive + self.neutral + self.negative
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentimentSummary {
    pub summary: Vec<SentimentStat>,
    pub total: u64,
    pub recent_count: u64,
    pub hidden_count: u64,
    pub average_sentiment: f64,
    pub sentiment_breakdown: SentimentBreakdown,
}

impl SentimentSummary {
    /// Shape returned for a company that owns no experiences.
    pub fn empty() -> Self {
        Self {
            summary: Vec::new(),
            total: 0,
            recent_count: 0,
            hidden_count: 0,
            average_sentiment: 0.0,
            sentiment_breakdown: SentimentBreakdown::default(),
        }
    }
}

impl Validate for SentimentSummary {
    fn validate(&self) -> Result<(), ContractViolation> {
        if !self.average_sentiment.is_finite()
            || !(-1.0..=1.0).contains(&self.average_sentiment)
        {
            return Err(ContractViolation::InvalidRange {
                field: "sentiment_summary.average_sentiment",
                min: -1.0,
                max: 1.0,
                got: self.average_sentiment,
            });
        }
        if self.recent_count > self.total {
            return Err(ContractViolation::InvalidValue {
                field: "sentiment_summary.recent_count",
                reason: "must be <= total",
            });
        }
        if self.sentiment_breakdown.labeled_total() > self.total {
            return Err(ContractViolation::InvalidValue {
                field: "sentiment_summary.sentiment_breakdown",
                reason: "labeled counts must be <= total",
            });
        }
        for stat in &self.summary {
            if stat.count == 0 {
                return Err(ContractViolation::InvalidValue {
                    field: "sentiment_summary.summary",
                    reason: "grouped rows must have count > 0",
                });
            }
            if stat.count != self.sentiment_breakdown.count(stat.sentiment) {
                return Err(ContractViolation::InvalidValue {
                    field: "sentiment_summary.summary",
                    reason: "must agree with sentiment_breakdown",
                });
            }
            if stat.percentage > 100 {
                return Err(ContractViolation::InvalidValue {
                    field: "sentiment_summary.summary.percentage",
                    reason: "must be <= 100",
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_summary_contract_01_empty_shape_is_valid() {
        let s = SentimentSummary::empty();
        assert!(s.validate().is_ok());
        assert!(s.summary.is_empty());
        assert_eq!(s.sentiment_breakdown, SentimentBreakdown::default());
    }

    #[test]
    fn at_summary_contract_02_average_out_of_range_is_rejected() {
        let mut s = SentimentSummary::empty();
        s.average_sentiment = 1.5;
        assert!(matches!(
            s.validate(),
            Err(ContractViolation::InvalidRange { .. })
        ));
    }

    #[test]
    fn at_summary_contract_03_grouped_rows_must_match_breakdown() {
        let mut s = SentimentSummary::empty();
        s.total = 2;
        s.sentiment_breakdown.positive = 2;
        s.summary.push(SentimentStat {
            sentiment: Sentiment::Positive,
            count: 1,
            percentage: 50,
        });
        assert!(s.validate().is_err());
    }
}
