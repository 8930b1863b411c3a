//! Category counts for dashboard summary cards.
//!
//! Everything here is recomputed from the collection it is given. Nothing
//! is cached, so a refreshed collection always yields fresh counts.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::model::{Contract, ContractEntity, ContractStatus, RiskFinding, RiskLevel};

/// Anything that carries an optional severity.
pub trait RiskBearing {
    fn risk_level(&self) -> Option<RiskLevel>;
}

impl RiskBearing for Contract {
    fn risk_level(&self) -> Option<RiskLevel> {
        self.risk
    }
}

impl RiskBearing for RiskFinding {
    fn risk_level(&self) -> Option<RiskLevel> {
        self.level
    }
}

impl RiskBearing for ContractEntity {
    fn risk_level(&self) -> Option<RiskLevel> {
        self.initial_risk
    }
}

impl<T: RiskBearing + ?Sized> RiskBearing for &T {
    fn risk_level(&self) -> Option<RiskLevel> {
        (**self).risk_level()
    }
}

// ── Risk ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RiskSummary {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    /// Items without a risk level.
    pub unassessed: usize,
    /// Every item, assessed or not.
    pub total: usize,
}

impl RiskSummary {
    pub fn from_items<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: RiskBearing,
    {
        items.into_iter().fold(Self::default(), |mut acc, item| {
            match item.risk_level() {
                Some(RiskLevel::High) => acc.high += 1,
                Some(RiskLevel::Medium) => acc.medium += 1,
                Some(RiskLevel::Low) => acc.low += 1,
                None => acc.unassessed += 1,
            }
            acc.total += 1;
            acc
        })
    }

    pub fn count(&self, level: RiskLevel) -> usize {
        match level {
            RiskLevel::High => self.high,
            RiskLevel::Medium => self.medium,
            RiskLevel::Low => self.low,
        }
    }

    pub fn assessed(&self) -> usize {
        self.high + self.medium + self.low
    }

    /// Share of `total`, rounded to one decimal. Zero when `total` is zero.
    pub fn percentage(&self, level: RiskLevel) -> f64 {
        share(self.count(level), self.total)
    }
}

fn share(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 1000.0).round() / 10.0
}

// ── Status ──

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusCounts {
    pub by_status: BTreeMap<ContractStatus, usize>,
    pub total: usize,
}

impl StatusCounts {
    pub fn from_contracts<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a Contract>,
    {
        let mut counts = Self::default();
        for c in rows {
            *counts.by_status.entry(c.status).or_default() += 1;
            counts.total += 1;
        }
        counts
    }

    pub fn get(&self, status: ContractStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }

    pub fn percentage(&self, status: ContractStatus) -> f64 {
        share(self.get(status), self.total)
    }
}

// ── Expiry ──

/// Contracts ending within 30, 60, and 90 days of `today`.
///
/// Windows are cumulative: a contract ending in 10 days counts in all
/// three. Contracts already past their end date count as `expired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExpiryBuckets {
    pub within_30: usize,
    pub within_60: usize,
    pub within_90: usize,
    pub expired: usize,
}

impl ExpiryBuckets {
    pub fn from_contracts<'a, I>(rows: I, today: NaiveDate) -> Self
    where
        I: IntoIterator<Item = &'a Contract>,
    {
        let mut buckets = Self::default();
        for end in rows.into_iter().filter_map(|c| c.end_date) {
            let days = (end - today).num_days();
            if days < 0 {
                buckets.expired += 1;
                continue;
            }
            if days <= 30 {
                buckets.within_30 += 1;
            }
            if days <= 60 {
                buckets.within_60 += 1;
            }
            if days <= 90 {
                buckets.within_90 += 1;
            }
        }
        buckets
    }
}

/// Contracts whose end date falls in `[today, today + days]`, input order.
pub fn expiring_within<'a, I>(rows: I, today: NaiveDate, days: i64) -> Vec<&'a Contract>
where
    I: IntoIterator<Item = &'a Contract>,
{
    rows.into_iter()
        .filter(|c| {
            c.end_date
                .map(|end| (end - today).num_days())
                .is_some_and(|left| (0..=days).contains(&left))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tests::contract;
    use ContractStatus::*;
    use RiskLevel::*;

    #[test]
    fn four_contract_scenario() {
        let rows = vec![
            contract("a", Draft, Some(High), None),
            contract("b", Draft, Some(High), None),
            contract("c", Draft, Some(Medium), None),
            contract("d", Draft, Some(Low), None),
        ];
        let summary = RiskSummary::from_items(&rows);
        assert_eq!(summary.high, 2);
        assert_eq!(summary.medium, 1);
        assert_eq!(summary.low, 1);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.percentage(High), 50.0);
        assert_eq!(summary.percentage(Medium), 25.0);
    }

    #[test]
    fn counts_sum_to_total_when_all_assessed() {
        let rows: Vec<_> = (0..7)
            .map(|i| contract(&i.to_string(), Draft, Some(RiskLevel::ALL[i % 3]), None))
            .collect();
        let summary = RiskSummary::from_items(&rows);
        assert_eq!(summary.high + summary.medium + summary.low, summary.total);
        let pct: f64 = RiskLevel::ALL.iter().map(|l| summary.percentage(*l)).sum();
        assert!((pct - 100.0).abs() <= 0.1 + 1e-9, "got {pct}");
    }

    #[test]
    fn thirds_round_to_one_decimal() {
        let rows = vec![
            contract("a", Draft, Some(High), None),
            contract("b", Draft, Some(Medium), None),
            contract("c", Draft, Some(Low), None),
        ];
        let summary = RiskSummary::from_items(&rows);
        assert_eq!(summary.percentage(High), 33.3);
    }

    #[test]
    fn empty_collection_has_zero_percentages() {
        let summary = RiskSummary::from_items(Vec::<Contract>::new());
        assert_eq!(summary.total, 0);
        assert_eq!(summary.percentage(High), 0.0);
    }

    #[test]
    fn unassessed_items_are_counted_separately() {
        let rows = vec![
            contract("a", Draft, Some(High), None),
            contract("b", Draft, None, None),
        ];
        let summary = RiskSummary::from_items(&rows);
        assert_eq!(summary.assessed(), 1);
        assert_eq!(summary.unassessed, 1);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.percentage(High), 50.0);
    }

    #[test]
    fn aggregation_tracks_the_collection() {
        let mut rows = vec![contract("a", Draft, Some(Low), None)];
        assert_eq!(RiskSummary::from_items(&rows).low, 1);
        rows.push(contract("b", Draft, Some(Low), None));
        assert_eq!(RiskSummary::from_items(&rows).low, 2);
    }

    #[test]
    fn findings_are_risk_bearing() {
        let findings: Vec<RiskFinding> = serde_json::from_str(
            r#"[
                {"id": 1, "contract_id": "c1", "section": "Section 8.2", "level": "High",
                 "title": "Termination for Convenience", "created_at": "2025-01-01T00:00:00Z"},
                {"id": 2, "contract_id": "c1", "section": "Section 12.1", "level": "Medium",
                 "title": "SLA tidak spesifik", "created_at": "2025-01-01T00:00:00Z"}
            ]"#,
        )
        .unwrap();
        let summary = RiskSummary::from_items(&findings);
        assert_eq!((summary.high, summary.medium, summary.low), (1, 1, 0));
    }

    #[test]
    fn status_counts() {
        let rows = vec![
            contract("a", PendingReview, None, None),
            contract("b", PendingReview, None, None),
            contract("c", Approved, None, None),
            contract("d", Active, None, None),
        ];
        let counts = StatusCounts::from_contracts(&rows);
        assert_eq!(counts.get(PendingReview), 2);
        assert_eq!(counts.get(Expired), 0);
        assert_eq!(counts.total, 4);
        assert_eq!(counts.percentage(PendingReview), 50.0);
    }

    #[test]
    fn expiry_windows_are_cumulative() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let ending = |id: &str, days: i64| {
            let mut c = contract(id, Active, None, None);
            c.end_date = Some(today + chrono::Duration::days(days));
            c
        };
        let rows = vec![
            ending("a", 0),
            ending("b", 30),
            ending("c", 45),
            ending("d", 90),
            ending("e", 91),
            ending("f", -1),
            contract("g", Active, None, None),
        ];
        let buckets = ExpiryBuckets::from_contracts(&rows, today);
        assert_eq!(
            buckets,
            ExpiryBuckets {
                within_30: 2,
                within_60: 3,
                within_90: 4,
                expired: 1,
            }
        );

        let soon: Vec<_> = expiring_within(&rows, today, 30)
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(soon, ["a", "b"]);
    }
}
