//! Contract filtering engine.
//!
//! Given rows already ordered by the caller (usually newest first), produce
//! the subset a screen displays. Predicates are applied conjunctively in a
//! fixed order: status, risk, date range, text query. The output borrows
//! from the input and keeps its order.

use chrono::NaiveDate;

use crate::model::{Contract, ContractStatus, RiskLevel};

/// Sentinel label meaning "no constraint" in status and risk selectors.
pub const ALL: &str = "All";

// ── Status ──

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Is(ContractStatus),
    AnyOf(&'static [ContractStatus]),
    /// A label outside the closed set. Matches nothing.
    Unrecognized(String),
}

/// Procurement dashboard groupings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusGroup {
    All,
    Approved,
    OnReview,
    New,
}

const ON_REVIEW: &[ContractStatus] = &[
    ContractStatus::PendingReview,
    ContractStatus::RevisionRequested,
];

impl StatusFilter {
    /// Parse a selector label. `"All"` and `""` mean no constraint.
    pub fn parse(label: &str) -> Self {
        let label = label.trim();
        if label.is_empty() || label.eq_ignore_ascii_case(ALL) {
            return StatusFilter::All;
        }
        match label.parse() {
            Ok(status) => StatusFilter::Is(status),
            Err(_) => StatusFilter::Unrecognized(label.to_string()),
        }
    }

    pub fn group(group: StatusGroup) -> Self {
        match group {
            StatusGroup::All => StatusFilter::All,
            StatusGroup::Approved => StatusFilter::Is(ContractStatus::Approved),
            StatusGroup::OnReview => StatusFilter::AnyOf(ON_REVIEW),
            StatusGroup::New => StatusFilter::Is(ContractStatus::Draft),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, StatusFilter::All)
    }

    pub fn matches(&self, status: ContractStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Is(wanted) => *wanted == status,
            StatusFilter::AnyOf(set) => set.contains(&status),
            StatusFilter::Unrecognized(_) => false,
        }
    }
}

// ── Risk ──

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RiskFilter {
    #[default]
    All,
    Is(RiskLevel),
    /// A label outside Low/Medium/High. Matches nothing.
    Unrecognized(String),
}

impl RiskFilter {
    pub fn parse(label: &str) -> Self {
        let label = label.trim();
        if label.is_empty() || label.eq_ignore_ascii_case(ALL) {
            return RiskFilter::All;
        }
        match label.parse() {
            Ok(level) => RiskFilter::Is(level),
            Err(_) => RiskFilter::Unrecognized(label.to_string()),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, RiskFilter::All)
    }

    /// Contracts without a risk level only pass `All`.
    pub fn matches(&self, risk: Option<RiskLevel>) -> bool {
        match self {
            RiskFilter::All => true,
            RiskFilter::Is(wanted) => risk == Some(*wanted),
            RiskFilter::Unrecognized(_) => false,
        }
    }
}

// ── Dates ──

/// Which contract date a range applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateField {
    #[default]
    CreatedAt,
    EndDate,
}

impl DateField {
    pub fn pick(self, contract: &Contract) -> Option<NaiveDate> {
        match self {
            DateField::CreatedAt => Some(contract.created_at.date_naive()),
            DateField::EndDate => contract.end_date,
        }
    }
}

/// Inclusive calendar-date range. Either bound may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }
}

// ── Criteria ──

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterCriteria {
    pub status: StatusFilter,
    pub risk: RiskFilter,
    pub query: String,
    pub date_range: Option<DateRange>,
    pub date_field: DateField,
}

impl FilterCriteria {
    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    pub fn with_risk(mut self, risk: RiskFilter) -> Self {
        self.risk = risk;
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_date_range(mut self, field: DateField, range: DateRange) -> Self {
        self.date_field = field;
        self.date_range = Some(range);
        self
    }

    /// True when every predicate is a no-op.
    pub fn is_identity(&self) -> bool {
        self.status.is_all()
            && self.risk.is_all()
            && self.needle().is_none()
            && self.date_range.is_none_or(|r| r.is_unbounded())
    }

    fn needle(&self) -> Option<String> {
        let q = self.query.trim();
        (!q.is_empty()).then(|| q.to_lowercase())
    }

    fn matches_date(&self, contract: &Contract) -> bool {
        match self.date_range {
            None => true,
            Some(range) if range.is_unbounded() => true,
            Some(range) => self
                .date_field
                .pick(contract)
                .is_some_and(|date| range.contains(date)),
        }
    }
}

fn text_matches(contract: &Contract, needle: &str) -> bool {
    let hit = |field: &str| field.to_lowercase().contains(needle);
    hit(&contract.name)
        || contract.first_party.as_deref().is_some_and(hit)
        || contract.second_party.as_deref().is_some_and(hit)
}

/// Apply `criteria` to `rows`, keeping input order.
///
/// Accepts anything that yields `&Contract`, so a filtered result can be
/// filtered again.
pub fn filter_contracts<'a, I>(rows: I, criteria: &FilterCriteria) -> Vec<&'a Contract>
where
    I: IntoIterator<Item = &'a Contract>,
{
    let needle = criteria.needle();
    rows.into_iter()
        .filter(|c| criteria.status.matches(c.status))
        .filter(|c| criteria.risk.matches(c.risk))
        .filter(|c| criteria.matches_date(c))
        .filter(|c| needle.as_deref().is_none_or(|q| text_matches(c, q)))
        .collect()
}

/// Keep the first `limit` rows for a compact list.
pub fn take_display<T>(mut rows: Vec<T>, limit: usize) -> Vec<T> {
    rows.truncate(limit);
    rows
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    pub(crate) fn contract(
        id: &str,
        status: ContractStatus,
        risk: Option<RiskLevel>,
        value: Option<i64>,
    ) -> Contract {
        Contract {
            id: id.to_string(),
            name: format!("Contract {id}"),
            first_party: Some("PT Integrasi Logistik Cipta Solusi".to_string()),
            second_party: Some(format!("PT Supplier {id}")),
            value_rp: value,
            duration_months: Some(12),
            start_date: None,
            end_date: None,
            status,
            risk,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap(),
            updated_at: None,
            file_url: None,
        }
    }

    /// Ten contracts with three in Pending Review.
    fn mixed() -> Vec<Contract> {
        use ContractStatus::*;
        use RiskLevel::*;
        vec![
            contract("c0", Draft, None, Some(100)),
            contract("c1", PendingReview, Some(High), Some(200)),
            contract("c2", Approved, Some(Low), Some(300)),
            contract("c3", PendingReview, Some(Medium), None),
            contract("c4", Active, Some(High), Some(500)),
            contract("c5", RevisionRequested, Some(High), Some(600)),
            contract("c6", Expired, Some(Low), Some(700)),
            contract("c7", PendingReview, None, Some(800)),
            contract("c8", Rejected, Some(Medium), Some(900)),
            contract("c9", Reviewed, Some(High), Some(1000)),
        ]
    }

    fn ids(rows: &[&Contract]) -> Vec<String> {
        rows.iter().map(|c| c.id.clone()).collect()
    }

    #[test]
    fn pending_review_scenario() {
        let rows = mixed();
        let criteria = FilterCriteria::default()
            .with_status(StatusFilter::parse("Pending Review"))
            .with_risk(RiskFilter::parse("All"));
        let out = filter_contracts(&rows, &criteria);
        assert_eq!(ids(&out), ["c1", "c3", "c7"]);
    }

    #[test]
    fn identity_filter_returns_input() {
        let rows = mixed();
        let criteria = FilterCriteria::default()
            .with_status(StatusFilter::parse("All"))
            .with_risk(RiskFilter::parse("All"))
            .with_query("");
        assert!(criteria.is_identity());
        let out = filter_contracts(&rows, &criteria);
        assert_eq!(out.len(), rows.len());
        assert!(out.iter().zip(&rows).all(|(a, b)| std::ptr::eq(*a, b)));
    }

    #[test]
    fn result_is_reference_subset() {
        let rows = mixed();
        let criteria = FilterCriteria::default().with_risk(RiskFilter::Is(RiskLevel::High));
        let out = filter_contracts(&rows, &criteria);
        assert_eq!(ids(&out), ["c1", "c4", "c5", "c9"]);
        for c in &out {
            assert!(rows.iter().any(|r| std::ptr::eq(*c, r)));
        }
    }

    #[test]
    fn composes_like_conjunction() {
        let rows = mixed();
        let f1 = FilterCriteria::default().with_risk(RiskFilter::Is(RiskLevel::High));
        let f2 = FilterCriteria::default().with_query("supplier c5");
        let both = FilterCriteria::default()
            .with_risk(RiskFilter::Is(RiskLevel::High))
            .with_query("supplier c5");

        let stepwise = filter_contracts(filter_contracts(&rows, &f1), &f2);
        let combined = filter_contracts(&rows, &both);
        assert_eq!(stepwise, combined);
    }

    #[test]
    fn reapplying_is_idempotent() {
        let rows = mixed();
        let criteria =
            FilterCriteria::default().with_status(StatusFilter::group(StatusGroup::OnReview));
        let first = filter_contracts(&rows, &criteria);
        let second = filter_contracts(&rows, &criteria);
        assert_eq!(first, second);
        assert_eq!(filter_contracts(first.clone(), &criteria), first);
    }

    #[test]
    fn query_matches_name_and_parties_case_insensitively() {
        let mut rows = mixed();
        rows[2].name = "Terminal Operations Agreement".into();
        rows[4].first_party = Some("Maritime Corp".into());
        rows[6].second_party = Some("MARITIME Logistics".into());

        let by_name = filter_contracts(&rows, &FilterCriteria::default().with_query("  TERMINAL "));
        assert_eq!(ids(&by_name), ["c2"]);

        let by_party = filter_contracts(&rows, &FilterCriteria::default().with_query("maritime"));
        assert_eq!(ids(&by_party), ["c4", "c6"]);
    }

    #[test]
    fn unknown_labels_match_nothing() {
        let rows = mixed();
        let status = FilterCriteria::default().with_status(StatusFilter::parse("Archived"));
        assert!(filter_contracts(&rows, &status).is_empty());
        let risk = FilterCriteria::default().with_risk(RiskFilter::parse("Critical"));
        assert!(filter_contracts(&rows, &risk).is_empty());
    }

    #[test]
    fn unknown_status_rows_only_pass_all() {
        let mut rows = mixed();
        rows[0].status = ContractStatus::Unknown;
        for status in ContractStatus::ALL {
            let criteria = FilterCriteria::default().with_status(StatusFilter::Is(status));
            let out = filter_contracts(&rows, &criteria);
            assert!(!out.iter().any(|c| c.id == "c0"));
        }
        assert_eq!(
            filter_contracts(&rows, &FilterCriteria::default()).len(),
            10
        );
    }

    #[test]
    fn dashboard_groups() {
        let rows = mixed();
        let on_review =
            FilterCriteria::default().with_status(StatusFilter::group(StatusGroup::OnReview));
        assert_eq!(
            ids(&filter_contracts(&rows, &on_review)),
            ["c1", "c3", "c5", "c7"]
        );
        let new = FilterCriteria::default().with_status(StatusFilter::group(StatusGroup::New));
        assert_eq!(ids(&filter_contracts(&rows, &new)), ["c0"]);
    }

    #[test]
    fn date_range_is_inclusive_on_created_date() {
        let mut rows = mixed();
        rows[1].created_at = Utc.with_ymd_and_hms(2025, 3, 1, 23, 59, 0).unwrap();
        rows[2].created_at = Utc.with_ymd_and_hms(2025, 3, 31, 0, 0, 0).unwrap();
        rows[3].created_at = Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap();

        let march = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 3, 1),
            NaiveDate::from_ymd_opt(2025, 3, 31),
        );
        let criteria = FilterCriteria::default().with_date_range(DateField::CreatedAt, march);
        assert_eq!(ids(&filter_contracts(&rows, &criteria)), ["c1", "c2"]);
    }

    #[test]
    fn end_date_range_excludes_missing_dates() {
        let mut rows = mixed();
        rows[4].end_date = NaiveDate::from_ymd_opt(2025, 7, 1);
        rows[5].end_date = NaiveDate::from_ymd_opt(2026, 1, 1);
        let from_july = DateRange::new(NaiveDate::from_ymd_opt(2025, 7, 1), None);
        let criteria = FilterCriteria::default().with_date_range(DateField::EndDate, from_july);
        assert_eq!(ids(&filter_contracts(&rows, &criteria)), ["c4", "c5"]);

        let open =
            FilterCriteria::default().with_date_range(DateField::EndDate, DateRange::default());
        assert_eq!(filter_contracts(&rows, &open).len(), 10);
    }

    #[test]
    fn empty_input() {
        let rows: Vec<Contract> = Vec::new();
        let criteria = FilterCriteria::default().with_query("anything");
        assert!(filter_contracts(&rows, &criteria).is_empty());
    }

    #[test]
    fn display_truncation() {
        let rows = mixed();
        let all = filter_contracts(&rows, &FilterCriteria::default());
        assert_eq!(ids(&take_display(all.clone(), 4)), ["c0", "c1", "c2", "c3"]);
        assert_eq!(take_display(all, 50).len(), 10);
    }
}
