//! Row types for the contract tables and KPI views.
//!
//! Rows come from a loosely typed backend: ids may be strings or numbers,
//! amounts may arrive as numeric strings, and optional columns may be null
//! or missing. The lenient deserializers in [`de`] absorb that once so the
//! rest of the pipeline works with a fixed optional-field schema.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;
use crate::format::PLACEHOLDER;

// ── Enumerations ──

/// Lifecycle status of a contract.
///
/// `Unknown` absorbs labels the backend sends that are outside the closed
/// set. No status filter selects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ContractStatus {
    #[default]
    Draft,
    PendingReview,
    Reviewed,
    RevisionRequested,
    Approved,
    Active,
    Expired,
    Rejected,
    Unknown,
}

impl ContractStatus {
    /// Every status in the closed set, in lifecycle order.
    pub const ALL: [ContractStatus; 8] = [
        ContractStatus::Draft,
        ContractStatus::PendingReview,
        ContractStatus::Reviewed,
        ContractStatus::RevisionRequested,
        ContractStatus::Approved,
        ContractStatus::Active,
        ContractStatus::Expired,
        ContractStatus::Rejected,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ContractStatus::Draft => "Draft",
            ContractStatus::PendingReview => "Pending Review",
            ContractStatus::Reviewed => "Reviewed",
            ContractStatus::RevisionRequested => "Revision Requested",
            ContractStatus::Approved => "Approved",
            ContractStatus::Active => "Active",
            ContractStatus::Expired => "Expired",
            ContractStatus::Rejected => "Rejected",
            ContractStatus::Unknown => "Unknown",
        }
    }

    /// Whether moving from `self` to `next` follows the review workflow.
    ///
    /// Procurement submits drafts, legal reviews, management approves.
    /// Expired and Rejected are terminal.
    pub fn can_transition_to(self, next: ContractStatus) -> bool {
        use ContractStatus::*;
        matches!(
            (self, next),
            (Draft, PendingReview)
                | (PendingReview, Reviewed | RevisionRequested | Approved | Rejected)
                | (Reviewed, Approved | RevisionRequested | Rejected)
                | (RevisionRequested, PendingReview | Draft)
                | (Approved, Active | Rejected)
                | (Active, Expired)
        )
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ContractStatus {
    type Err = CoreError;

    /// Case-insensitive; underscores are read as spaces ("pending_review").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('_', " ");
        ContractStatus::ALL
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| CoreError::UnknownStatus(s.to_string()))
    }
}

impl Serialize for ContractStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for ContractStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .and_then(|s| s.parse().ok())
            .unwrap_or(ContractStatus::Unknown))
    }
}

/// Severity shared by contracts, findings, and entity snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::High, RiskLevel::Medium, RiskLevel::Low];

    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RiskLevel {
    type Err = CoreError;

    /// Accepts "High", "high", and the heatmap style "High Risk".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();
        let bare = lower.strip_suffix(" risk").unwrap_or(&lower);
        match bare {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            _ => Err(CoreError::UnknownRisk(trimmed.to_string())),
        }
    }
}

// ── Rows ──

/// A contract row from the `contracts` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    #[serde(deserialize_with = "de::id_string")]
    pub id: String,
    #[serde(default, deserialize_with = "de::string_or_empty")]
    pub name: String,
    #[serde(default)]
    pub first_party: Option<String>,
    #[serde(default)]
    pub second_party: Option<String>,
    /// Smallest currency unit (Rupiah).
    #[serde(default, deserialize_with = "de::lenient_amount")]
    pub value_rp: Option<i64>,
    #[serde(default, deserialize_with = "de::lenient_months")]
    pub duration_months: Option<u32>,
    #[serde(default, deserialize_with = "de::lenient_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de::lenient_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: ContractStatus,
    #[serde(default, deserialize_with = "de::lenient_risk")]
    pub risk: Option<RiskLevel>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub file_url: Option<String>,
}

impl Contract {
    pub fn value_or_zero(&self) -> i64 {
        self.value_rp.unwrap_or(0)
    }

    pub fn display_name(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() {
            "Unnamed Contract"
        } else {
            name
        }
    }

    pub fn first_party_label(&self) -> &str {
        self.first_party.as_deref().unwrap_or(PLACEHOLDER)
    }

    pub fn second_party_label(&self) -> &str {
        self.second_party.as_deref().unwrap_or(PLACEHOLDER)
    }

    pub fn risk_label(&self) -> &'static str {
        self.risk.map(RiskLevel::label).unwrap_or(PLACEHOLDER)
    }

    /// Most recent change: `updated_at`, else `created_at`.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }

    /// Short human reference, e.g. `Contract #3F2A9C10`.
    pub fn reference(&self) -> String {
        let short: String = self.id.chars().take(8).collect();
        format!("Contract #{}", short.to_uppercase())
    }
}

/// A clause-level issue flagged on a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFinding {
    #[serde(deserialize_with = "de::id_string")]
    pub id: String,
    #[serde(deserialize_with = "de::id_string")]
    pub contract_id: String,
    #[serde(default, deserialize_with = "de::string_or_empty")]
    pub section: String,
    #[serde(default, deserialize_with = "de::lenient_risk")]
    pub level: Option<RiskLevel>,
    #[serde(default, deserialize_with = "de::string_or_empty")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub original_clause: Option<String>,
    #[serde(default)]
    pub recommended_clause: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Extracted metadata snapshot produced by an analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractEntity {
    #[serde(deserialize_with = "de::id_string")]
    pub contract_id: String,
    #[serde(default)]
    pub first_party: Option<String>,
    #[serde(default)]
    pub second_party: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_amount")]
    pub value_rp: Option<i64>,
    #[serde(default, deserialize_with = "de::lenient_months")]
    pub duration_months: Option<u32>,
    #[serde(default)]
    pub penalty: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_risk")]
    pub initial_risk: Option<RiskLevel>,
    pub analyzed_at: DateTime<Utc>,
}

/// Latest snapshot by `analyzed_at`. On a tie the later element wins.
pub fn latest_entity<'a, I>(snapshots: I) -> Option<&'a ContractEntity>
where
    I: IntoIterator<Item = &'a ContractEntity>,
{
    snapshots.into_iter().max_by_key(|e| e.analyzed_at)
}

/// A free-text note left by legal on a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegalNote {
    #[serde(deserialize_with = "de::id_string")]
    pub id: String,
    #[serde(deserialize_with = "de::id_string")]
    pub contract_id: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "de::string_or_empty")]
    pub note: String,
    pub created_at: DateTime<Utc>,
}

// ── Writes ──

/// Partial update for a contract row. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContractPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ContractStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskLevel>,
}

impl ContractPatch {
    pub fn status(status: ContractStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn risk(risk: RiskLevel) -> Self {
        Self {
            risk: Some(risk),
            ..Self::default()
        }
    }
}

/// Insert payload for `legal_notes`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewLegalNote {
    pub contract_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub note: String,
}

// ── KPI views (backend-computed, read-only) ──

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegalKpi {
    pub contracts_this_week: u64,
    pub high_risk: u64,
    pub pending_ai: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcurementKpi {
    pub new_this_month: u64,
    pub pending_legal_review: u64,
    pub approved_cnt: u64,
    pub approval_rate_pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagementKpi {
    pub total_contracts: u64,
    pub active_contracts: u64,
    pub pending_contracts: u64,
    pub expired_contracts: u64,
    pub high_risk_contracts: u64,
    pub expiring_30_days: u64,
    pub expiring_60_days: u64,
    pub expiring_90_days: u64,
    pub total_contract_value: i64,
    pub avg_active_contract_value: i64,
    pub low_risk_count: u64,
    pub medium_risk_count: u64,
    pub high_risk_count: u64,
    pub total_risk_assessed: u64,
    pub low_risk_percentage: f64,
    pub medium_risk_percentage: f64,
    pub high_risk_percentage: f64,
}

// ── Lenient column decoding ──

pub(crate) mod de {
    use chrono::{DateTime, NaiveDate};
    use serde::{Deserialize, Deserializer, de::Error};
    use serde_json::Value;

    use super::RiskLevel;

    pub fn id_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        match Value::deserialize(d)? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(D::Error::custom(format!("expected string or numeric id, got {other}"))),
        }
    }

    pub fn string_or_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
    }

    pub fn lenient_amount<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(round_finite)),
            Value::String(s) => parse_amount(&s),
            _ => None,
        })
    }

    fn parse_amount(s: &str) -> Option<i64> {
        let t = s.trim();
        t.parse::<i64>()
            .ok()
            .or_else(|| t.parse::<f64>().ok().and_then(round_finite))
    }

    fn round_finite(f: f64) -> Option<i64> {
        f.is_finite().then(|| f.round() as i64)
    }

    pub fn lenient_months<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn lenient_date<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let Some(raw) = Option::<String>::deserialize(d)? else {
            return Ok(None);
        };
        let raw = raw.trim();
        Ok(NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|ts| ts.date_naive())
        }))
    }

    pub fn lenient_risk<'de, D: Deserializer<'de>>(d: D) -> Result<Option<RiskLevel>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(json: &str) -> Contract {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn status_labels_parse_loosely() {
        assert_eq!(
            "Pending Review".parse::<ContractStatus>().unwrap(),
            ContractStatus::PendingReview
        );
        assert_eq!(
            "revision_requested".parse::<ContractStatus>().unwrap(),
            ContractStatus::RevisionRequested
        );
        assert!("Archived".parse::<ContractStatus>().is_err());
    }

    #[test]
    fn risk_labels_parse_loosely() {
        assert_eq!("high".parse::<RiskLevel>().unwrap(), RiskLevel::High);
        assert_eq!(
            "Medium Risk".parse::<RiskLevel>().unwrap(),
            RiskLevel::Medium
        );
        assert!("Critical".parse::<RiskLevel>().is_err());
    }

    #[test]
    fn contract_row_full() {
        let c = row(r#"{
            "id": "3f2a9c10-1111-2222-3333-444455556666",
            "name": "Terminal Operations Agreement",
            "first_party": "PT Integrasi Logistik Cipta Solusi (ILCS)",
            "second_party": "PT Supplier A",
            "value_rp": 2500000000,
            "duration_months": 12,
            "start_date": "2025-01-01",
            "end_date": "2025-12-31",
            "status": "Pending Review",
            "risk": "High",
            "created_at": "2025-01-05T10:00:00.123456+00:00",
            "updated_at": null,
            "file_url": null
        }"#);
        assert_eq!(c.status, ContractStatus::PendingReview);
        assert_eq!(c.risk, Some(RiskLevel::High));
        assert_eq!(c.value_or_zero(), 2_500_000_000);
        assert_eq!(c.end_date, NaiveDate::from_ymd_opt(2025, 12, 31));
        assert_eq!(c.reference(), "Contract #3F2A9C10");
        assert_eq!(c.last_activity(), c.created_at);
    }

    #[test]
    fn contract_row_sparse_uses_defaults() {
        let c = row(r#"{"id": 42, "name": null, "created_at": "2025-01-05T10:00:00Z"}"#);
        assert_eq!(c.id, "42");
        assert_eq!(c.display_name(), "Unnamed Contract");
        assert_eq!(c.status, ContractStatus::Draft);
        assert_eq!(c.risk, None);
        assert_eq!(c.value_or_zero(), 0);
        assert_eq!(c.first_party_label(), "-");
        assert_eq!(c.risk_label(), "-");
    }

    #[test]
    fn unknown_labels_degrade() {
        let c = row(r#"{
            "id": "a", "name": "x", "status": "Archived", "risk": "Critical",
            "created_at": "2025-01-05T10:00:00Z"
        }"#);
        assert_eq!(c.status, ContractStatus::Unknown);
        assert_eq!(c.risk, None);
    }

    #[test]
    fn numeric_strings_are_amounts() {
        let c = row(r#"{
            "id": "a", "name": "x", "value_rp": "150000.00", "duration_months": "6",
            "end_date": "2025-06-30T00:00:00+00:00",
            "created_at": "2025-01-05T10:00:00Z"
        }"#);
        assert_eq!(c.value_rp, Some(150_000));
        assert_eq!(c.duration_months, Some(6));
        assert_eq!(c.end_date, NaiveDate::from_ymd_opt(2025, 6, 30));
    }

    #[test]
    fn lifecycle_transitions() {
        use ContractStatus::*;
        assert!(Draft.can_transition_to(PendingReview));
        assert!(PendingReview.can_transition_to(Approved));
        assert!(RevisionRequested.can_transition_to(PendingReview));
        assert!(!Draft.can_transition_to(Approved));
        assert!(!Expired.can_transition_to(Active));
        assert!(!Rejected.can_transition_to(PendingReview));
    }

    #[test]
    fn latest_entity_wins() {
        let older: ContractEntity = serde_json::from_str(
            r#"{"contract_id": "c1", "initial_risk": "Low", "analyzed_at": "2025-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        let newer: ContractEntity = serde_json::from_str(
            r#"{"contract_id": "c1", "initial_risk": "High", "analyzed_at": "2025-02-01T00:00:00Z"}"#,
        )
        .unwrap();
        let snapshots = vec![newer.clone(), older];
        assert_eq!(latest_entity(&snapshots), Some(&newer));
        assert_eq!(latest_entity(&Vec::<ContractEntity>::new()), None);
    }

    #[test]
    fn patch_serializes_only_present_fields() {
        let json = serde_json::to_string(&ContractPatch::status(ContractStatus::Approved)).unwrap();
        assert_eq!(json, r#"{"status":"Approved"}"#);
    }

    #[test]
    fn kpi_missing_fields_default() {
        let kpi: ManagementKpi = serde_json::from_str(r#"{"total_contracts": 247}"#).unwrap();
        assert_eq!(kpi.total_contracts, 247);
        assert_eq!(kpi.expiring_30_days, 0);
    }
}
