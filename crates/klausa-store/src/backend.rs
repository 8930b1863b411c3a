//! The data-access seam between screens and whatever holds the rows.

use async_trait::async_trait;
use klausa_core::analysis::latest_analysis;
use klausa_core::model::latest_entity;
use klausa_core::{
    AnalysisRecord, Contract, ContractEntity, ContractPatch, ContractStatus, FilterCriteria,
    LegalKpi, LegalNote, ManagementKpi, NewLegalNote, ProcurementKpi, RiskAnalysis, RiskFilter,
    RiskFinding, RiskLevel, StatusFilter,
};
use tracing::debug;

use crate::error::StoreError;
use crate::feed::ChangeFeed;

/// Server-side narrowing for contract lists.
///
/// Only exact-match status/risk, a text search, and a row limit are pushed
/// to the backend. Everything else is applied in memory by the filter
/// engine on the returned rows. Rows always come back newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractQuery {
    pub status: Option<ContractStatus>,
    pub risk: Option<RiskLevel>,
    pub search: Option<String>,
    pub limit: Option<usize>,
}

impl ContractQuery {
    /// Push down the parts of `criteria` the backend can evaluate exactly.
    ///
    /// Multi-status and unrecognized filters are left to the client-side
    /// pass, which then sees the full list.
    pub fn from_criteria(criteria: &FilterCriteria) -> Self {
        let status = match &criteria.status {
            StatusFilter::Is(s) => Some(*s),
            _ => None,
        };
        let risk = match &criteria.risk {
            RiskFilter::Is(r) => Some(*r),
            _ => None,
        };
        Self {
            status,
            risk,
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_search(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.search = if text.trim().is_empty() {
            None
        } else {
            Some(text)
        };
        self
    }

    /// Whether `row` satisfies the query, as the backend would decide.
    pub fn admits(&self, row: &Contract) -> bool {
        if self.status.is_some_and(|s| s != row.status) {
            return false;
        }
        if self.risk.is_some() && self.risk != row.risk {
            return false;
        }
        match self.search.as_deref().map(|q| q.trim().to_lowercase()) {
            Some(q) => [
                Some(row.name.as_str()),
                row.first_party.as_deref(),
                row.second_party.as_deref(),
            ]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&q)),
            None => true,
        }
    }
}

/// Everything a contract card shows.
#[derive(Debug, Clone)]
pub struct ContractDossier {
    pub contract: Contract,
    pub entity: Option<ContractEntity>,
    pub findings: Vec<RiskFinding>,
    pub notes: Vec<LegalNote>,
    pub analysis: Option<RiskAnalysis>,
}

/// Typed access to the contract tables.
///
/// Dependent-row lists (`entities`, `risk_findings`, `legal_notes`,
/// `analysis_records`) come back newest first. Every successful write is
/// announced on [`ContractBackend::changes`].
#[async_trait]
pub trait ContractBackend: Send + Sync {
    /// Short name for logs.
    fn backend_tag(&self) -> &'static str;

    fn changes(&self) -> &ChangeFeed;

    async fn list_contracts(&self, query: &ContractQuery) -> Result<Vec<Contract>, StoreError>;

    async fn get_contract(&self, id: &str) -> Result<Contract, StoreError>;

    async fn update_contract(&self, id: &str, patch: &ContractPatch) -> Result<(), StoreError>;

    async fn entities(&self, contract_id: &str) -> Result<Vec<ContractEntity>, StoreError>;

    async fn risk_findings(&self, contract_id: &str) -> Result<Vec<RiskFinding>, StoreError>;

    async fn legal_notes(&self, contract_id: &str) -> Result<Vec<LegalNote>, StoreError>;

    async fn add_note(&self, note: &NewLegalNote) -> Result<(), StoreError>;

    async fn analysis_records(&self, contract_id: &str)
    -> Result<Vec<AnalysisRecord>, StoreError>;

    async fn legal_kpi(&self) -> Result<LegalKpi, StoreError>;

    async fn procurement_kpi(&self) -> Result<ProcurementKpi, StoreError>;

    async fn management_kpi(&self) -> Result<ManagementKpi, StoreError>;

    async fn set_status(&self, id: &str, status: ContractStatus) -> Result<(), StoreError> {
        self.update_contract(id, &ContractPatch::status(status))
            .await
    }

    async fn set_risk(&self, id: &str, risk: RiskLevel) -> Result<(), StoreError> {
        self.update_contract(id, &ContractPatch::risk(risk)).await
    }

    async fn latest_entity(&self, contract_id: &str) -> Result<Option<ContractEntity>, StoreError> {
        let rows = self.entities(contract_id).await?;
        Ok(latest_entity(&rows).cloned())
    }

    /// Decoded latest analysis. A malformed payload counts as no analysis.
    async fn latest_analysis(&self, contract_id: &str) -> Result<Option<RiskAnalysis>, StoreError> {
        let rows = self.analysis_records(contract_id).await?;
        Ok(latest_analysis(&rows).and_then(AnalysisRecord::analysis))
    }
}

/// Fetch a contract and its dependent rows concurrently.
pub async fn load_dossier(
    backend: &dyn ContractBackend,
    contract_id: &str,
) -> Result<ContractDossier, StoreError> {
    let (contract, entity, findings, notes, analysis) = futures::try_join!(
        backend.get_contract(contract_id),
        backend.latest_entity(contract_id),
        backend.risk_findings(contract_id),
        backend.legal_notes(contract_id),
        backend.latest_analysis(contract_id),
    )?;
    debug!(
        backend = backend.backend_tag(),
        contract_id,
        findings = findings.len(),
        notes = notes.len(),
        "loaded dossier"
    );
    Ok(ContractDossier {
        contract,
        entity,
        findings,
        notes,
        analysis,
    })
}
