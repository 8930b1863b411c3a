//! In-process backend seeded from a JSON fixture.
//!
//! Used for offline CLI runs and for tests. Writes mutate the in-memory rows
//! and are announced on the change feed exactly like the hosted backend's
//! realtime channel would.

use std::cmp::Reverse;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use klausa_core::sort::sort_newest_first;
use klausa_core::{
    AnalysisRecord, Contract, ContractEntity, ContractPatch, LegalKpi, LegalNote, ManagementKpi,
    NewLegalNote, ProcurementKpi, RiskFinding, Table,
};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::backend::{ContractBackend, ContractQuery};
use crate::error::StoreError;
use crate::feed::{ChangeEvent, ChangeFeed, ChangeKind};

/// Seed data, one key per backend table. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub contracts: Vec<Contract>,
    pub contract_entities: Vec<ContractEntity>,
    pub risk_findings: Vec<RiskFinding>,
    pub legal_notes: Vec<LegalNote>,
    pub ai_risk_analysis: Vec<AnalysisRecord>,
    pub legal_kpi: Option<LegalKpi>,
    pub procurement_kpi: Option<ProcurementKpi>,
    pub management_kpi: Option<ManagementKpi>,
}

impl Fixture {
    pub fn from_json(text: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, StoreError> {
        let text = std::fs::read_to_string(path)?;
        let fixture = Self::from_json(&text)?;
        info!(
            path = %path.display(),
            contracts = fixture.contracts.len(),
            findings = fixture.risk_findings.len(),
            notes = fixture.legal_notes.len(),
            "loaded fixture"
        );
        Ok(fixture)
    }

    /// Every dependent row must point at a known contract.
    pub fn validate(&self) -> Result<(), StoreError> {
        let ids: HashSet<&str> = self.contracts.iter().map(|c| c.id.as_str()).collect();
        let dependents = self
            .contract_entities
            .iter()
            .map(|r| (Table::ContractEntities, r.contract_id.as_str()))
            .chain(
                self.risk_findings
                    .iter()
                    .map(|r| (Table::RiskFindings, r.contract_id.as_str())),
            )
            .chain(
                self.legal_notes
                    .iter()
                    .map(|r| (Table::LegalNotes, r.contract_id.as_str())),
            )
            .chain(
                self.ai_risk_analysis
                    .iter()
                    .map(|r| (Table::AiRiskAnalysis, r.contract_id.as_str())),
            );
        for (table, contract_id) in dependents {
            if !ids.contains(contract_id) {
                return Err(StoreError::Orphan {
                    table,
                    contract_id: contract_id.to_string(),
                });
            }
        }
        Ok(())
    }
}

pub struct MemoryBackend {
    rows: RwLock<Fixture>,
    feed: ChangeFeed,
    next_note: AtomicU64,
    fetch_calls: AtomicU64,
}

impl MemoryBackend {
    pub fn new(fixture: Fixture) -> Result<Self, StoreError> {
        fixture.validate()?;
        let next_note = fixture.legal_notes.len() as u64 + 1;
        Ok(Self {
            rows: RwLock::new(fixture),
            feed: ChangeFeed::default(),
            next_note: AtomicU64::new(next_note),
            fetch_calls: AtomicU64::new(0),
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, StoreError> {
        Self::new(Fixture::from_path(path)?)
    }

    /// Number of `list_contracts` calls served so far.
    pub fn fetch_calls(&self) -> u64 {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    async fn require_contract(&self, id: &str) -> Result<(), StoreError> {
        let rows = self.rows.read().await;
        if rows.contracts.iter().any(|c| c.id == id) {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                table: Table::Contracts,
                id: id.to_string(),
            })
        }
    }
}

/// Rows that hang off a contract.
trait Owned: Clone {
    fn owner(&self) -> &str;
}

macro_rules! owned {
    ($($ty:ty),*) => {
        $(impl Owned for $ty {
            fn owner(&self) -> &str {
                &self.contract_id
            }
        })*
    };
}

owned!(ContractEntity, RiskFinding, LegalNote, AnalysisRecord);

fn owned_by<T: Owned>(rows: &[T], contract_id: &str) -> Vec<T> {
    rows.iter()
        .filter(|r| r.owner() == contract_id)
        .cloned()
        .collect()
}

#[async_trait]
impl ContractBackend for MemoryBackend {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    fn changes(&self) -> &ChangeFeed {
        &self.feed
    }

    async fn list_contracts(&self, query: &ContractQuery) -> Result<Vec<Contract>, StoreError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let rows = self.rows.read().await;
        let mut out: Vec<Contract> = rows
            .contracts
            .iter()
            .filter(|c| query.admits(c))
            .cloned()
            .collect();
        sort_newest_first(&mut out);
        if let Some(limit) = query.limit {
            out.truncate(limit);
        }
        debug!(count = out.len(), "listed contracts");
        Ok(out)
    }

    async fn get_contract(&self, id: &str) -> Result<Contract, StoreError> {
        let rows = self.rows.read().await;
        rows.contracts
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                table: Table::Contracts,
                id: id.to_string(),
            })
    }

    async fn update_contract(&self, id: &str, patch: &ContractPatch) -> Result<(), StoreError> {
        {
            let mut rows = self.rows.write().await;
            let row = rows
                .contracts
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or_else(|| StoreError::NotFound {
                    table: Table::Contracts,
                    id: id.to_string(),
                })?;
            if let Some(status) = patch.status {
                row.status = status;
            }
            if let Some(risk) = patch.risk {
                row.risk = Some(risk);
            }
            row.updated_at = Some(Utc::now());
        }
        self.feed
            .publish(ChangeEvent::new(Table::Contracts, ChangeKind::Update, id));
        Ok(())
    }

    async fn entities(&self, contract_id: &str) -> Result<Vec<ContractEntity>, StoreError> {
        let rows = self.rows.read().await;
        let mut out = owned_by(&rows.contract_entities, contract_id);
        out.sort_by_key(|r| Reverse(r.analyzed_at));
        Ok(out)
    }

    async fn risk_findings(&self, contract_id: &str) -> Result<Vec<RiskFinding>, StoreError> {
        let rows = self.rows.read().await;
        let mut out = owned_by(&rows.risk_findings, contract_id);
        out.sort_by_key(|r| Reverse(r.created_at));
        Ok(out)
    }

    async fn legal_notes(&self, contract_id: &str) -> Result<Vec<LegalNote>, StoreError> {
        let rows = self.rows.read().await;
        let mut out = owned_by(&rows.legal_notes, contract_id);
        out.sort_by_key(|r| Reverse(r.created_at));
        Ok(out)
    }

    async fn add_note(&self, note: &NewLegalNote) -> Result<(), StoreError> {
        self.require_contract(&note.contract_id).await?;
        let id = format!("note-{}", self.next_note.fetch_add(1, Ordering::SeqCst));
        self.rows.write().await.legal_notes.push(LegalNote {
            id,
            contract_id: note.contract_id.clone(),
            author: note.author.clone(),
            note: note.note.clone(),
            created_at: Utc::now(),
        });
        self.feed.publish(ChangeEvent::new(
            Table::LegalNotes,
            ChangeKind::Insert,
            note.contract_id.as_str(),
        ));
        Ok(())
    }

    async fn analysis_records(
        &self,
        contract_id: &str,
    ) -> Result<Vec<AnalysisRecord>, StoreError> {
        let rows = self.rows.read().await;
        let mut out = owned_by(&rows.ai_risk_analysis, contract_id);
        out.sort_by_key(|r| Reverse(r.analyzed_at));
        Ok(out)
    }

    async fn legal_kpi(&self) -> Result<LegalKpi, StoreError> {
        Ok(self.rows.read().await.legal_kpi.clone().unwrap_or_default())
    }

    async fn procurement_kpi(&self) -> Result<ProcurementKpi, StoreError> {
        Ok(self
            .rows
            .read()
            .await
            .procurement_kpi
            .clone()
            .unwrap_or_default())
    }

    async fn management_kpi(&self) -> Result<ManagementKpi, StoreError> {
        Ok(self
            .rows
            .read()
            .await
            .management_kpi
            .clone()
            .unwrap_or_default())
    }
}
