//! Client for the hosted backend's PostgREST endpoint.

use async_trait::async_trait;
use klausa_core::{
    AnalysisRecord, Contract, ContractEntity, ContractPatch, LegalKpi, LegalNote, ManagementKpi,
    NewLegalNote, ProcurementKpi, RiskFinding, Table,
};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::backend::{ContractBackend, ContractQuery};
use crate::error::StoreError;
use crate::feed::{ChangeEvent, ChangeFeed, ChangeKind};

type Params = Vec<(&'static str, String)>;

/// Reads and writes contract tables over `{base_url}/rest/v1`.
///
/// Own writes are published on the change feed once the server accepts
/// them. Changes made by other clients arrive only if a realtime transport
/// publishes them onto [`ContractBackend::changes`].
pub struct RestBackend {
    client: reqwest::Client,
    base_url: String,
    feed: ChangeFeed,
}

impl RestBackend {
    /// `base_url` is the project root, e.g. `https://abc.supabase.co`.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(api_key)?);
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {api_key}"))?);
        let client = reqwest::Client::builder().default_headers(headers).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            feed: ChangeFeed::default(),
        })
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.name())
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: Table,
        params: &[(&'static str, String)],
    ) -> Result<Vec<T>, StoreError> {
        let url = self.table_url(table);
        debug!(url = %url, ?params, "select");
        let resp = self.client.get(&url).query(params).send().await?;
        let resp = check(resp).await?;
        let rows: Vec<T> = resp.json().await?;
        debug!(table = %table, count = rows.len(), "selected rows");
        Ok(rows)
    }

    async fn select_one<T: DeserializeOwned>(
        &self,
        table: Table,
        mut params: Params,
        id: &str,
    ) -> Result<T, StoreError> {
        params.push(("limit", "1".to_string()));
        self.select(table, &params)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound {
                table,
                id: id.to_string(),
            })
    }

    async fn dependents<T: DeserializeOwned>(
        &self,
        table: Table,
        contract_id: &str,
    ) -> Result<Vec<T>, StoreError> {
        self.select(table, &dependent_params(table, contract_id))
            .await
    }

    async fn send_write<B: Serialize + ?Sized>(
        &self,
        request: reqwest::RequestBuilder,
        body: &B,
    ) -> Result<(), StoreError> {
        let resp = request
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }
}

fn header_value(value: &str) -> Result<HeaderValue, StoreError> {
    let message = "API key contains characters not allowed in a header";
    HeaderValue::from_str(value).map_err(|_| StoreError::Other(message.into()))
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::Server {
        status: status.as_u16(),
        body,
    })
}

/// Query parameters for a contract list.
fn contract_params(query: &ContractQuery) -> Params {
    let mut params: Params = vec![
        ("select", "*".to_string()),
        ("order", "created_at.desc".to_string()),
    ];
    if let Some(status) = query.status {
        params.push(("status", format!("eq.{}", status.label())));
    }
    if let Some(risk) = query.risk {
        params.push(("risk", format!("eq.{}", risk.label())));
    }
    if let Some(search) = query.search.as_deref() {
        let needle = search_term(search);
        if !needle.is_empty() {
            params.push((
                "or",
                format!(
                    "(name.ilike.*{needle}*,first_party.ilike.*{needle}*,second_party.ilike.*{needle}*)"
                ),
            ));
        }
    }
    if let Some(limit) = query.limit {
        params.push(("limit", limit.to_string()));
    }
    params
}

/// Strip characters that would break a PostgREST `or=(...)` group or act as
/// wildcards.
fn search_term(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '(' | ')' | '*' | '%' | '"' | '\\'))
        .collect()
}

fn dependent_params(table: Table, contract_id: &str) -> Params {
    let mut params: Params = vec![
        ("select", "*".to_string()),
        ("contract_id", format!("eq.{contract_id}")),
    ];
    if let Some(column) = table.order_column() {
        params.push(("order", format!("{column}.desc")));
    }
    params
}

fn id_params(id: &str) -> Params {
    vec![("select", "*".to_string()), ("id", format!("eq.{id}"))]
}

#[async_trait]
impl ContractBackend for RestBackend {
    fn backend_tag(&self) -> &'static str {
        "rest"
    }

    fn changes(&self) -> &ChangeFeed {
        &self.feed
    }

    async fn list_contracts(&self, query: &ContractQuery) -> Result<Vec<Contract>, StoreError> {
        let params = contract_params(query);
        self.select(Table::Contracts, &params).await
    }

    async fn get_contract(&self, id: &str) -> Result<Contract, StoreError> {
        self.select_one(Table::Contracts, id_params(id), id).await
    }

    async fn update_contract(&self, id: &str, patch: &ContractPatch) -> Result<(), StoreError> {
        let url = self.table_url(Table::Contracts);
        info!(url = %url, id, ?patch, "updating contract");
        let filter = [("id", format!("eq.{id}"))];
        let request = self.client.patch(&url).query(&filter);
        self.send_write(request, patch).await?;
        let event = ChangeEvent::new(Table::Contracts, ChangeKind::Update, id);
        self.feed.publish(event);
        Ok(())
    }

    async fn entities(&self, contract_id: &str) -> Result<Vec<ContractEntity>, StoreError> {
        self.dependents(Table::ContractEntities, contract_id).await
    }

    async fn risk_findings(&self, contract_id: &str) -> Result<Vec<RiskFinding>, StoreError> {
        self.dependents(Table::RiskFindings, contract_id).await
    }

    async fn legal_notes(&self, contract_id: &str) -> Result<Vec<LegalNote>, StoreError> {
        self.dependents(Table::LegalNotes, contract_id).await
    }

    async fn add_note(&self, note: &NewLegalNote) -> Result<(), StoreError> {
        let url = self.table_url(Table::LegalNotes);
        info!(url = %url, contract_id = %note.contract_id, "adding legal note");
        self.send_write(self.client.post(&url), std::slice::from_ref(note))
            .await?;
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
        self.dependents(Table::AiRiskAnalysis, contract_id).await
    }

    async fn legal_kpi(&self) -> Result<LegalKpi, StoreError> {
        let params = vec![("select", "*".to_string())];
        self.select_one(Table::LegalKpi, params, "*").await
    }

    async fn procurement_kpi(&self) -> Result<ProcurementKpi, StoreError> {
        let params = vec![("select", "*".to_string())];
        self.select_one(Table::ProcurementKpi, params, "*").await
    }

    async fn management_kpi(&self) -> Result<ManagementKpi, StoreError> {
        let params = vec![("select", "*".to_string())];
        self.select_one(Table::ManagementKpi, params, "*").await
    }
}
