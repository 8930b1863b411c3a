mod display;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use klausa_core::filter::{filter_contracts, take_display};
use klausa_core::sort::sort_by_value_desc;
use klausa_core::{
    Contract, ContractStatus, DateField, DateRange, ExpiryBuckets, FilterCriteria, NewLegalNote,
    RiskFilter, RiskLevel, RiskSummary, ScreenPreset, StatusCounts, StatusFilter, StatusGroup,
};
use klausa_store::{
    BackendConfig, ContractBackend, ContractQuery, LiveView, LoadState, load_dossier,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "klausa", version)]
#[command(about = "Contract status and risk review from the terminal")]
struct Cli {
    #[command(flatten)]
    backend: BackendArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct BackendArgs {
    /// JSON fixture to serve rows from instead of a live backend.
    #[arg(long, global = true, env = "KLAUSA_FIXTURE")]
    fixture: Option<PathBuf>,
    /// Backend project URL.
    #[arg(long, global = true, env = "KLAUSA_URL")]
    url: Option<String>,
    #[arg(long, global = true, env = "KLAUSA_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

impl BackendArgs {
    fn config(&self) -> BackendConfig {
        BackendConfig {
            url: self.url.clone(),
            api_key: self.api_key.clone(),
            fixture: self.fixture.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// List contracts matching the filters.
    Contracts(ListArgs),
    /// Risk, status, and expiry counts over the filtered contracts.
    RiskSummary(ListArgs),
    /// Show one contract with its findings, notes, and analysis.
    Show { id: String },
    /// Move a contract to another workflow status.
    SetStatus { id: String, status: String },
    SetRisk { id: String, risk: String },
    /// Attach a legal note to a contract.
    Note {
        id: String,
        text: String,
        #[arg(long, env = "KLAUSA_AUTHOR")]
        author: Option<String>,
    },
    /// Legal, procurement, and management rollups.
    Kpi,
    /// Keep the filtered list on screen, redrawing on every change.
    Watch(ListArgs),
}

#[derive(Args, Clone, Debug)]
struct ListArgs {
    /// Status label, e.g. "Pending Review", or "All".
    #[arg(long, default_value = "All")]
    status: String,
    /// Dashboard status group; overrides --status.
    #[arg(long, value_enum)]
    group: Option<GroupArg>,
    #[arg(long, default_value = "All")]
    risk: String,
    /// Case-insensitive match on name and both parties.
    #[arg(long, short = 'q', default_value = "")]
    query: String,
    #[arg(long)]
    from: Option<NaiveDate>,
    #[arg(long)]
    to: Option<NaiveDate>,
    #[arg(long, value_enum, default_value_t = DateFieldArg::Created)]
    date_field: DateFieldArg,
    /// Apply a screen's date field, ordering, and row limit.
    #[arg(long, value_enum)]
    screen: Option<ScreenArg>,
    #[arg(long)]
    sort_by_value: bool,
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DateFieldArg {
    Created,
    End,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum GroupArg {
    All,
    Approved,
    OnReview,
    New,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ScreenArg {
    Inbox,
    Tracking,
    RiskCenter,
    LegalDashboard,
    ProcurementDashboard,
    Reports,
}

impl From<DateFieldArg> for DateField {
    fn from(arg: DateFieldArg) -> Self {
        match arg {
            DateFieldArg::Created => DateField::CreatedAt,
            DateFieldArg::End => DateField::EndDate,
        }
    }
}

impl From<GroupArg> for StatusGroup {
    fn from(arg: GroupArg) -> Self {
        match arg {
            GroupArg::All => StatusGroup::All,
            GroupArg::Approved => StatusGroup::Approved,
            GroupArg::OnReview => StatusGroup::OnReview,
            GroupArg::New => StatusGroup::New,
        }
    }
}

impl From<ScreenArg> for ScreenPreset {
    fn from(arg: ScreenArg) -> Self {
        match arg {
            ScreenArg::Inbox => ScreenPreset::Inbox,
            ScreenArg::Tracking => ScreenPreset::StatusTracking,
            ScreenArg::RiskCenter => ScreenPreset::RiskCenter,
            ScreenArg::LegalDashboard => ScreenPreset::LegalDashboard,
            ScreenArg::ProcurementDashboard => ScreenPreset::ProcurementDashboard,
            ScreenArg::Reports => ScreenPreset::Reports,
        }
    }
}

impl ListArgs {
    fn criteria(&self) -> FilterCriteria {
        let status = match self.group {
            Some(group) => StatusFilter::group(group.into()),
            None => StatusFilter::parse(&self.status),
        };
        FilterCriteria::default()
            .with_status(status)
            .with_risk(RiskFilter::parse(&self.risk))
            .with_query(self.query.clone())
            .with_date_range(self.date_field.into(), DateRange::new(self.from, self.to))
    }

    /// Filter, order, and truncate fetched rows the way the chosen screen does.
    fn select<'a>(&self, rows: &'a [Contract], criteria: &FilterCriteria) -> Vec<&'a Contract> {
        let out = match self.screen {
            Some(screen) => {
                ScreenPreset::from(screen).view_sorted(rows, criteria, self.sort_by_value)
            }
            None => {
                let mut out = filter_contracts(rows, criteria);
                if self.sort_by_value {
                    sort_by_value_desc(&mut out);
                }
                out
            }
        };
        match self.limit {
            Some(limit) => take_display(out, limit),
            None => out,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    debug!("klausa v{}", env!("CARGO_PKG_VERSION"));

    let backend = cli
        .backend
        .config()
        .connect()
        .context("failed to set up backend")?;

    match cli.command {
        Command::Contracts(args) => cmd_contracts(backend.as_ref(), &args).await,
        Command::RiskSummary(args) => cmd_risk_summary(backend.as_ref(), &args).await,
        Command::Show { id } => cmd_show(backend.as_ref(), &id).await,
        Command::SetStatus { id, status } => cmd_set_status(backend.as_ref(), &id, &status).await,
        Command::SetRisk { id, risk } => cmd_set_risk(backend.as_ref(), &id, &risk).await,
        Command::Note { id, text, author } => cmd_note(backend.as_ref(), id, text, author).await,
        Command::Kpi => cmd_kpi(backend.as_ref()).await,
        Command::Watch(args) => cmd_watch(backend, args).await,
    }
}

async fn fetch(
    backend: &dyn ContractBackend,
    criteria: &FilterCriteria,
) -> anyhow::Result<Vec<Contract>> {
    backend
        .list_contracts(&ContractQuery::from_criteria(criteria))
        .await
        .context("failed to load contracts")
}

async fn cmd_contracts(backend: &dyn ContractBackend, args: &ListArgs) -> anyhow::Result<()> {
    let criteria = args.criteria();
    let rows = fetch(backend, &criteria).await?;
    let shown = args.select(&rows, &criteria);
    info!(fetched = rows.len(), shown = shown.len(), "contracts");
    display::print_contract_table(&shown, rows.len(), Utc::now())
}

async fn cmd_risk_summary(backend: &dyn ContractBackend, args: &ListArgs) -> anyhow::Result<()> {
    let criteria = args.criteria();
    let rows = fetch(backend, &criteria).await?;
    let shown = args.select(&rows, &criteria);
    let risk = RiskSummary::from_items(&shown);
    let status = StatusCounts::from_contracts(shown.iter().copied());
    let expiry = ExpiryBuckets::from_contracts(shown.iter().copied(), Utc::now().date_naive());
    display::print_summary(&risk, &status, &expiry)
}

async fn cmd_show(backend: &dyn ContractBackend, id: &str) -> anyhow::Result<()> {
    let dossier = load_dossier(backend, id)
        .await
        .with_context(|| format!("failed to load contract {id}"))?;
    display::print_contract_card(&dossier, Utc::now())
}

async fn cmd_set_status(
    backend: &dyn ContractBackend,
    id: &str,
    status: &str,
) -> anyhow::Result<()> {
    let next: ContractStatus = status.parse()?;
    let current = backend
        .get_contract(id)
        .await
        .with_context(|| format!("failed to load contract {id}"))?;
    if current.status == next {
        println!("{} is already {}", current.reference(), next);
        return Ok(());
    }
    if !current.status.can_transition_to(next) {
        warn!(id, from = %current.status, to = %next, "status change skips the review workflow");
    }
    backend.set_status(id, next).await?;
    println!("{}: {} -> {}", current.reference(), current.status, next);
    Ok(())
}

async fn cmd_set_risk(backend: &dyn ContractBackend, id: &str, risk: &str) -> anyhow::Result<()> {
    let level: RiskLevel = risk.parse()?;
    backend
        .set_risk(id, level)
        .await
        .with_context(|| format!("failed to update contract {id}"))?;
    println!("risk set to {level}");
    Ok(())
}

async fn cmd_note(
    backend: &dyn ContractBackend,
    id: String,
    text: String,
    author: Option<String>,
) -> anyhow::Result<()> {
    if text.trim().is_empty() {
        bail!("note text is empty");
    }
    let note = NewLegalNote {
        contract_id: id,
        author,
        note: text,
    };
    backend
        .add_note(&note)
        .await
        .with_context(|| format!("failed to add note to {}", note.contract_id))?;
    println!("note added");
    Ok(())
}

async fn cmd_kpi(backend: &dyn ContractBackend) -> anyhow::Result<()> {
    let (legal, procurement, management) = tokio::join!(
        backend.legal_kpi(),
        backend.procurement_kpi(),
        backend.management_kpi(),
    );
    let legal = legal
        .inspect_err(|e| warn!(error = %e, "legal KPI unavailable"))
        .ok();
    let procurement = procurement
        .inspect_err(|e| warn!(error = %e, "procurement KPI unavailable"))
        .ok();
    let management = management
        .inspect_err(|e| warn!(error = %e, "management KPI unavailable"))
        .ok();
    if legal.is_none() && procurement.is_none() && management.is_none() {
        bail!("no KPI views could be loaded");
    }
    display::print_kpis(legal.as_ref(), procurement.as_ref(), management.as_ref())
}

async fn cmd_watch(backend: Arc<dyn ContractBackend>, args: ListArgs) -> anyhow::Result<()> {
    let criteria = args.criteria();
    let view = Arc::new(LiveView::contracts(
        Arc::clone(&backend),
        ContractQuery::from_criteria(&criteria),
    ));
    let mut rx = view.watch();
    let runner = tokio::spawn({
        let view = Arc::clone(&view);
        let backend = Arc::clone(&backend);
        async move { view.run(backend.changes()).await }
    });

    loop {
        let changed = tokio::select! {
            res = rx.changed() => res.is_ok(),
            _ = tokio::signal::ctrl_c() => false,
        };
        if !changed {
            break;
        }
        let state = rx.borrow_and_update().clone();
        match state {
            LoadState::Loading => {}
            LoadState::Ready(rows) => {
                let now = Utc::now();
                println!("\n--- {} ---", now.format("%H:%M:%S"));
                let shown = args.select(&rows, &criteria);
                display::print_contract_table(&shown, rows.len(), now)?;
            }
            LoadState::Failed(message) => eprintln!("refresh failed: {message}"),
        }
    }

    runner.abort();
    Ok(())
}
