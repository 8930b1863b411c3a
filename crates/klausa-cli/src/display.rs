//! Terminal rendering for contract lists, summaries, and contract cards.
//!
//! Every `render_*` writes into any [`fmt::Write`] so output can be checked
//! in tests; the `print_*` wrappers send it to stdout.

use std::fmt::{self, Write};

use chrono::{DateTime, Utc};
use klausa_core::format::{
    PLACEHOLDER, format_currency, format_currency_full, format_duration, format_optional_date,
    format_percentage, format_relative,
};
use klausa_core::{
    Contract, ContractStatus, ExpiryBuckets, LegalKpi, ManagementKpi, ProcurementKpi, RiskLevel,
    RiskSummary, StatusCounts,
};
use klausa_store::ContractDossier;

const LABEL_WIDTH: usize = 22;
const NAME_WIDTH: usize = 32;
const PARTY_WIDTH: usize = 26;

// ── Public API ──

pub fn print_contract_table(
    rows: &[&Contract],
    total: usize,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let mut out = String::new();
    render_contract_table(&mut out, rows, total, now)?;
    print!("{out}");
    Ok(())
}

pub fn print_summary(
    risk: &RiskSummary,
    status: &StatusCounts,
    expiry: &ExpiryBuckets,
) -> anyhow::Result<()> {
    let mut out = String::new();
    render_summary(&mut out, risk, status, expiry)?;
    print!("{out}");
    Ok(())
}

pub fn print_contract_card(dossier: &ContractDossier, now: DateTime<Utc>) -> anyhow::Result<()> {
    let mut out = String::new();
    render_contract_card(&mut out, dossier, now)?;
    print!("{out}");
    Ok(())
}

pub fn print_kpis(
    legal: Option<&LegalKpi>,
    procurement: Option<&ProcurementKpi>,
    management: Option<&ManagementKpi>,
) -> anyhow::Result<()> {
    let mut out = String::new();
    render_kpis(&mut out, legal, procurement, management)?;
    print!("{out}");
    Ok(())
}

// ── List ──

pub fn render_contract_table(
    out: &mut impl Write,
    rows: &[&Contract],
    total: usize,
    now: DateTime<Utc>,
) -> fmt::Result {
    if rows.is_empty() {
        return writeln!(out, "No contracts match the current filters.");
    }
    writeln!(
        out,
        "{:<20} {:<NAME_WIDTH$} {:<PARTY_WIDTH$} {:>14} {:<18} {:<6} {}",
        "REFERENCE", "NAME", "COUNTERPARTY", "VALUE", "STATUS", "RISK", "UPDATED"
    )?;
    for c in rows {
        writeln!(
            out,
            "{:<20} {:<NAME_WIDTH$} {:<PARTY_WIDTH$} {:>14} {:<18} {:<6} {}",
            c.reference(),
            clip(c.display_name(), NAME_WIDTH),
            clip(c.second_party_label(), PARTY_WIDTH),
            format_currency(c.value_rp),
            c.status.label(),
            c.risk_label(),
            format_relative(c.last_activity(), now),
        )?;
    }
    writeln!(out, "\n{} of {} contracts", rows.len(), total)
}

// ── Summary ──

pub fn render_summary(
    out: &mut impl Write,
    risk: &RiskSummary,
    status: &StatusCounts,
    expiry: &ExpiryBuckets,
) -> fmt::Result {
    writeln!(out, "Risk")?;
    for level in RiskLevel::ALL {
        let count = risk.count(level);
        let pct = format_percentage(risk.percentage(level));
        line(out, level.label(), format!("{count:>4}  {pct}"))?;
    }
    line(out, "Unassessed", risk.unassessed)?;
    line(out, "Total", risk.total)?;
    writeln!(out)?;

    writeln!(out, "Status")?;
    for s in ContractStatus::ALL {
        let n = status.get(s);
        if n > 0 {
            let pct = format_percentage(status.percentage(s));
            line(out, s.label(), format!("{n:>4}  {pct}"))?;
        }
    }
    let other = status.get(ContractStatus::Unknown);
    if other > 0 {
        line(out, "Other", other)?;
    }
    writeln!(out)?;

    writeln!(out, "Expiring")?;
    line(out, "Within 30 days", expiry.within_30)?;
    line(out, "Within 60 days", expiry.within_60)?;
    line(out, "Within 90 days", expiry.within_90)?;
    line(out, "Already expired", expiry.expired)
}

// ── Card ──

pub fn render_contract_card(
    out: &mut impl Write,
    dossier: &ContractDossier,
    now: DateTime<Utc>,
) -> fmt::Result {
    let c = &dossier.contract;
    writeln!(out, "=== {} ===", c.display_name())?;
    writeln!(out, "{}", c.reference())?;
    writeln!(out)?;

    writeln!(out, "Parties")?;
    line(out, "First party", c.first_party_label())?;
    line(out, "Second party", c.second_party_label())?;
    writeln!(out)?;

    writeln!(out, "Terms")?;
    line(out, "Value", format_currency_full(c.value_rp))?;
    line(
        out,
        "Duration",
        format_duration(c.start_date, c.end_date, c.duration_months),
    )?;
    line(out, "Ends", format_optional_date(c.end_date))?;
    if let Some(url) = &c.file_url {
        line(out, "Document", url)?;
    }
    writeln!(out)?;

    writeln!(out, "Workflow")?;
    line(out, "Status", c.status)?;
    line(out, "Risk", c.risk_label())?;
    line(out, "Submitted", format_relative(c.created_at, now))?;
    let last = format_relative(c.last_activity(), now);
    line(out, "Last activity", last)?;
    writeln!(out)?;

    if let Some(entity) = &dossier.entity {
        writeln!(out, "Extracted Entities")?;
        line(out, "Value", format_currency_full(entity.value_rp))?;
        let duration = format_duration(None, None, entity.duration_months);
        line(out, "Duration", duration)?;
        let penalty = entity.penalty.as_deref().unwrap_or(PLACEHOLDER);
        line(out, "Penalty", penalty)?;
        let initial = entity.initial_risk.map(RiskLevel::label);
        line(out, "Initial risk", initial.unwrap_or(PLACEHOLDER))?;
        line(out, "Analyzed", format_relative(entity.analyzed_at, now))?;
        writeln!(out)?;
    }

    if !dossier.findings.is_empty() {
        let summary = RiskSummary::from_items(&dossier.findings);
        writeln!(
            out,
            "Findings ({} high, {} medium, {} low)",
            summary.high, summary.medium, summary.low
        )?;
        for f in &dossier.findings {
            let level = f.level.map(RiskLevel::label).unwrap_or(PLACEHOLDER);
            writeln!(out, "  [{level}] {} - {}", f.section, f.title)?;
            if let Some(desc) = &f.description {
                writeln!(out, "      {desc}")?;
            }
            if let Some(clause) = &f.recommended_clause {
                writeln!(out, "      suggested: {clause}")?;
            }
        }
        writeln!(out)?;
    }

    if let Some(analysis) = &dossier.analysis {
        writeln!(out, "AI Analysis")?;
        let level = analysis.risk_level.map(RiskLevel::label);
        line(out, "Risk level", level.unwrap_or(PLACEHOLDER))?;
        if let Some(confidence) = analysis.confidence {
            line(out, "Confidence", format_percentage(confidence * 100.0))?;
        }
        for factor in &analysis.risk_factors {
            let severity = factor.severity.map(RiskLevel::label).unwrap_or(PLACEHOLDER);
            writeln!(out, "  [{severity}] {}", factor.description)?;
        }
        if let Some(assessment) = &analysis.risk_assessment {
            for rec in &assessment.recommendations {
                writeln!(out, "  * {rec}")?;
            }
        }
        writeln!(out)?;
    }

    writeln!(out, "Notes")?;
    if dossier.notes.is_empty() {
        writeln!(out, "  (none)")?;
    }
    for n in &dossier.notes {
        writeln!(
            out,
            "  {} ({}): {}",
            n.author.as_deref().unwrap_or("anonymous"),
            format_relative(n.created_at, now),
            n.note
        )?;
    }
    Ok(())
}

// ── KPIs ──

pub fn render_kpis(
    out: &mut impl Write,
    legal: Option<&LegalKpi>,
    procurement: Option<&ProcurementKpi>,
    management: Option<&ManagementKpi>,
) -> fmt::Result {
    if let Some(k) = legal {
        writeln!(out, "Legal")?;
        line(out, "New this week", k.contracts_this_week)?;
        line(out, "High risk", k.high_risk)?;
        line(out, "Awaiting AI review", k.pending_ai)?;
        writeln!(out)?;
    }
    if let Some(k) = procurement {
        writeln!(out, "Procurement")?;
        line(out, "New this month", k.new_this_month)?;
        line(out, "Pending legal review", k.pending_legal_review)?;
        line(out, "Approved", k.approved_cnt)?;
        line(out, "Approval rate", format_percentage(k.approval_rate_pct))?;
        writeln!(out)?;
    }
    if let Some(k) = management {
        writeln!(out, "Management")?;
        line(out, "Total contracts", k.total_contracts)?;
        line(out, "Active", k.active_contracts)?;
        line(out, "Pending", k.pending_contracts)?;
        line(out, "Expired", k.expired_contracts)?;
        line(out, "Expiring in 30 days", k.expiring_30_days)?;
        line(out, "Expiring in 60 days", k.expiring_60_days)?;
        line(out, "Expiring in 90 days", k.expiring_90_days)?;
        let total = format_currency(Some(k.total_contract_value));
        line(out, "Total value", total)?;
        let average = format_currency(Some(k.avg_active_contract_value));
        line(out, "Avg active value", average)?;
        let bands = [
            ("High risk", k.high_risk_count, k.high_risk_percentage),
            ("Medium risk", k.medium_risk_count, k.medium_risk_percentage),
            ("Low risk", k.low_risk_count, k.low_risk_percentage),
        ];
        for (label, count, pct) in bands {
            let pct = format_percentage(pct);
            line(out, label, format!("{count:>4}  {pct}"))?;
        }
        writeln!(out)?;
    }
    Ok(())
}

// ── Helpers ──

fn line(out: &mut impl Write, label: &str, value: impl fmt::Display) -> fmt::Result {
    writeln!(out, "  {label:<LABEL_WIDTH$} {value}")
}

/// Truncate to `width` characters, marking the cut with `…`.
fn clip(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(width.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}
