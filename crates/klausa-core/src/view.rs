//! Per-screen list configuration.
//!
//! Screens share one filter/sort path and differ only in which date a range
//! applies to, whether rows are re-sorted by value, and how many rows are
//! shown.

use crate::filter::{DateField, FilterCriteria, filter_contracts, take_display};
use crate::model::Contract;
use crate::sort::sort_by_value_desc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenPreset {
    /// Legal inbox: every matching contract, newest first.
    Inbox,
    /// Procurement status tracking: date range on submission date.
    StatusTracking,
    /// Legal risk center: sorted by contract value.
    RiskCenter,
    /// Legal dashboard inbox card.
    LegalDashboard,
    /// Procurement dashboard "latest contracts" card.
    ProcurementDashboard,
    /// Management reports table: date range on contract end date.
    Reports,
}

impl ScreenPreset {
    pub fn date_field(self) -> DateField {
        match self {
            ScreenPreset::Reports => DateField::EndDate,
            _ => DateField::CreatedAt,
        }
    }

    pub fn sorts_by_value(self) -> bool {
        matches!(self, ScreenPreset::RiskCenter)
    }

    pub fn display_limit(self) -> Option<usize> {
        match self {
            ScreenPreset::LegalDashboard => Some(5),
            ScreenPreset::ProcurementDashboard => Some(4),
            ScreenPreset::Reports => Some(50),
            _ => None,
        }
    }

    /// Filter, optionally sort, then truncate.
    ///
    /// The preset's date field overrides whatever `criteria` carries.
    pub fn view<'a>(self, rows: &'a [Contract], criteria: &FilterCriteria) -> Vec<&'a Contract> {
        self.view_sorted(rows, criteria, self.sorts_by_value())
    }

    /// Like [`ScreenPreset::view`], with value ordering forced on when
    /// `by_value` is set. Sorting always happens before the display limit.
    pub fn view_sorted<'a>(
        self,
        rows: &'a [Contract],
        criteria: &FilterCriteria,
        by_value: bool,
    ) -> Vec<&'a Contract> {
        let criteria = FilterCriteria {
            date_field: self.date_field(),
            ..criteria.clone()
        };
        let mut out = filter_contracts(rows, &criteria);
        if by_value || self.sorts_by_value() {
            sort_by_value_desc(&mut out);
        }
        match self.display_limit() {
            Some(limit) => take_display(out, limit),
            None => out,
        }
    }
}
