pub mod aggregate;
pub mod analysis;
mod error;
pub mod filter;
pub mod format;
pub mod model;
pub mod schema;
pub mod sort;
pub mod view;

pub use aggregate::{ExpiryBuckets, RiskBearing, RiskSummary, StatusCounts};
pub use analysis::{AnalysisRecord, RiskAnalysis};
pub use error::CoreError;
pub use filter::{DateField, DateRange, FilterCriteria, RiskFilter, StatusFilter, StatusGroup};
pub use model::{
    Contract, ContractEntity, ContractPatch, ContractStatus, LegalKpi, LegalNote, ManagementKpi,
    NewLegalNote, ProcurementKpi, RiskFinding, RiskLevel,
};
pub use schema::tables::Table;
pub use view::ScreenPreset;
