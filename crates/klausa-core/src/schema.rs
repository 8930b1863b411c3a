/// Backend table and view names for contract data.
pub mod tables {
    use std::fmt;

    /// Every table or view Klausa reads or writes.
    ///
    /// Row tables use primary key `id`; dependent tables reference their
    /// contract through `contract_id`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Table {
        Contracts,
        ContractEntities,
        RiskFindings,
        LegalNotes,
        AiRiskAnalysis,
        LegalKpi,
        ProcurementKpi,
        ManagementKpi,
    }

    impl Table {
        pub const ALL: [Table; 8] = [
            Table::Contracts,
            Table::ContractEntities,
            Table::RiskFindings,
            Table::LegalNotes,
            Table::AiRiskAnalysis,
            Table::LegalKpi,
            Table::ProcurementKpi,
            Table::ManagementKpi,
        ];

        pub fn name(self) -> &'static str {
            match self {
                Table::Contracts => "contracts",
                Table::ContractEntities => "contract_entities",
                Table::RiskFindings => "risk_findings",
                Table::LegalNotes => "legal_notes",
                Table::AiRiskAnalysis => "ai_risk_analysis",
                Table::LegalKpi => "legal_kpi",
                Table::ProcurementKpi => "procurement_kpi",
                Table::ManagementKpi => "management_kpi",
            }
        }

        /// Timestamp column rows are ordered by (newest first).
        pub fn order_column(self) -> Option<&'static str> {
            match self {
                Table::Contracts | Table::RiskFindings | Table::LegalNotes => Some("created_at"),
                Table::ContractEntities | Table::AiRiskAnalysis => Some("analyzed_at"),
                Table::LegalKpi | Table::ProcurementKpi | Table::ManagementKpi => None,
            }
        }

        /// Whether rows hang off a contract via `contract_id`.
        pub fn is_contract_scoped(self) -> bool {
            matches!(
                self,
                Table::ContractEntities
                    | Table::RiskFindings
                    | Table::LegalNotes
                    | Table::AiRiskAnalysis
            )
        }

        /// Single-row rollup views computed by the backend.
        pub fn is_kpi_view(self) -> bool {
            matches!(
                self,
                Table::LegalKpi | Table::ProcurementKpi | Table::ManagementKpi
            )
        }
    }

    impl fmt::Display for Table {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.name())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::tables::Table;
    use std::collections::HashSet;

    #[test]
    fn table_names_are_unique() {
        let names: HashSet<&str> = Table::ALL.iter().map(|t| t.name()).collect();
        assert_eq!(names.len(), Table::ALL.len());
    }

    #[test]
    fn dependent_tables_are_ordered() {
        for table in Table::ALL.iter().filter(|t| t.is_contract_scoped()) {
            assert!(
                table.order_column().is_some(),
                "{table} has no order column"
            );
        }
    }

    #[test]
    fn kpi_views_have_no_order() {
        assert!(Table::ManagementKpi.is_kpi_view());
        assert_eq!(Table::LegalKpi.order_column(), None);
        assert!(!Table::Contracts.is_kpi_view());
    }
}
