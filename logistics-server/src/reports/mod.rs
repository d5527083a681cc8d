//! Report Export
//!
//! CSV report generation for the job pipeline. Generators page through
//! matching rows (ordered by creation time descending) and append escaped
//! CSV lines to the output file incrementally, bounding peak memory
//! regardless of result-set size.

pub mod csv;
mod generator;

pub use generator::generate;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use shared::models::Role;

/// Supported report types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportType {
    ShipmentsStatus,
    OrdersSummary,
    CodReconciliation,
    WarehouseUtilization,
    UserActivity,
}

impl ReportType {
    /// Lowercase stem used in generated file names
    pub fn file_stem(&self) -> &'static str {
        match self {
            ReportType::ShipmentsStatus => "shipments_status",
            ReportType::OrdersSummary => "orders_summary",
            ReportType::CodReconciliation => "cod_reconciliation",
            ReportType::WarehouseUtilization => "warehouse_utilization",
            ReportType::UserActivity => "user_activity",
        }
    }
}

/// Row filters, all optional. Dates accept `YYYY-MM-DD` or RFC 3339.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportFilters {
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(default)]
    pub status: Option<Vec<String>>,
    #[serde(default)]
    pub warehouse_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub vendor_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub cities: Option<Vec<String>>,
    #[serde(default)]
    pub delivery_types: Option<Vec<String>>,
}

/// Who asked for the export (role is re-checked inside the generator)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Requester {
    pub id: i64,
    pub role: Role,
}

/// Payload carried by a `report-export` job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportJobPayload {
    pub requester: Requester,
    #[serde(rename = "type")]
    pub report_type: ReportType,
    #[serde(default)]
    pub filters: ReportFilters,
    #[serde(default = "default_delivery")]
    pub delivery: String,
}

fn default_delivery() -> String {
    "download".to_string()
}

/// Job result stored in the queue registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportResult {
    pub file_path: String,
    pub file_name: String,
    pub rows: u64,
}

/// Generator configuration
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub reports_dir: PathBuf,
    pub page_size: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn report_type_wire_form() {
        assert_eq!(
            serde_json::to_string(&ReportType::ShipmentsStatus).unwrap(),
            "\"SHIPMENTS_STATUS\""
        );
        let parsed: ReportType = serde_json::from_str("\"COD_RECONCILIATION\"").unwrap();
        assert_eq!(parsed, ReportType::CodReconciliation);
        assert!(serde_json::from_str::<ReportType>("\"NOT_A_REPORT\"").is_err());
    }

    #[test]
    fn payload_defaults_apply() {
        let payload: ReportJobPayload = serde_json::from_value(json!({
            "requester": {"id": 1, "role": "MANAGER"},
            "type": "ORDERS_SUMMARY"
        }))
        .unwrap();
        assert_eq!(payload.delivery, "download");
        assert!(payload.filters.status.is_none());
    }
}
