//! Report Models
//!
//! Derived, read-only report views. Reports are never persisted on their
//! own; generated ones are rebuilt from stored execution sessions on demand.

use serde::{Deserialize, Serialize};

use super::execution::ExecutionResult;

/// Publication state of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportStatus {
    Draft,
    Review,
    Final,
}

/// Findings counted per severity.
///
/// Severity-weighted: a result with three findings at `high` contributes
/// three to the high counter, not one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindingsTally {
    pub total: u32,
    pub critical: u32,
    pub high: u32,
    pub medium: u32,
    pub low: u32,
}

/// Controls counted by outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlsTally {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
}

/// Display-ready report summary.
///
/// Two provenances exist: a fixed synthetic baseline set and reports
/// generated from execution sessions. Generated reports carry the session's
/// results and agent narrative for drill-down.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub id: String,
    pub name: String,
    pub framework: String,
    pub auditor: String,
    pub completed_date: String,
    pub status: ReportStatus,
    pub findings: FindingsTally,
    pub controls: ControlsTally,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_results: Option<Vec<ExecutionResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_response: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_serialization_omits_empty_provenance() {
        let report = AuditReport {
            id: "r1".into(),
            name: "SOC 2 Type II".into(),
            framework: "SOC 2".into(),
            auditor: "Jordan Meyer".into(),
            completed_date: "2026-06-30".into(),
            status: ReportStatus::Final,
            findings: FindingsTally::default(),
            controls: ControlsTally::default(),
            execution_results: None,
            ai_response: None,
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"completedDate\""));
        assert!(!json.contains("executionResults"));
        assert!(!json.contains("aiResponse"));
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&ReportStatus::Review).unwrap(), "\"review\"");
    }
}
