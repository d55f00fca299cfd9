//! Execution Models
//!
//! Data structures for audit execution sessions and per-domain results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::scoping::ControlDomain;

/// Progress of auditing a single control domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// Risk classification of an execution result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Outcome of auditing one control domain.
///
/// Created only by the execution pipeline; immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub id: String,
    pub domain_id: String,
    pub domain_name: String,
    pub status: ExecutionStatus,
    pub findings: Vec<String>,
    pub recommendations: Vec<String>,
    pub risk_level: RiskLevel,
}

/// A named, timestamped snapshot of in-progress execution work
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSession {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub selected_domains: Vec<ControlDomain>,
    #[serde(default)]
    pub execution_results: Vec<ExecutionResult>,
    pub ai_response: Option<String>,
}

impl ExecutionSession {
    /// Fresh empty session with nothing selected
    pub fn empty(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            created_at: now,
            last_updated: now,
            selected_domains: Vec::new(),
            execution_results: Vec::new(),
            ai_response: None,
        }
    }

    /// Check the session is complete enough to execute
    pub fn validate_for_execution(&self) -> Result<(), String> {
        if self.selected_domains.is_empty() {
            return Err("No control domains selected for execution".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::scoping::DomainStatus;

    fn domain(id: &str, name: &str) -> ControlDomain {
        ControlDomain {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            policy_references: vec![],
            status: DomainStatus::Ready,
        }
    }

    #[test]
    fn test_empty_selection_rejected() {
        let s = ExecutionSession::empty("e1", Utc::now());
        let err = s.validate_for_execution().unwrap_err();
        assert!(err.contains("No control domains selected"));
    }

    #[test]
    fn test_non_empty_selection_validates() {
        let mut s = ExecutionSession::empty("e1", Utc::now());
        s.selected_domains = vec![domain("d1", "Access Control")];
        assert!(s.validate_for_execution().is_ok());
    }

    #[test]
    fn test_status_and_risk_serialization() {
        assert_eq!(
            serde_json::to_string(&ExecutionStatus::InProgress).unwrap(),
            "\"in-progress\""
        );
        assert_eq!(serde_json::to_string(&RiskLevel::Critical).unwrap(), "\"critical\"");
        let r: RiskLevel = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(r, RiskLevel::Medium);
    }

    #[test]
    fn test_session_serialization_shape() {
        let mut s = ExecutionSession::empty("e1", Utc::now());
        s.selected_domains = vec![domain("d1", "Access Control")];
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"selectedDomains\""));
        assert!(json.contains("\"executionResults\""));
    }
}
