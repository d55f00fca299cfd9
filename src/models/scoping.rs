//! Scoping Models
//!
//! Data structures for audit scoping sessions and the control domains the
//! analysis pipeline derives from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cadence of the audit being scoped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditType {
    Annually,
    Quarterly,
    Monthly,
    AdHoc,
    Custom,
}

impl AuditType {
    /// Database/wire string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditType::Annually => "annually",
            AuditType::Quarterly => "quarterly",
            AuditType::Monthly => "monthly",
            AuditType::AdHoc => "ad-hoc",
            AuditType::Custom => "custom",
        }
    }

    /// Display label used in prompts and auto-save names
    pub fn label(&self) -> &'static str {
        match self {
            AuditType::Annually => "Annual Audit",
            AuditType::Quarterly => "Quarterly Audit",
            AuditType::Monthly => "Monthly Audit",
            AuditType::AdHoc => "Ad-hoc Audit",
            AuditType::Custom => "Custom Audit",
        }
    }
}

impl std::fmt::Display for AuditType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Readiness of a derived control domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DomainStatus {
    Identified,
    Processing,
    Ready,
}

/// A named area of audit focus with associated policy references.
///
/// Created only by the analysis pipeline; never edited in place. Re-running
/// the analysis replaces the whole set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlDomain {
    pub id: String,
    pub name: String,
    pub description: String,
    pub policy_references: Vec<String>,
    pub status: DomainStatus,
}

/// A named, timestamped snapshot of in-progress scoping work
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopingSession {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub audit_type: Option<AuditType>,
    #[serde(default)]
    pub custom_audit_name: String,
    #[serde(default)]
    pub selected_frameworks: Vec<String>,
    #[serde(default)]
    pub scope_text: String,
    #[serde(default)]
    pub control_domains: Vec<ControlDomain>,
    pub ai_response: Option<String>,
}

impl ScopingSession {
    /// Fresh empty session with no fields filled in
    pub fn empty(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            created_at: now,
            last_updated: now,
            audit_type: None,
            custom_audit_name: String::new(),
            selected_frameworks: Vec::new(),
            scope_text: String::new(),
            control_domains: Vec::new(),
            ai_response: None,
        }
    }

    /// Display label for this session's audit, falling back to the custom
    /// name when `audit_type` is `Custom`.
    pub fn audit_label(&self) -> String {
        match self.audit_type {
            Some(AuditType::Custom) => self.custom_audit_name.clone(),
            Some(t) => t.label().to_string(),
            None => String::new(),
        }
    }

    /// Check the session is complete enough to analyze.
    ///
    /// Requires an audit type (with a non-empty custom name when the type is
    /// custom), at least one framework, and a non-empty scope description.
    pub fn validate_for_analysis(&self) -> Result<(), String> {
        let audit_type = match self.audit_type {
            Some(t) => t,
            None => return Err("Select an audit type before running the analysis".into()),
        };
        if audit_type == AuditType::Custom && self.custom_audit_name.trim().is_empty() {
            return Err("Provide a name for the custom audit".into());
        }
        if self.selected_frameworks.is_empty() {
            return Err("Select at least one compliance framework".into());
        }
        if self.scope_text.trim().is_empty() {
            return Err("Describe the audit scope before running the analysis".into());
        }
        Ok(())
    }
}
