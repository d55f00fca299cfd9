//! Scoping Session Manager
//!
//! Owns the in-memory state of the audit currently being scoped and
//! mediates save/load/delete against the scoping namespace of the store.
//! Running the analysis pipeline derives control domains and keeps the
//! agent narrative as provenance.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::models::settings::EngineConfig;
use crate::models::{AuditType, ControlDomain, DomainStatus, ScopingSession};
use crate::services::agent::{AgentClient, SupervisorConfig};
use crate::services::pipeline::{PacingConfig, Pipeline, PipelineStage, RunOutcome};
use crate::storage::database::Database;
use crate::storage::session_store::{SessionStore, SCOPING_NAMESPACE};
use crate::utils::clock::Clock;
use crate::utils::error::{AppError, AppResult};
use crate::utils::ids::IdSource;

/// Manager for the active scoping session
pub struct ScopingManager {
    session: ScopingSession,
    store: SessionStore<ScopingSession>,
    pipeline: Pipeline,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdSource>,
    run_token: CancellationToken,
}

impl ScopingManager {
    pub fn new(
        db: &Database,
        agent: Arc<dyn AgentClient>,
        config: &EngineConfig,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdSource>,
    ) -> Self {
        let session = ScopingSession::empty(ids.next_id(), clock.now());
        let pipeline = Pipeline::new(
            agent,
            SupervisorConfig::from(config),
            PacingConfig::from(config),
            Duration::from_secs(config.request_timeout_secs),
        );
        Self {
            session,
            store: SessionStore::new(db, SCOPING_NAMESPACE),
            pipeline,
            clock,
            ids,
            run_token: CancellationToken::new(),
        }
    }

    // ========================================================================
    // Field mutations (pure, never touch storage)
    // ========================================================================

    pub fn set_audit_type(&mut self, audit_type: AuditType) {
        self.session.audit_type = Some(audit_type);
    }

    pub fn set_custom_audit_name(&mut self, name: impl Into<String>) {
        self.session.custom_audit_name = name.into();
    }

    pub fn set_scope_text(&mut self, text: impl Into<String>) {
        self.session.scope_text = text.into();
    }

    pub fn set_frameworks(&mut self, frameworks: Vec<String>) {
        self.session.selected_frameworks = frameworks;
    }

    /// Add the framework if absent, remove it if present
    pub fn toggle_framework(&mut self, framework: &str) {
        let frameworks = &mut self.session.selected_frameworks;
        if let Some(pos) = frameworks.iter().position(|f| f == framework) {
            frameworks.remove(pos);
        } else {
            frameworks.push(framework.to_string());
        }
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    /// Run the scoping analysis for the current session.
    ///
    /// Fails fast with a validation error (no stage change, no agent call,
    /// no storage effect) when the session is not complete enough. On
    /// success the derived domains replace the previous set wholesale and
    /// an auto-saved snapshot is written under a generated name.
    pub async fn begin_analysis(&mut self) -> AppResult<RunOutcome> {
        if self.pipeline.is_running() {
            return Err(AppError::validation("An analysis is already running"));
        }
        self.session
            .validate_for_analysis()
            .map_err(AppError::validation)?;

        self.run_token = CancellationToken::new();
        let token = self.run_token.clone();
        self.pipeline.set_stage(PipelineStage::Validating);

        let question = build_scoping_prompt(&self.session);
        let narrative = match self
            .pipeline
            .converse(question, &self.session.id, &token)
            .await
        {
            Ok(Some(text)) => text,
            Ok(None) => return Ok(RunOutcome::Superseded),
            Err(e) => return Err(e),
        };

        if token.is_cancelled() {
            self.pipeline.idle();
            return Ok(RunOutcome::Superseded);
        }

        // Commit: narrative as provenance, synthesized domains as output.
        // The synthesizer does not parse the narrative; the two stages stay
        // independently pluggable.
        self.session.control_domains = synthesize_control_domains(self.ids.as_ref());
        self.session.ai_response = Some(narrative);

        let now = self.clock.now();
        self.session.name = format!(
            "Auto-saved: {} - {}",
            self.session.audit_label(),
            now.format("%Y-%m-%d %H:%M")
        );
        self.session.last_updated = now;

        self.pipeline.set_stage(PipelineStage::AutoSaving);
        let saved = self.store.upsert(&self.session).await;
        self.pipeline.idle();
        saved?;

        info!(session_id = %self.session.id, "scoping analysis completed and auto-saved");
        Ok(RunOutcome::Completed)
    }

    // ========================================================================
    // Persistence commands
    // ========================================================================

    /// Save the current session under an explicit name
    pub async fn save_current(&mut self, name: impl Into<String>) -> AppResult<()> {
        self.session.name = name.into();
        self.session.last_updated = self.clock.now();
        self.store.upsert(&self.session).await
    }

    /// Replace all manager state with a loaded session in one swap.
    ///
    /// Any in-flight run is marked stale so its late commits become no-ops.
    pub fn load_session(&mut self, session: ScopingSession) {
        self.run_token.cancel();
        self.run_token = CancellationToken::new();
        self.session = session;
    }

    /// Remove a session from the store; when it was the active session,
    /// reset to a fresh empty session with a new id.
    pub async fn delete_session(&mut self, id: &str) -> AppResult<Vec<ScopingSession>> {
        let remaining = self.store.delete(id).await?;
        if id == self.session.id {
            self.run_token.cancel();
            self.run_token = CancellationToken::new();
            self.session = ScopingSession::empty(self.ids.next_id(), self.clock.now());
        }
        Ok(remaining)
    }

    /// All saved scoping sessions, most-recently-updated first
    pub async fn list_sessions(&self) -> Vec<ScopingSession> {
        self.store.load_all().await
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn session(&self) -> &ScopingSession {
        &self.session
    }

    pub fn current_session_id(&self) -> &str {
        &self.session.id
    }

    pub fn stage(&self) -> PipelineStage {
        self.pipeline.stage()
    }

    pub fn progress(&self) -> u8 {
        self.pipeline.progress()
    }

    pub fn is_processing(&self) -> bool {
        self.pipeline.is_running()
    }

    pub fn subscribe_stage(&self) -> watch::Receiver<PipelineStage> {
        self.pipeline.subscribe()
    }
}

/// Deterministic prompt for the scoping analysis
fn build_scoping_prompt(session: &ScopingSession) -> String {
    format!(
        "Plan the scope for a {} covering the following compliance frameworks: {}. \
         Scope description: {}. \
         Identify the control domains this audit should cover and the policies to review.",
        session.audit_label(),
        session.selected_frameworks.join(", "),
        session.scope_text.trim()
    )
}

/// Fixed example control domains.
///
/// The agent narrative is not parsed into structured data; the pipeline
/// returns this standing set so the rest of the workflow has real shapes
/// to operate on.
fn synthesize_control_domains(ids: &dyn IdSource) -> Vec<ControlDomain> {
    let catalog: [(&str, &str, &[&str]); 4] = [
        (
            "Access Control",
            "User provisioning, authentication, and privileged access management.",
            &["AC-01", "AC-02", "AC-06"],
        ),
        (
            "Change Management",
            "Change approval, testing, and deployment controls for production systems.",
            &["CM-03", "CM-04"],
        ),
        (
            "Data Protection",
            "Encryption at rest and in transit, retention, and data classification.",
            &["DP-01", "SC-13", "SC-28"],
        ),
        (
            "Incident Response",
            "Detection, escalation, and post-incident review procedures.",
            &["IR-01", "IR-04", "IR-06"],
        ),
    ];

    catalog
        .iter()
        .map(|(name, description, refs)| ControlDomain {
            id: ids.next_id(),
            name: (*name).to_string(),
            description: (*description).to_string(),
            policy_references: refs.iter().map(|r| (*r).to_string()).collect(),
            status: DomainStatus::Identified,
        })
        .collect()
}
