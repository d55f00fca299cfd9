//! Analysis Pipeline
//!
//! The staged procedure shared by the scoping and execution flows:
//! timed progress checkpoints, exactly one agent call under a deadline,
//! then synthesis and auto-save back in the owning manager.
//!
//! Stages are an explicit finite state machine broadcast over a watch
//! channel; the two delay checkpoints on each side of the agent call are
//! presentational pacing, not real sub-task completion.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::models::settings::EngineConfig;
use crate::services::agent::{AgentClient, AgentRequest, SupervisorConfig};
use crate::utils::error::{AppError, AppResult};

/// Named stage of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineStage {
    /// No run in flight
    Idle,
    /// Preconditions being checked
    Validating,
    /// First timed checkpoint before the agent call
    Preparing,
    /// Second timed checkpoint; the agent call follows
    Dispatching,
    /// Agent replied; first post-call checkpoint
    Reviewing,
    /// Structured output being synthesized
    Synthesizing,
    /// Snapshot being written to the store
    AutoSaving,
    /// Last run failed; progress is back at zero. Semantically idle
    /// (nothing running), the stage rests here until the next run starts
    /// so observers can tell failure apart from a clean finish.
    Failed,
}

impl PipelineStage {
    /// Progress percentage shown for this stage
    pub fn progress(&self) -> u8 {
        match self {
            PipelineStage::Idle | PipelineStage::Validating | PipelineStage::Failed => 0,
            PipelineStage::Preparing => 20,
            PipelineStage::Dispatching => 40,
            PipelineStage::Reviewing => 60,
            PipelineStage::Synthesizing => 80,
            PipelineStage::AutoSaving => 100,
        }
    }

    /// Whether a run is in flight
    pub fn is_running(&self) -> bool {
        !matches!(self, PipelineStage::Idle | PipelineStage::Failed)
    }
}

/// Delays for the timed checkpoints
#[derive(Debug, Clone, Copy)]
pub struct PacingConfig {
    pub prepare: Duration,
    pub dispatch: Duration,
    pub review: Duration,
    pub synthesize: Duration,
}

impl PacingConfig {
    /// No delays; tests and headless runs skip the presentational pacing
    pub fn immediate() -> Self {
        Self {
            prepare: Duration::ZERO,
            dispatch: Duration::ZERO,
            review: Duration::ZERO,
            synthesize: Duration::ZERO,
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for PacingConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            prepare: Duration::from_millis(config.prepare_delay_ms),
            dispatch: Duration::from_millis(config.dispatch_delay_ms),
            review: Duration::from_millis(config.review_delay_ms),
            synthesize: Duration::from_millis(config.synthesize_delay_ms),
        }
    }
}

/// Terminal outcome of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The run committed its results and auto-saved a snapshot
    Completed,
    /// A newer session took over mid-flight; nothing was committed
    Superseded,
}

/// Stage driver shared by both managers.
///
/// Owns the agent boundary and the stage channel; the managers own the
/// preconditions, the synthesizers, and the auto-save.
pub struct Pipeline {
    agent: Arc<dyn AgentClient>,
    supervisor: SupervisorConfig,
    pacing: PacingConfig,
    request_timeout: Duration,
    stage_tx: watch::Sender<PipelineStage>,
}

impl Pipeline {
    pub fn new(
        agent: Arc<dyn AgentClient>,
        supervisor: SupervisorConfig,
        pacing: PacingConfig,
        request_timeout: Duration,
    ) -> Self {
        let (stage_tx, _) = watch::channel(PipelineStage::Idle);
        Self {
            agent,
            supervisor,
            pacing,
            request_timeout,
            stage_tx,
        }
    }

    /// Current stage
    pub fn stage(&self) -> PipelineStage {
        *self.stage_tx.borrow()
    }

    /// Current progress percentage
    pub fn progress(&self) -> u8 {
        self.stage().progress()
    }

    /// Whether a run is in flight
    pub fn is_running(&self) -> bool {
        self.stage().is_running()
    }

    /// Subscribe to stage transitions
    pub fn subscribe(&self) -> watch::Receiver<PipelineStage> {
        self.stage_tx.subscribe()
    }

    pub(crate) fn set_stage(&self, stage: PipelineStage) {
        debug!(?stage, progress = stage.progress(), "pipeline stage");
        self.stage_tx.send_replace(stage);
    }

    /// Mark the run failed: progress resets to zero, the running flag
    /// clears. The stage stays at `Failed` until the next run replaces it.
    pub(crate) fn fail(&self) {
        self.set_stage(PipelineStage::Failed);
    }

    /// Return to idle
    pub(crate) fn idle(&self) {
        self.set_stage(PipelineStage::Idle);
    }

    /// Walk the checkpoints around exactly one agent call.
    ///
    /// Returns the narrative text, or `None` when the run was superseded at
    /// a suspension point. Failure (including deadline expiry) sets the
    /// Failed stage and surfaces a network error; the caller commits
    /// nothing in that case.
    pub(crate) async fn converse(
        &self,
        question: String,
        session_id: &str,
        token: &CancellationToken,
    ) -> AppResult<Option<String>> {
        self.set_stage(PipelineStage::Preparing);
        tokio::time::sleep(self.pacing.prepare).await;
        if token.is_cancelled() {
            self.idle();
            return Ok(None);
        }

        self.set_stage(PipelineStage::Dispatching);
        tokio::time::sleep(self.pacing.dispatch).await;
        if token.is_cancelled() {
            self.idle();
            return Ok(None);
        }

        let request = AgentRequest {
            question,
            session_id: session_id.to_string(),
            supervisor: self.supervisor.clone(),
        };
        let reply = match tokio::time::timeout(self.request_timeout, self.agent.ask(request)).await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!(error = %e, "agent call failed");
                self.fail();
                return Err(e);
            }
            Err(_) => {
                warn!(timeout_secs = self.request_timeout.as_secs(), "agent call timed out");
                self.fail();
                return Err(AppError::network("Agent request timed out"));
            }
        };

        if token.is_cancelled() {
            self.idle();
            return Ok(None);
        }

        self.set_stage(PipelineStage::Reviewing);
        tokio::time::sleep(self.pacing.review).await;
        self.set_stage(PipelineStage::Synthesizing);
        tokio::time::sleep(self.pacing.synthesize).await;

        if token.is_cancelled() {
            self.idle();
            return Ok(None);
        }

        Ok(Some(reply.text))
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stage", &self.stage())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::agent::ScriptedAgentClient;

    fn pipeline_with(agent: ScriptedAgentClient) -> Pipeline {
        Pipeline::new(
            Arc::new(agent),
            SupervisorConfig::from(&EngineConfig::default()),
            PacingConfig::immediate(),
            Duration::from_secs(30),
        )
    }

    #[test]
    fn test_stage_progress_mapping() {
        assert_eq!(PipelineStage::Idle.progress(), 0);
        assert_eq!(PipelineStage::Preparing.progress(), 20);
        assert_eq!(PipelineStage::Dispatching.progress(), 40);
        assert_eq!(PipelineStage::Reviewing.progress(), 60);
        assert_eq!(PipelineStage::Synthesizing.progress(), 80);
        assert_eq!(PipelineStage::AutoSaving.progress(), 100);
        assert_eq!(PipelineStage::Failed.progress(), 0);
    }

    #[test]
    fn test_running_flag() {
        assert!(!PipelineStage::Idle.is_running());
        assert!(!PipelineStage::Failed.is_running());
        assert!(PipelineStage::Dispatching.is_running());
        assert!(PipelineStage::AutoSaving.is_running());
    }

    #[tokio::test]
    async fn test_converse_returns_narrative() {
        let pipeline = pipeline_with(ScriptedAgentClient::replying("narrative"));
        let token = CancellationToken::new();

        let text = pipeline
            .converse("question".into(), "sess-1", &token)
            .await
            .unwrap();
        assert_eq!(text.as_deref(), Some("narrative"));
        assert_eq!(pipeline.stage(), PipelineStage::Synthesizing);
    }

    #[tokio::test]
    async fn test_converse_failure_sets_failed_stage() {
        let pipeline = pipeline_with(ScriptedAgentClient::failing("agent down"));
        let token = CancellationToken::new();

        let err = pipeline
            .converse("question".into(), "sess-1", &token)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Network(_)));
        assert_eq!(pipeline.stage(), PipelineStage::Failed);
        assert_eq!(pipeline.progress(), 0);
        assert!(!pipeline.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_converse_deadline_maps_to_network_error() {
        let agent = ScriptedAgentClient::new();
        agent.push(crate::services::agent::ScriptedReply::Stall);
        let pipeline = pipeline_with(agent);
        let token = CancellationToken::new();

        let err = pipeline
            .converse("question".into(), "sess-1", &token)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Network(_)));
        assert_eq!(pipeline.stage(), PipelineStage::Failed);
    }

    #[tokio::test]
    async fn test_converse_cancelled_before_call_skips_agent() {
        let agent = Arc::new(ScriptedAgentClient::replying("never seen"));
        let pipeline = Pipeline::new(
            agent.clone(),
            SupervisorConfig::from(&EngineConfig::default()),
            PacingConfig::immediate(),
            Duration::from_secs(30),
        );
        let token = CancellationToken::new();
        token.cancel();

        let text = pipeline
            .converse("question".into(), "sess-1", &token)
            .await
            .unwrap();
        assert!(text.is_none());
        assert_eq!(agent.call_count(), 0);
        assert_eq!(pipeline.stage(), PipelineStage::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_dispatch_delay_skips_agent() {
        let agent = Arc::new(ScriptedAgentClient::replying("never seen"));
        let pacing = PacingConfig {
            prepare: Duration::ZERO,
            dispatch: Duration::from_millis(100),
            review: Duration::ZERO,
            synthesize: Duration::ZERO,
        };
        let pipeline = Pipeline::new(
            agent.clone(),
            SupervisorConfig::from(&EngineConfig::default()),
            pacing,
            Duration::from_secs(30),
        );
        let token = CancellationToken::new();

        let canceller = token.clone();
        let (text, _) = tokio::join!(
            pipeline.converse("question".into(), "sess-1", &token),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                canceller.cancel();
            }
        );

        assert!(text.unwrap().is_none());
        assert_eq!(agent.call_count(), 0);
        assert_eq!(pipeline.stage(), PipelineStage::Idle);
    }

    #[tokio::test]
    async fn test_subscribe_observes_transitions() {
        let pipeline = pipeline_with(ScriptedAgentClient::replying("ok"));
        let mut rx = pipeline.subscribe();
        let token = CancellationToken::new();

        pipeline
            .converse("question".into(), "sess-1", &token)
            .await
            .unwrap();

        // The receiver sees at least the latest stage
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), PipelineStage::Synthesizing);
    }
}
