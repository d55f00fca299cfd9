//! Audit Agent Client
//!
//! HTTP client for the external audit agent service. One request per
//! pipeline run: a natural-language question plus a session-scoped
//! supervisor override config; the reply is free-text narrative.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::settings::EngineConfig;
use crate::utils::error::{AppError, AppResult};

/// Static supervisor configuration sent with every request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorConfig {
    pub supervisor_name: String,
    pub supervisor_prompt: String,
    pub summarization: bool,
    pub recursion_limit: u32,
}

impl From<&EngineConfig> for SupervisorConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            supervisor_name: config.supervisor_name.clone(),
            supervisor_prompt: config.supervisor_prompt.clone(),
            summarization: config.summarization,
            recursion_limit: config.recursion_limit,
        }
    }
}

/// One agent request: the question plus the session-scoped override config
#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub question: String,
    pub session_id: String,
    pub supervisor: SupervisorConfig,
}

impl AgentRequest {
    /// Build the wire body for the prediction endpoint
    pub fn to_body(&self) -> serde_json::Value {
        serde_json::json!({
            "question": self.question,
            "overrideConfig": {
                "sessionId": self.session_id,
                "supervisorName": self.supervisor.supervisor_name,
                "supervisorPrompt": self.supervisor.supervisor_prompt,
                "summarization": self.supervisor.summarization,
                "recursionLimit": self.supervisor.recursion_limit,
            }
        })
    }
}

/// Free-text narrative returned by the agent
#[derive(Debug, Clone)]
pub struct AgentReply {
    pub text: String,
}

/// Boundary to the external audit agent service
#[async_trait]
pub trait AgentClient: Send + Sync {
    /// Issue one request and wait for the complete reply
    async fn ask(&self, request: AgentRequest) -> AppResult<AgentReply>;
}

/// Production client speaking JSON over HTTP
pub struct HttpAgentClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAgentClient {
    /// Create a client for the configured prediction endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.agent_endpoint.clone())
    }
}

#[async_trait]
impl AgentClient for HttpAgentClient {
    async fn ask(&self, request: AgentRequest) -> AppResult<AgentReply> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request.to_body())
            .send()
            .await
            .map_err(|e| AppError::network(format!("Agent request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::network(format!(
                "Agent returned HTTP {}: {}",
                status, body
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::network(format!("Agent reply was not valid JSON: {}", e)))?;

        // Any shape without a text field is treated as a failed call
        let text = body
            .get("text")
            .and_then(|t| t.as_str())
            .ok_or_else(|| AppError::network("Agent reply is missing the text field"))?;

        Ok(AgentReply {
            text: text.to_string(),
        })
    }
}

// ============================================================================
// Scripted client
// ============================================================================

/// What a scripted client should do for one request
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Reply with this narrative
    Text(String),
    /// Fail with a network error carrying this message
    Error(String),
    /// Never reply; lets callers exercise the request deadline
    Stall,
}

/// Deterministic stand-in for the agent service.
///
/// Replies are consumed in order; the call counter and the recorded last
/// request let tests assert "no network effect" and inspect the wire shape.
#[derive(Debug, Default)]
pub struct ScriptedAgentClient {
    replies: std::sync::Mutex<std::collections::VecDeque<ScriptedReply>>,
    calls: std::sync::atomic::AtomicUsize,
    last_request: std::sync::Mutex<Option<AgentRequest>>,
}

impl ScriptedAgentClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client that always replies with the same narrative
    pub fn replying(text: impl Into<String>) -> Self {
        let client = Self::new();
        client.push(ScriptedReply::Text(text.into()));
        client
    }

    /// Client whose first request fails
    pub fn failing(message: impl Into<String>) -> Self {
        let client = Self::new();
        client.push(ScriptedReply::Error(message.into()));
        client
    }

    /// Queue the next scripted reply
    pub fn push(&self, reply: ScriptedReply) {
        self.replies.lock().expect("replies lock").push_back(reply);
    }

    /// Number of requests received so far
    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// The most recent request, if any
    pub fn last_request(&self) -> Option<AgentRequest> {
        self.last_request.lock().expect("request lock").clone()
    }
}

#[async_trait]
impl AgentClient for ScriptedAgentClient {
    async fn ask(&self, request: AgentRequest) -> AppResult<AgentReply> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        *self.last_request.lock().expect("request lock") = Some(request);

        let reply = self.replies.lock().expect("replies lock").pop_front();
        match reply {
            Some(ScriptedReply::Text(text)) => Ok(AgentReply { text }),
            Some(ScriptedReply::Error(message)) => Err(AppError::network(message)),
            Some(ScriptedReply::Stall) => {
                // Far beyond any configured deadline
                tokio::time::sleep(std::time::Duration::from_secs(86_400)).await;
                Err(AppError::network("stalled request woke up"))
            }
            None => Err(AppError::network("no scripted reply queued")),
        }
    }
}
