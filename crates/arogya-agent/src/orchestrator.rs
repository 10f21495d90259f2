//! Per-turn orchestration of sessions, routing, execution, and delivery.
//!
//! One orchestrator serves many concurrent conversations. The session map
//! is locked only to look up a handle; each session has its own async mutex
//! held for the duration of a turn, so turns within one conversation are
//! strictly sequential while independent sessions proceed in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use arogya_core::config::AgentConfig;

use crate::context::{ContextEntry, SessionState};
use crate::error::AgentError;
use crate::router::{route, RoutingDecision};
use crate::tools::ToolExecutor;

const EMPTY_RESPONSE: &str = "Sorry, no response was generated. Please try again.";
const DELIVERY_FAILED: &str = "Sorry, failed to display response. Please try again.";

/// The seam through which responses reach the user interface.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), AgentError>;
}

/// Drives the turn cycle for every active session.
pub struct AgentOrchestrator {
    sessions: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<SessionState>>>>,
    executor: ToolExecutor,
    transport: Arc<dyn Transport>,
    config: AgentConfig,
}

impl AgentOrchestrator {
    pub fn new(executor: ToolExecutor, transport: Arc<dyn Transport>, config: AgentConfig) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            executor,
            transport,
            config,
        }
    }

    /// Open a new conversation and return its handle.
    pub fn start_session(&self) -> Uuid {
        let id = Uuid::new_v4();
        let state = Arc::new(tokio::sync::Mutex::new(SessionState::new(&self.config)));
        self.sessions
            .lock()
            .expect("session map lock poisoned")
            .insert(id, state);
        info!(session = %id, "Session started");
        id
    }

    /// Destroy a conversation's state. Unknown handles are ignored.
    pub fn end_session(&self, id: Uuid) {
        let removed = self
            .sessions
            .lock()
            .expect("session map lock poisoned")
            .remove(&id);
        if removed.is_some() {
            info!(session = %id, "Session ended");
        }
    }

    fn session(&self, id: Uuid) -> Result<Arc<tokio::sync::Mutex<SessionState>>, AgentError> {
        self.sessions
            .lock()
            .expect("session map lock poisoned")
            .get(&id)
            .cloned()
            .ok_or(AgentError::SessionNotFound(id))
    }

    /// Process one user turn and deliver the response. Returns the text
    /// that was (attempted to be) delivered.
    pub async fn handle_turn(&self, id: Uuid, user_text: &str) -> Result<String, AgentError> {
        let session = self.session(id)?;
        let mut state = session.lock().await;

        state.maybe_reset();

        let decision = route(user_text, &state);
        let tool = decision.tool();
        debug!(session = %id, %tool, "Routed turn");

        let (mut response, parameters) = match decision {
            RoutingDecision::MapSymptoms { symptoms } => {
                let out = self.executor.map_symptoms(&symptoms, &mut state).await;
                (out, json!({"symptoms": symptoms}))
            }
            RoutingDecision::FindNearbyHospitals => {
                let out = self
                    .executor
                    .find_nearby_hospitals(None, &mut state)
                    .await;
                (out, json!({"specialization": state.last_specialist}))
            }
            RoutingDecision::HealthGuide { query } => {
                let out = self.executor.health_guide(&query).await;
                (out, json!({"query": query}))
            }
        };

        if response.is_empty() {
            error!(session = %id, %tool, "Tool produced an empty response");
            response = EMPTY_RESPONSE.to_string();
        }

        state.record(ContextEntry::new(user_text, tool).with_parameters(parameters));

        let delivered = self.deliver(&response).await;
        Ok(delivered)
    }

    /// Deliver under the configured timeout; on failure make one
    /// best-effort apology delivery.
    async fn deliver(&self, response: &str) -> String {
        match self.send_with_timeout(response).await {
            Ok(()) => response.to_string(),
            Err(e) => {
                error!(error = %e, "Failed to deliver response");
                if let Err(e) = self.send_with_timeout(DELIVERY_FAILED).await {
                    warn!(error = %e, "Failed to deliver apology as well");
                }
                DELIVERY_FAILED.to_string()
            }
        }
    }

    async fn send_with_timeout(&self, text: &str) -> Result<(), AgentError> {
        let timeout = Duration::from_secs(self.config.delivery_timeout_secs);
        match tokio::time::timeout(timeout, self.transport.send(text)).await {
            Ok(result) => result,
            Err(_) => Err(AgentError::DeliveryTimeout(self.config.delivery_timeout_secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};

    use serde_json::Value;

    use arogya_core::config::MatcherConfig;
    use arogya_core::Specialty;
    use arogya_gateway::{EndpointId, RemoteCall};
    use arogya_matcher::{MockEmbedder, ReferenceTable, RemoteClassifier, SpecialistMatcher};

    use crate::router::ToolKind;

    struct ScriptedGateway {
        responses: Mutex<VecDeque<Option<Value>>>,
    }

    #[async_trait]
    impl RemoteCall for ScriptedGateway {
        async fn call(&self, _endpoint: EndpointId, _payload: &Value) -> Option<Value> {
            self.responses.lock().unwrap().pop_front().flatten()
        }
    }

    struct FixedClassifier(&'static str);

    #[async_trait]
    impl RemoteClassifier for FixedClassifier {
        async fn classify(&self, _symptoms: &str) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    /// Transport recording everything sent, optionally failing or hanging.
    struct RecordingTransport {
        sent: Mutex<Vec<String>>,
        fail: AtomicBool,
        hang: AtomicBool,
    }

    impl RecordingTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                fail: AtomicBool::new(false),
                hang: AtomicBool::new(false),
            })
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, text: &str) -> Result<(), AgentError> {
            if self.hang.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(AgentError::Delivery("stream closed".to_string()));
            }
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn orchestrator(
        responses: Vec<Option<Value>>,
        label: &'static str,
        transport: Arc<RecordingTransport>,
    ) -> AgentOrchestrator {
        let gateway = Arc::new(ScriptedGateway {
            responses: Mutex::new(responses.into()),
        });
        let matcher_config = MatcherConfig {
            remote_retry_pause_ms: 1,
            ..MatcherConfig::default()
        };
        let matcher = SpecialistMatcher::new(
            Box::new(MockEmbedder::new()),
            ReferenceTable::default(),
            Box::new(FixedClassifier(label)),
            &matcher_config,
        );
        let executor = ToolExecutor::new(gateway, Arc::new(matcher), "openbiollm-llama3-8b", 300);
        AgentOrchestrator::new(executor, transport, AgentConfig::default())
    }

    #[tokio::test]
    async fn test_unknown_session_is_an_error() {
        let orch = orchestrator(vec![], "General Physician", RecordingTransport::new());
        let err = orch.handle_turn(Uuid::new_v4(), "hello").await.unwrap_err();
        assert!(matches!(err, AgentError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_symptom_turn_delivers_specialist_sentence() {
        let transport = RecordingTransport::new();
        let orch = orchestrator(vec![], "Cardiologist", Arc::clone(&transport));
        let id = orch.start_session();

        let out = orch.handle_turn(id, "I have chest pain").await.unwrap();
        assert_eq!(
            out,
            "For your symptoms, consult a Cardiologist. Please consult a healthcare professional."
        );
        assert_eq!(transport.sent(), vec![out.clone()]);
    }

    #[tokio::test]
    async fn test_hospital_turn_end_to_end() {
        let hospitals = serde_json::json!([
            {"name": "Apollo Hospital", "address": "Jubilee Hills", "distanceKm": 1.2},
            {"name": "Care Hospital", "address": "Banjara Hills", "distanceKm": 2.55},
            {"name": "Rainbow Hospital", "address": "Kondapur", "distanceKm": 3.0},
            {"name": "Extra Hospital", "address": "Far", "distanceKm": 4.0}
        ]);
        let transport = RecordingTransport::new();
        let orch = orchestrator(vec![Some(hospitals)], "General Physician", Arc::clone(&transport));
        let id = orch.start_session();

        // Seed the session as if an earlier turn mapped to Cardiologist.
        {
            let session = orch.session(id).unwrap();
            let mut state = session.lock().await;
            state.last_specialist = Specialty::from_exact("Cardiologist").unwrap();
        }

        let out = orch.handle_turn(id, "find hospitals near me").await.unwrap();
        assert!(out.starts_with("Nearest hospitals with Cardiologist specialists:"));
        assert!(out.contains("1. Apollo Hospital"));
        assert!(out.contains("2. Care Hospital"));
        assert!(out.contains("2.5 km away") || out.contains("2.6 km away"));
        assert!(out.contains("3. Rainbow Hospital"));
        assert!(!out.contains("Extra Hospital"));
    }

    #[tokio::test]
    async fn test_followup_after_symptom_turn() {
        let transport = RecordingTransport::new();
        let orch = orchestrator(vec![], "Neurologist", Arc::clone(&transport));
        let id = orch.start_session();

        orch.handle_turn(id, "I get severe headaches").await.unwrap();
        let out = orch.handle_turn(id, "who should I consult?").await.unwrap();
        assert!(out.contains("Neurologist"));
    }

    #[tokio::test]
    async fn test_turns_append_context_entries() {
        let transport = RecordingTransport::new();
        let orch = orchestrator(
            vec![Some(serde_json::json!({
                "choices": [{"message": {"content": "Drink water."}}]
            }))],
            "General Physician",
            Arc::clone(&transport),
        );
        let id = orch.start_session();

        orch.handle_turn(id, "any diet tips?").await.unwrap();

        let session = orch.session(id).unwrap();
        let state = session.lock().await;
        assert_eq!(state.entries.len(), 1);
        assert_eq!(state.entries[0].tool, ToolKind::HealthGuide);
        assert_eq!(state.entries[0].user_input, "any diet tips?");
        assert_eq!(
            state.entries[0].parameters.as_ref().unwrap()["query"],
            "any diet tips?"
        );
    }

    #[tokio::test]
    async fn test_delivery_failure_sends_apology() {
        let transport = RecordingTransport::new();
        transport.fail.store(true, Ordering::SeqCst);
        let orch = orchestrator(vec![], "Cardiologist", Arc::clone(&transport));
        let id = orch.start_session();

        let out = orch.handle_turn(id, "I have chest pain").await.unwrap();
        assert_eq!(out, DELIVERY_FAILED);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivery_timeout_sends_apology() {
        let transport = RecordingTransport::new();
        transport.hang.store(true, Ordering::SeqCst);
        let orch = orchestrator(vec![], "Cardiologist", Arc::clone(&transport));
        let id = orch.start_session();

        let out = orch.handle_turn(id, "I have chest pain").await.unwrap();
        assert_eq!(out, DELIVERY_FAILED);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_end_session_forgets_state() {
        let orch = orchestrator(vec![], "General Physician", RecordingTransport::new());
        let id = orch.start_session();
        orch.end_session(id);

        let err = orch.handle_turn(id, "hello").await.unwrap_err();
        assert!(matches!(err, AgentError::SessionNotFound(_)));
        // Ending twice is harmless.
        orch.end_session(id);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let transport = RecordingTransport::new();
        let orch = orchestrator(vec![], "Dermatologist", Arc::clone(&transport));
        let a = orch.start_session();
        let b = orch.start_session();

        orch.handle_turn(a, "I have an itchy rash").await.unwrap();

        let session_b = orch.session(b).unwrap();
        let state_b = session_b.lock().await;
        assert!(state_b.entries.is_empty());
        assert_eq!(state_b.last_specialist, Specialty::GENERAL_PHYSICIAN);
    }
}
