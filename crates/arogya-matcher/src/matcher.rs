//! Symptom-to-specialist matching.
//!
//! Two-stage pipeline: embedding similarity against the reference table
//! first, remote chat-completion classification as a fallback. Every path
//! ends in an allow-list specialty, with General Physician as the safe
//! default, so `match_specialist` never errors.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{debug, warn};

use arogya_core::config::MatcherConfig;
use arogya_core::specialty::ALLOWED_SPECIALTIES;
use arogya_core::Specialty;
use arogya_gateway::{EndpointId, RemoteCall};

use crate::embedding::DynEmbedder;
use crate::reference::ReferenceTable;

/// Candidate extraction pattern for remote classifier output: a capitalized
/// word, optionally a slash-joined pair ("Dietitian/Nutritionist").
fn label_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b(?:[A-Z][a-z]+(?:/[A-Z][a-z]+)?)\b").expect("label pattern is valid")
    })
}

/// The seam for remote symptom classification.
///
/// `None` means the remote service produced no usable answer for this
/// attempt; the matcher decides whether to retry.
#[async_trait]
pub trait RemoteClassifier: Send + Sync {
    async fn classify(&self, symptoms: &str) -> Option<String>;
}

/// Remote classifier backed by the chat-completion endpoint.
pub struct GatewayClassifier {
    gateway: std::sync::Arc<dyn RemoteCall>,
    model: String,
}

impl GatewayClassifier {
    pub fn new(gateway: std::sync::Arc<dyn RemoteCall>, model: impl Into<String>) -> Self {
        Self {
            gateway,
            model: model.into(),
        }
    }

    /// System prompt constraining the model to the allow-list.
    fn system_prompt() -> String {
        format!(
            "You are a medical specialty mapping assistant. Your sole purpose is to match \
             patient-reported symptoms to ONE appropriate medical specialist type from the \
             following EXACT list:\n\n[{}]\n\n\
             Rules:\n\
             1. STRICTLY respond with ONLY ONE specialty from the above list.\n\
             2. NEVER add explanations, diagnoses, or additional text.\n\
             3. Use 'General Physician' for non-specific symptoms, cases matching multiple \
             specialties equally, or when no clear match exists.\n\
             4. For pediatric cases (<18 years), prefer 'Pediatrician' when applicable.",
            ALLOWED_SPECIALTIES.join(", ")
        )
    }
}

#[async_trait]
impl RemoteClassifier for GatewayClassifier {
    async fn classify(&self, symptoms: &str) -> Option<String> {
        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": Self::system_prompt()},
                {"role": "user", "content": symptoms}
            ],
            "temperature": 0.0,
            "max_tokens": 50
        });

        let body = self.gateway.call(EndpointId::MapSymptoms, &payload).await?;
        extract_completion(&body)
    }
}

/// Pull the assistant message text out of a chat-completion response.
fn extract_completion(body: &Value) -> Option<String> {
    let content = body
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()?
        .trim();
    if content.is_empty() {
        None
    } else {
        Some(content.to_string())
    }
}

/// Validate raw classifier output down to an allow-list specialty.
///
/// Substring scan first, then a regex pass for a capitalized candidate that
/// is an exact list member, then the General Physician default.
pub fn validate_label(raw: &str) -> Specialty {
    if let Some(specialty) = Specialty::scan(raw) {
        return specialty;
    }
    for candidate in label_pattern().find_iter(raw) {
        if let Some(specialty) = Specialty::from_exact(candidate.as_str()) {
            return specialty;
        }
    }
    warn!(raw, "Remote classifier output did not validate, using default");
    Specialty::GENERAL_PHYSICIAN
}

/// Collapse whitespace and drop repeated words, keeping first occurrences.
fn normalize_symptoms(symptoms: &str) -> String {
    let mut seen = Vec::new();
    for word in symptoms.split_whitespace() {
        if !seen.iter().any(|&w| w == word) {
            seen.push(word);
        }
    }
    seen.join(" ")
}

/// The full matching pipeline.
pub struct SpecialistMatcher {
    embedder: Box<dyn DynEmbedder>,
    table: ReferenceTable,
    classifier: Box<dyn RemoteClassifier>,
    threshold: f32,
    remote_attempts: u32,
    remote_pause: Duration,
}

impl SpecialistMatcher {
    pub fn new(
        embedder: Box<dyn DynEmbedder>,
        table: ReferenceTable,
        classifier: Box<dyn RemoteClassifier>,
        config: &MatcherConfig,
    ) -> Self {
        Self {
            embedder,
            table,
            classifier,
            threshold: config.similarity_threshold,
            remote_attempts: config.remote_attempts.max(1),
            remote_pause: Duration::from_millis(config.remote_retry_pause_ms),
        }
    }

    /// Map a symptom description to a specialty. Total: always yields an
    /// allow-list member, falling back to General Physician.
    pub async fn match_specialist(&self, symptoms: &str) -> Specialty {
        let normalized = normalize_symptoms(symptoms);
        if normalized.is_empty() {
            return Specialty::GENERAL_PHYSICIAN;
        }

        if let Some(specialty) = self.match_local(&normalized).await {
            return specialty;
        }

        self.match_remote(&normalized).await
    }

    /// Embedding similarity against the reference table.
    async fn match_local(&self, symptoms: &str) -> Option<Specialty> {
        if self.table.is_empty() {
            return None;
        }
        let query = match self.embedder.embed_boxed(symptoms).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(error = %e, "Embedding failed, deferring to remote classification");
                return None;
            }
        };
        let (score, specialty) = self.table.best_match(&query)?;
        debug!(score, specialty = %specialty, "Best reference-table match");
        if score >= self.threshold {
            Some(specialty)
        } else {
            None
        }
    }

    /// Remote classification with a bounded retry budget.
    async fn match_remote(&self, symptoms: &str) -> Specialty {
        for attempt in 0..self.remote_attempts {
            if let Some(raw) = self.classifier.classify(symptoms).await {
                debug!(raw, attempt = attempt + 1, "Remote classifier answered");
                return validate_label(&raw);
            }
            warn!(
                attempt = attempt + 1,
                max_attempts = self.remote_attempts,
                "Remote classification attempt produced no answer"
            );
            if attempt + 1 < self.remote_attempts {
                tokio::time::sleep(self.remote_pause).await;
            }
        }
        Specialty::GENERAL_PHYSICIAN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use crate::embedding::{Embedder, MockEmbedder};
    use crate::reference::ReferenceEntry;

    /// Classifier that serves canned answers and counts calls.
    struct CannedClassifier {
        answer: Option<String>,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl RemoteClassifier for CannedClassifier {
        async fn classify(&self, _symptoms: &str) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone()
        }
    }

    fn matcher_with(
        table: ReferenceTable,
        answer: Option<&str>,
    ) -> (SpecialistMatcher, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let classifier = CannedClassifier {
            answer: answer.map(String::from),
            calls: Arc::clone(&calls),
        };
        let config = MatcherConfig {
            remote_retry_pause_ms: 1,
            ..MatcherConfig::default()
        };
        let matcher = SpecialistMatcher::new(
            Box::new(MockEmbedder::new()),
            table,
            Box::new(classifier),
            &config,
        );
        (matcher, calls)
    }

    async fn table_for(symptoms: &str, label: &str) -> ReferenceTable {
        let embedding = MockEmbedder::new().embed(symptoms).await.unwrap();
        ReferenceTable::from_entries(vec![ReferenceEntry {
            symptoms: symptoms.to_string(),
            specialty: Specialty::from_exact(label).unwrap(),
            embedding,
        }])
    }

    #[test]
    fn test_normalize_dedupes_preserving_order() {
        assert_eq!(
            normalize_symptoms("pain pain in chest chest pain"),
            "pain in chest"
        );
        assert_eq!(normalize_symptoms("  fever   and   cough  "), "fever and cough");
        assert_eq!(normalize_symptoms(""), "");
    }

    #[test]
    fn test_validate_label_exact() {
        assert_eq!(validate_label("Cardiologist").as_str(), "Cardiologist");
    }

    #[test]
    fn test_validate_label_embedded_in_prose() {
        let s = validate_label("Based on the symptoms you should see a Dermatologist.");
        assert_eq!(s.as_str(), "Dermatologist");
    }

    #[test]
    fn test_validate_label_case_insensitive_scan() {
        assert_eq!(validate_label("NEUROLOGIST").as_str(), "Neurologist");
    }

    #[test]
    fn test_validate_label_slash_specialty() {
        let s = validate_label("Dietitian/Nutritionist");
        assert_eq!(s.as_str(), "Dietitian/Nutritionist");
    }

    #[test]
    fn test_validate_label_garbage_defaults() {
        assert_eq!(
            validate_label("I cannot determine that."),
            Specialty::GENERAL_PHYSICIAN
        );
        assert_eq!(validate_label(""), Specialty::GENERAL_PHYSICIAN);
    }

    #[test]
    fn test_extract_completion_shapes() {
        let good = json!({"choices": [{"message": {"content": " Cardiologist "}}]});
        assert_eq!(extract_completion(&good).unwrap(), "Cardiologist");

        assert!(extract_completion(&json!({"choices": []})).is_none());
        assert!(extract_completion(&json!({})).is_none());
        assert!(
            extract_completion(&json!({"choices": [{"message": {"content": "  "}}]})).is_none()
        );
    }

    #[tokio::test]
    async fn test_local_match_above_threshold_skips_remote() {
        let table = table_for("chest pain and shortness of breath", "Cardiologist").await;
        let (matcher, calls) = matcher_with(table, Some("Urologist"));

        let s = matcher
            .match_specialist("chest pain and shortness of breath")
            .await;
        assert_eq!(s.as_str(), "Cardiologist");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_below_threshold_falls_to_remote() {
        // Unrelated hash vectors sit far below the 0.6 threshold.
        let table = table_for("itchy red rash on arms", "Dermatologist").await;
        let (matcher, calls) = matcher_with(table, Some("Pulmonologist"));

        let s = matcher.match_specialist("wheezing and breathlessness").await;
        assert_eq!(s.as_str(), "Pulmonologist");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_table_goes_straight_to_remote() {
        let (matcher, calls) = matcher_with(ReferenceTable::default(), Some("Orthopedist"));
        let s = matcher.match_specialist("knee pain when climbing stairs").await;
        assert_eq!(s.as_str(), "Orthopedist");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_remote_exhaustion_defaults_to_general_physician() {
        let (matcher, calls) = matcher_with(ReferenceTable::default(), None);
        let s = matcher.match_specialist("strange tingling").await;
        assert_eq!(s, Specialty::GENERAL_PHYSICIAN);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_remote_answer_is_validated() {
        let (matcher, _) = matcher_with(
            ReferenceTable::default(),
            Some("You should definitely see a Gastroenterologist for this."),
        );
        let s = matcher.match_specialist("stomach cramps after eating").await;
        assert_eq!(s.as_str(), "Gastroenterologist");
    }

    #[tokio::test]
    async fn test_invalid_remote_answer_defaults() {
        let (matcher, calls) = matcher_with(ReferenceTable::default(), Some("a shaman perhaps"));
        let s = matcher.match_specialist("bad dreams").await;
        assert_eq!(s, Specialty::GENERAL_PHYSICIAN);
        // An answer, even an invalid one, ends the retry loop.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_input_defaults_without_any_calls() {
        let (matcher, calls) = matcher_with(ReferenceTable::default(), Some("Cardiologist"));
        let s = matcher.match_specialist("   ").await;
        assert_eq!(s, Specialty::GENERAL_PHYSICIAN);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_matching_is_deterministic() {
        let table = table_for("severe migraine with aura", "Neurologist").await;
        let (matcher, _) = matcher_with(table, None);

        let first = matcher.match_specialist("severe migraine with aura").await;
        let second = matcher.match_specialist("severe migraine with aura").await;
        assert_eq!(first, second);
        assert_eq!(first.as_str(), "Neurologist");
    }
}
