//! Tool executors.
//!
//! Every executor returns user-safe text. Remote failures, empty results,
//! and malformed payloads all collapse into fixed fallback sentences; no
//! executor has an error path visible to the caller.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, error};

use arogya_core::Specialty;
use arogya_gateway::{EndpointId, RemoteCall};
use arogya_matcher::SpecialistMatcher;

use crate::context::{ContextEntry, SessionState};
use crate::router::ToolKind;

const TRANSLATE_FAILED: &str = "Translation failed. Please try again.";
const NO_GUIDANCE: &str = "I recommend consulting a healthcare professional for your symptoms.";
const GUIDANCE_ERROR: &str =
    "Error providing health guidance. Please consult a healthcare professional.";
const HOSPITALS_ERROR: &str = "Error finding hospitals. Please try again.";

/// Maximum characters of user text forwarded in a guidance request.
const GUIDE_QUERY_LIMIT: usize = 200;

/// Maximum hospital search radius, km.
const HOSPITAL_MAX_DISTANCE_KM: u32 = 5;

/// Hospitals shown per search.
const HOSPITAL_RESULT_LIMIT: usize = 3;

/// Executes the fixed tool set against the remote gateway and the matcher.
pub struct ToolExecutor {
    gateway: Arc<dyn RemoteCall>,
    matcher: Arc<SpecialistMatcher>,
    model: String,
    recent_specialist_window_secs: i64,
}

impl ToolExecutor {
    pub fn new(
        gateway: Arc<dyn RemoteCall>,
        matcher: Arc<SpecialistMatcher>,
        model: impl Into<String>,
        recent_specialist_window_secs: u64,
    ) -> Self {
        Self {
            gateway,
            matcher,
            model: model.into(),
            recent_specialist_window_secs: recent_specialist_window_secs as i64,
        }
    }

    /// Translate text between languages. Defaults English to Telugu.
    pub async fn translate_text(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> String {
        debug!(source_lang, target_lang, "Translating text");
        let payload = json!({
            "text": text,
            "sourceLang": source_lang,
            "targetLang": target_lang,
            "cleanup": true
        });

        match self.gateway.call(EndpointId::Translate, &payload).await {
            Some(body) => match body.get("translation").and_then(Value::as_str) {
                Some(translation) => translation.to_string(),
                None => {
                    error!("Translation response missing translation field");
                    TRANSLATE_FAILED.to_string()
                }
            },
            None => TRANSLATE_FAILED.to_string(),
        }
    }

    /// Map symptoms to a specialist, updating session state.
    pub async fn map_symptoms(&self, symptoms: &str, session: &mut SessionState) -> String {
        let specialist = self.matcher.match_specialist(symptoms).await;
        debug!(%specialist, "Mapped symptoms");

        session.last_specialist = specialist;
        session.record(
            ContextEntry::new(symptoms, ToolKind::MapSymptoms).with_specialist(specialist),
        );

        format!(
            "For your symptoms, consult a {}. Please consult a healthcare professional.",
            specialist
        )
    }

    /// Search for nearby hospitals with the effective specialization:
    /// explicit parameter, else the most recent symptom mapping within the
    /// recency window, else the session's last specialist.
    pub async fn find_nearby_hospitals(
        &self,
        specialization: Option<Specialty>,
        session: &mut SessionState,
    ) -> String {
        let effective = specialization
            .or_else(|| {
                session
                    .recent(
                        |e| e.tool == ToolKind::MapSymptoms,
                        self.recent_specialist_window_secs,
                    )
                    .and_then(|e| e.specialist)
            })
            .unwrap_or(session.last_specialist);
        debug!(specialization = %effective, "Searching hospitals");

        let payload = json!({
            "latitude": session.last_location.latitude,
            "longitude": session.last_location.longitude,
            "maxDistance": HOSPITAL_MAX_DISTANCE_KM,
            "specialization": effective
        });

        let Some(body) = self.gateway.call(EndpointId::FindHospitals, &payload).await else {
            return format!(
                "No hospitals found for {}. Please try a different search.",
                effective
            );
        };

        let hospitals = match body.as_array() {
            Some(list) if !list.is_empty() => list,
            _ => {
                return format!(
                    "No hospitals found for {}. Please try a different search.",
                    effective
                )
            }
        };

        let Some(listing) = format_hospitals(effective, hospitals) else {
            error!("Hospital response entries missing expected fields");
            return HOSPITALS_ERROR.to_string();
        };

        session.record(
            ContextEntry::new("find hospitals", ToolKind::FindNearbyHospitals)
                .with_specialist(effective),
        );
        listing
    }

    /// Detailed health guidance via the chat-completion endpoint.
    pub async fn health_guide(&self, query: &str) -> String {
        let truncated: String = query.chars().take(GUIDE_QUERY_LIMIT).collect();
        let prompt = format!(
            "You are a medical assistant specializing in providing detailed health guidance. \
             For the given health query, provide comprehensive advice including:\n\
             1. Specific lifestyle recommendations\n\
             2. Dietary advice (what to eat/avoid)\n\
             3. Preventive measures\n\
             4. When to seek medical attention\n\n\
             Format your response in clear, numbered points. \
             Be specific, practical, and actionable. \
             Include relevant medical context but avoid making diagnoses. \
             Always end with 'Please consult a healthcare professional for personalized advice.'\n\n\
             Query: {}",
            truncated
        );

        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": prompt},
                {"role": "user", "content": truncated}
            ],
            "temperature": 0.2,
            "max_tokens": 300
        });

        match self.gateway.call(EndpointId::MapSymptoms, &payload).await {
            Some(body) => match extract_completion(&body) {
                Some(content) => content,
                None => {
                    error!("Guidance response had no usable choices");
                    NO_GUIDANCE.to_string()
                }
            },
            None => GUIDANCE_ERROR.to_string(),
        }
    }
}

/// Render the top hospital results as a numbered list. `None` when an entry
/// lacks a required field.
fn format_hospitals(specialization: Specialty, hospitals: &[Value]) -> Option<String> {
    let mut listing = format!("Nearest hospitals with {} specialists:\n\n", specialization);
    for (i, hospital) in hospitals.iter().take(HOSPITAL_RESULT_LIMIT).enumerate() {
        let name = hospital.get("name")?.as_str()?;
        let address = hospital.get("address")?.as_str()?;
        let distance_km = hospital.get("distanceKm")?.as_f64()?;
        listing.push_str(&format!("{}. {}\n", i + 1, name));
        listing.push_str(&format!("   \u{1f4cd} {}\n", address));
        listing.push_str(&format!("   \u{1f4cf} {:.1} km away\n\n", distance_km));
    }
    Some(listing)
}

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
