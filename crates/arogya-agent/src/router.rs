//! Keyword routing of user turns onto tools.
//!
//! Routing is pure and deterministic: lowercase substring matching against
//! fixed keyword lists, applied in a strict precedence order. No remote
//! calls happen here, and routing cannot fail; anything unrecognized lands
//! on the health-guide tool.

use std::fmt;

use tracing::debug;

use crate::context::SessionState;

/// Phrases that signal a follow-up question about which specialist to see.
const SPECIALIST_KEYWORDS: [&str; 20] = [
    "who",
    "which doctor",
    "which specialist",
    "what doctor",
    "what specialist",
    "treat",
    "treats",
    "treating",
    "treat this",
    "treat these",
    "help",
    "helps",
    "helping",
    "help with",
    "help for",
    "see",
    "consult",
    "visit",
    "go to",
    "recommend",
];

/// Concrete symptom terms.
const SYMPTOM_KEYWORDS: [&str; 30] = [
    "pain",
    "ache",
    "rash",
    "fever",
    "cough",
    "headache",
    "dizziness",
    "nausea",
    "vomiting",
    "diarrhea",
    "constipation",
    "burning",
    "itching",
    "swelling",
    "redness",
    "infection",
    "disease",
    "illness",
    "heartburn",
    "reflux",
    "acid",
    "sleep",
    "trouble",
    "difficulty",
    "severe",
    "chronic",
    "acute",
    "persistent",
    "recurring",
    "constant",
];

/// Phrases that describe having a health problem without naming a symptom.
const PROBLEM_INDICATORS: [&str; 30] = [
    "problem",
    "problems",
    "suffering",
    "suffering from",
    "experiencing",
    "having",
    "have",
    "has",
    "got",
    "getting",
    "trouble",
    "difficulty",
    "issue",
    "issues",
    "condition",
    "conditions",
    "symptom",
    "symptoms",
    "diagnosis",
    "diagnosed",
    "pain",
    "ache",
    "hurting",
    "hurts",
    "feel",
    "feeling",
    "feels",
    "sick",
    "ill",
    "unwell",
];

const HOSPITAL_KEYWORDS: [&str; 12] = [
    "hospital",
    "hospitals",
    "nearby",
    "near",
    "clinic",
    "find",
    "search",
    "look",
    "show",
    "where",
    "location",
    "address",
];

const GUIDANCE_KEYWORDS: [&str; 18] = [
    "guidance",
    "advice",
    "help",
    "tips",
    "suggestions",
    "recommendations",
    "how to",
    "what to do",
    "prevent",
    "avoid",
    "manage",
    "treat",
    "care",
    "lifestyle",
    "diet",
    "exercise",
    "sleep",
    "stress",
];

/// The closed set of tools the agent can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    TranslateText,
    MapSymptoms,
    FindNearbyHospitals,
    HealthGuide,
}

impl ToolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::TranslateText => "translate_text",
            ToolKind::MapSymptoms => "map_symptoms",
            ToolKind::FindNearbyHospitals => "find_nearby_hospitals",
            ToolKind::HealthGuide => "health_guide",
        }
    }

    /// Parse a tool name from a string boundary. Unknown names coerce to
    /// the health-guide default rather than erroring.
    pub fn from_name(name: &str) -> ToolKind {
        match name {
            "translate_text" => ToolKind::TranslateText,
            "map_symptoms" => ToolKind::MapSymptoms,
            "find_nearby_hospitals" => ToolKind::FindNearbyHospitals,
            _ => ToolKind::HealthGuide,
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A routed turn: the chosen tool with its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingDecision {
    MapSymptoms { symptoms: String },
    FindNearbyHospitals,
    HealthGuide { query: String },
}

impl RoutingDecision {
    pub fn tool(&self) -> ToolKind {
        match self {
            RoutingDecision::MapSymptoms { .. } => ToolKind::MapSymptoms,
            RoutingDecision::FindNearbyHospitals => ToolKind::FindNearbyHospitals,
            RoutingDecision::HealthGuide { .. } => ToolKind::HealthGuide,
        }
    }
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

/// Route one user turn. Precedence, first match wins:
///
/// 1. specialist-inquiry phrase with an earlier symptom mapping in context,
///    of any age — re-resolve that mapping's original symptom text;
/// 2. symptom term or problem indicator — map the raw input;
/// 3. hospital term — search hospitals;
/// 4. guidance term — health guide;
/// 5. default — health guide.
pub fn route(user_text: &str, session: &SessionState) -> RoutingDecision {
    let lower = user_text.to_lowercase();

    if contains_any(&lower, &SPECIALIST_KEYWORDS) {
        if let Some(entry) = session.last_symptom_entry() {
            debug!("Specialist follow-up with symptom context, re-mapping");
            return RoutingDecision::MapSymptoms {
                symptoms: entry.user_input.clone(),
            };
        }
    }

    if contains_any(&lower, &SYMPTOM_KEYWORDS) || contains_any(&lower, &PROBLEM_INDICATORS) {
        debug!("Symptom query, mapping to specialist");
        return RoutingDecision::MapSymptoms {
            symptoms: user_text.to_string(),
        };
    }

    if contains_any(&lower, &HOSPITAL_KEYWORDS) {
        debug!("Hospital query");
        return RoutingDecision::FindNearbyHospitals;
    }

    if contains_any(&lower, &GUIDANCE_KEYWORDS) {
        debug!("Guidance query");
        return RoutingDecision::HealthGuide {
            query: user_text.to_string(),
        };
    }

    debug!("No keyword match, defaulting to health guide");
    RoutingDecision::HealthGuide {
        query: user_text.to_string(),
    }
}
