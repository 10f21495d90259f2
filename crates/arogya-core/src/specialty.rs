//! The closed set of medical specialty labels.
//!
//! Every specialty value that reaches session state or the user must come
//! from this allow-list. `Specialty` is a validated wrapper over the static
//! label table: it cannot hold an out-of-list value, and deserialization
//! rejects unknown labels.

use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// The fixed allow-list of specialty labels, in validation-scan order.
pub const ALLOWED_SPECIALTIES: [&str; 41] = [
    "Acupuncturist",
    "Andrologist",
    "Anesthesiologist",
    "Audiologist",
    "Ayurveda",
    "Bariatric Surgeon",
    "Cardiac Surgeon",
    "Cardiologist",
    "Cardiothoracic Surgeon",
    "Cosmetologist",
    "Dentist",
    "Dermatologist",
    "Diabetologist",
    "Dietitian/Nutritionist",
    "ENT Specialist",
    "Emergency & Critical Care",
    "Endocrinologist",
    "Family Physician",
    "Gastroenterologist",
    "General Physician",
    "General Surgeon",
    "Gynecologist/Obstetrician",
    "Hematologist",
    "Homoeopath",
    "Infertility Specialist",
    "Internal Medicine",
    "Nephrologist",
    "Neurologist",
    "Neurosurgeon",
    "Oncologist",
    "Ophthalmologist",
    "Orthopedist",
    "Pediatrician",
    "Physiotherapist",
    "Plastic Surgeon",
    "Psychiatrist",
    "Pulmonologist",
    "Radiologist",
    "Rheumatologist",
    "Urologist",
    "Vascular Surgeon",
];

/// One label from the fixed specialty allow-list.
///
/// Construction goes through [`Specialty::from_exact`] or
/// [`Specialty::scan`]; both only ever yield members of
/// [`ALLOWED_SPECIALTIES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Specialty(&'static str);

impl Specialty {
    /// The safe default used whenever classification cannot produce a
    /// confident, valid answer.
    pub const GENERAL_PHYSICIAN: Specialty = Specialty("General Physician");

    /// Look up a label by exact match.
    pub fn from_exact(label: &str) -> Option<Specialty> {
        ALLOWED_SPECIALTIES
            .iter()
            .find(|&&s| s == label)
            .map(|&s| Specialty(s))
    }

    /// Scan free text case-insensitively for any allow-list label.
    ///
    /// Labels are checked in allow-list order; the first one found as a
    /// substring wins. This is the primary validation step for remote
    /// classifier output.
    pub fn scan(text: &str) -> Option<Specialty> {
        let lower = text.to_lowercase();
        ALLOWED_SPECIALTIES
            .iter()
            .find(|&&s| lower.contains(&s.to_lowercase()))
            .map(|&s| Specialty(s))
    }

    /// The label string.
    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Iterate over every allowed specialty.
    pub fn all() -> impl Iterator<Item = Specialty> {
        ALLOWED_SPECIALTIES.iter().map(|&s| Specialty(s))
    }
}

impl Default for Specialty {
    fn default() -> Self {
        Specialty::GENERAL_PHYSICIAN
    }
}

impl fmt::Display for Specialty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl Serialize for Specialty {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

impl<'de> Deserialize<'de> for Specialty {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Specialty::from_exact(&label)
            .ok_or_else(|| de::Error::custom(format!("unknown specialty: {}", label)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list_size() {
        assert_eq!(ALLOWED_SPECIALTIES.len(), 41);
        assert_eq!(Specialty::all().count(), 41);
    }

    #[test]
    fn test_from_exact_member() {
        let s = Specialty::from_exact("Cardiologist").unwrap();
        assert_eq!(s.as_str(), "Cardiologist");
    }

    #[test]
    fn test_from_exact_rejects_unknown() {
        assert!(Specialty::from_exact("Wizard").is_none());
        // Case matters for exact lookup.
        assert!(Specialty::from_exact("cardiologist").is_none());
    }

    #[test]
    fn test_from_exact_slash_label() {
        let s = Specialty::from_exact("Dietitian/Nutritionist").unwrap();
        assert_eq!(s.as_str(), "Dietitian/Nutritionist");
    }

    #[test]
    fn test_scan_case_insensitive() {
        let s = Specialty::scan("you should see a DERMATOLOGIST soon").unwrap();
        assert_eq!(s.as_str(), "Dermatologist");
    }

    #[test]
    fn test_scan_first_match_in_allow_list_order() {
        // Both labels are present; "Cardiac Surgeon" precedes "Cardiologist"
        // in the allow-list, so it wins regardless of text order.
        let s = Specialty::scan("Cardiologist or Cardiac Surgeon").unwrap();
        assert_eq!(s.as_str(), "Cardiac Surgeon");
    }

    #[test]
    fn test_scan_no_match() {
        assert!(Specialty::scan("drink more water").is_none());
        assert!(Specialty::scan("").is_none());
    }

    #[test]
    fn test_default_is_general_physician() {
        assert_eq!(Specialty::default(), Specialty::GENERAL_PHYSICIAN);
        assert_eq!(Specialty::default().as_str(), "General Physician");
    }

    #[test]
    fn test_display_matches_label() {
        let s = Specialty::from_exact("ENT Specialist").unwrap();
        assert_eq!(format!("{}", s), "ENT Specialist");
    }

    #[test]
    fn test_serde_round_trip() {
        let s = Specialty::from_exact("Neurologist").unwrap();
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, "\"Neurologist\"");
        let back: Specialty = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn test_deserialize_rejects_unknown() {
        let result: Result<Specialty, _> = serde_json::from_str("\"Astrologer\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_general_physician_in_allow_list() {
        assert!(ALLOWED_SPECIALTIES.contains(&"General Physician"));
    }
}
