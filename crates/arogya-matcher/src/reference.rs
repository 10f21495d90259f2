//! Reference table of symptom descriptions with precomputed embeddings.
//!
//! Loaded once at startup from a JSON file of `{symptoms, specialist}`
//! records; every entry is embedded so incoming symptom text can be matched
//! by cosine similarity. A missing or malformed file degrades to an empty
//! table, which simply forces the remote classifier path.

use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use arogya_core::error::ArogyaError;
use arogya_core::Specialty;

use crate::embedding::DynEmbedder;

/// Raw on-disk record, prior to validation.
#[derive(Debug, Deserialize)]
struct RawEntry {
    symptoms: String,
    specialist: String,
}

/// One validated reference entry with its embedding.
#[derive(Debug, Clone)]
pub struct ReferenceEntry {
    pub symptoms: String,
    pub specialty: Specialty,
    pub embedding: Vec<f32>,
}

/// The in-memory reference table used for local similarity matching.
#[derive(Debug, Default)]
pub struct ReferenceTable {
    entries: Vec<ReferenceEntry>,
}

impl ReferenceTable {
    /// Load and embed the reference file.
    ///
    /// Entries with specialist labels outside the allow-list are skipped
    /// with a warning rather than failing the load.
    pub async fn load(path: &Path, embedder: &dyn DynEmbedder) -> Result<Self, ArogyaError> {
        let raw = std::fs::read_to_string(path)?;
        let records: Vec<RawEntry> = serde_json::from_str(&raw)?;

        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            let Some(specialty) = Specialty::from_exact(&record.specialist) else {
                warn!(
                    specialist = %record.specialist,
                    "Skipping reference entry with unknown specialist label"
                );
                continue;
            };
            let embedding = embedder.embed_boxed(&record.symptoms).await?;
            entries.push(ReferenceEntry {
                symptoms: record.symptoms,
                specialty,
                embedding,
            });
        }

        info!(entries = entries.len(), path = %path.display(), "Loaded reference table");
        Ok(Self { entries })
    }

    /// Load the reference file, degrading to an empty table on any failure.
    pub async fn load_or_empty(path: &Path, embedder: &dyn DynEmbedder) -> Self {
        match Self::load(path, embedder).await {
            Ok(table) => table,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Reference table unavailable, matching will rely on remote classification"
                );
                Self::default()
            }
        }
    }

    /// Build a table directly from validated entries. Test constructor.
    pub fn from_entries(entries: Vec<ReferenceEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the entry most similar to the query embedding.
    ///
    /// Returns `None` only when the table is empty; similarity thresholding
    /// is the caller's concern.
    pub fn best_match(&self, query: &[f32]) -> Option<(f32, Specialty)> {
        self.entries
            .iter()
            .map(|entry| (cosine_similarity(query, &entry.embedding), entry.specialty))
            .max_by(|(a, _), (b, _)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }
}

/// Cosine similarity between two vectors. Zero for mismatched lengths or
/// zero-norm inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use crate::embedding::{Embedder, MockEmbedder};

    fn entry(symptoms: &str, label: &str, embedding: Vec<f32>) -> ReferenceEntry {
        ReferenceEntry {
            symptoms: symptoms.to_string(),
            specialty: Specialty::from_exact(label).unwrap(),
            embedding,
        }
    }

    #[test]
    fn test_cosine_identical_vectors() {
        let v = vec![0.6, 0.8];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal_vectors() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite_vectors() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_cosine_zero_norm() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_best_match_empty_table() {
        let table = ReferenceTable::default();
        assert!(table.best_match(&[1.0, 0.0]).is_none());
    }

    #[test]
    fn test_best_match_picks_highest_similarity() {
        let table = ReferenceTable::from_entries(vec![
            entry("chest pain", "Cardiologist", vec![1.0, 0.0]),
            entry("skin rash", "Dermatologist", vec![0.0, 1.0]),
        ]);
        let (score, specialty) = table.best_match(&[0.9, 0.1]).unwrap();
        assert_eq!(specialty.as_str(), "Cardiologist");
        assert!(score > 0.9);
    }

    #[tokio::test]
    async fn test_load_skips_unknown_specialist() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"symptoms": "chest pain and shortness of breath", "specialist": "Cardiologist"}},
                {{"symptoms": "bad vibes", "specialist": "Astrologer"}},
                {{"symptoms": "itchy red rash", "specialist": "Dermatologist"}}
            ]"#
        )
        .unwrap();

        let embedder = MockEmbedder::new();
        let table = ReferenceTable::load(file.path(), &embedder).await.unwrap();
        assert_eq!(table.len(), 2);
    }

    #[tokio::test]
    async fn test_load_or_empty_missing_file() {
        let embedder = MockEmbedder::new();
        let table =
            ReferenceTable::load_or_empty(Path::new("/nonexistent/ref.json"), &embedder).await;
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_load_or_empty_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "this is not json").unwrap();

        let embedder = MockEmbedder::new();
        let table = ReferenceTable::load_or_empty(file.path(), &embedder).await;
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_loaded_entries_match_their_own_text() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"symptoms": "persistent headache", "specialist": "Neurologist"}}]"#
        )
        .unwrap();

        let embedder = MockEmbedder::new();
        let table = ReferenceTable::load(file.path(), &embedder).await.unwrap();

        let query = embedder.embed("persistent headache").await.unwrap();
        let (score, specialty) = table.best_match(&query).unwrap();
        assert_eq!(specialty.as_str(), "Neurologist");
        assert!((score - 1.0).abs() < 1e-5);
    }
}
