//! Specialist matcher for Arogya.
//!
//! Converts a free-text symptom description into a specialty from the fixed
//! allow-list: local embedding similarity against a reference table first,
//! then a remote chat-completion fallback with strict output validation.
//! The matcher's public contract is total — it always returns a valid
//! specialty and never errors.

pub mod embedding;
pub mod matcher;
pub mod reference;

pub use embedding::{DynEmbedder, Embedder, MockEmbedder, OnnxEmbedder};
pub use matcher::{GatewayClassifier, RemoteClassifier, SpecialistMatcher};
pub use reference::{cosine_similarity, ReferenceEntry, ReferenceTable};
