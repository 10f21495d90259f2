//! Error types for the agent layer.
//!
//! Deliberately small: routing is pure and the tool executors are total, so
//! the only failures that escape a turn are unknown sessions and delivery
//! problems.

/// Errors from session handling and delivery.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("session not found: {0}")]
    SessionNotFound(uuid::Uuid),
    #[error("delivery failed: {0}")]
    Delivery(String),
    #[error("delivery timed out after {0} seconds")]
    DeliveryTimeout(u64),
}
