//! Conversational health-routing agent.
//!
//! Holds per-session context, routes each user turn to one of the fixed
//! tools by keyword precedence, executes the tool with user-safe fallbacks,
//! and delivers the response through a transport seam under a timeout.

pub mod context;
pub mod error;
pub mod orchestrator;
pub mod router;
pub mod tools;

pub use context::{ContextEntry, Location, SessionState};
pub use error::AgentError;
pub use orchestrator::{AgentOrchestrator, Transport};
pub use router::{route, RoutingDecision, ToolKind};
pub use tools::ToolExecutor;
