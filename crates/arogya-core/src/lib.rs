pub mod config;
pub mod error;
pub mod specialty;

pub use config::ArogyaConfig;
pub use error::{ArogyaError, Result};
pub use specialty::Specialty;
