// lib.rs - TennisLens analysis client
pub mod api_client;
pub mod config;
pub mod logging;
pub mod probe;
pub mod session;
pub mod timecode;
pub mod trim;
pub mod types;

// Re-export commonly used types for convenience
pub use api_client::{AnalysisApi, ApiError, HttpAnalysisClient};
pub use config::ClientConfig;
pub use session::{AnalysisSession, AppState, SessionError, SessionEvent, SessionPhase};
pub use trim::{CommittedRange, Handle, TrimSelector};
pub use types::*;
