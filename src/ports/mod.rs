//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `AiTransport` - Thread-based assistant conversations
//! - `SessionStore` - Active refinement sessions
//! - `SettingsRepository` - The operator-editable settings document

mod ai_transport;
mod session_store;
mod settings_repository;

pub use ai_transport::{
    latest_assistant_text, AiTransport, MessageRole, RunStatus, ThreadMessage, TransportError,
    TransportInfo,
};
pub use session_store::{SessionMutator, SessionStore, SessionStoreError};
pub use settings_repository::{SettingsError, SettingsRepository};
