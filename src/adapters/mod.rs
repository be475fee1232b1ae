//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `ai` - Assistant transports (OpenAI Assistants, scripted mock)
//! - `http` - REST API (axum)
//! - `settings` - Settings document repositories (JSON file, in-memory)
//! - `storage` - Session store (in-memory)

pub mod ai;
pub mod http;
pub mod settings;
pub mod storage;

pub use ai::{MockAiTransport, OpenAiAssistantsConfig, OpenAiAssistantsTransport};
pub use http::build_router;
pub use settings::{InMemorySettingsRepository, JsonFileSettingsRepository};
pub use storage::InMemorySessionStore;
