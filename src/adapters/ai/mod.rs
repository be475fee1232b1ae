//! AI Transport Adapters.
//!
//! Implementations of the AiTransport port.
//!
//! ## Available Adapters
//!
//! - `OpenAiAssistantsTransport` - OpenAI Assistants API (threads and runs)
//! - `MockAiTransport` - Scriptable in-memory transport for testing

mod mock_transport;
mod openai_assistants;

pub use mock_transport::{MockAiTransport, MockError, MockReply, RecordedRun};
pub use openai_assistants::{OpenAiAssistantsConfig, OpenAiAssistantsTransport};
