//! Settings Adapters
//!
//! Implementations of the SettingsRepository port.
//!
//! - **JsonFileSettingsRepository** - Pretty-printed JSON document on disk
//! - **InMemorySettingsRepository** - In-memory document (testing/development)

mod in_memory;
mod json_file;

pub use in_memory::InMemorySettingsRepository;
pub use json_file::JsonFileSettingsRepository;
