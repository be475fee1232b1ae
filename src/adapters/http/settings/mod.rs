//! HTTP adapter for the settings document.

mod handlers;
mod routes;

pub use handlers::SettingsHandlers;
pub use routes::settings_routes;
