//! `Dresscast` - Weather-aware clothing and packing suggestions
//!
//! This library turns a family description and a location into a day-part
//! weather forecast plus per-member clothing suggestions, backed by the
//! Gemini API: a grounded call fetches the forecast, a structured call turns
//! it into outfits, and an HTTP layer exposes the whole thing.

pub mod config;
pub mod daylight;
pub mod error;
pub mod extract;
pub mod gemini;
pub mod mock;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod retry;
pub mod web;

// Re-export core types for public API
pub use config::DresscastConfig;
pub use error::DresscastError;
pub use gemini::{GeminiClient, ModelClient};
pub use models::{CombinedResult, ForecastData, RawSuggestionRequest, SuggestionEntry};
pub use pipeline::SuggestionPipeline;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, DresscastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
