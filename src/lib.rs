//! Minimal client for the Gemini `generateContent` API.

pub mod config;
pub mod error;
pub mod gemini;

pub use error::{GeminiError, Result, TransportError};
