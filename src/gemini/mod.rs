pub mod client;
pub mod executor;
#[cfg(test)]
pub(crate) mod mock;
pub mod retry;
pub mod types;

pub use client::{
    ClientBuilder, GeminiClient, GenerateOptions, DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS,
    DEFAULT_MODEL, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT,
};
pub use executor::{HttpExecutor, HttpRequest, HttpResponse, ReqwestExecutor};
pub use retry::RetryingExecutor;
pub use types::*;
