use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{GeminiError, Result, TransportError};
use crate::gemini::executor::{BodyStream, HttpExecutor, HttpRequest, ReqwestExecutor};
use crate::gemini::types::*;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_TOKENS: i32 = 32000;
pub const DEFAULT_TEMPERATURE: f64 = 1.0;

pub const MAX_RESPONSE_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_ERROR_BODY_BYTES: usize = 1024;
const TRUNCATION_MARKER: &str = "...(truncated)";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Per-call generation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOptions {
    pub max_tokens: i32,
    pub temperature: Option<f64>,
    pub google_search: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: Some(DEFAULT_TEMPERATURE),
            google_search: false,
        }
    }
}

impl GenerateOptions {
    pub fn max_tokens(mut self, max_tokens: i32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn google_search(mut self, enabled: bool) -> Self {
        self.google_search = enabled;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.max_tokens <= 0 {
            return Err(GeminiError::Validation(format!(
                "max tokens must be positive, got {}",
                self.max_tokens
            )));
        }
        if let Some(t) = self.temperature {
            if t < 0.0 {
                return Err(GeminiError::Validation(format!(
                    "temperature must be non-negative, got {}",
                    t
                )));
            }
        }
        Ok(())
    }
}

/// Configures a [`GeminiClient`]. Setters may be called in any order and
/// repeatedly; the last value wins.
pub struct ClientBuilder {
    api_key: SecretString,
    model: String,
    base_url: String,
    timeout: Duration,
    executor: Option<Arc<dyn HttpExecutor>>,
}

impl ClientBuilder {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            executor: None,
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Timeout of the default executor. Ignored when an executor is supplied.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn executor<E: HttpExecutor + 'static>(self, executor: E) -> Self {
        self.shared_executor(Arc::new(executor))
    }

    pub fn shared_executor(mut self, executor: Arc<dyn HttpExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn build(self) -> Result<GeminiClient> {
        let key = self.api_key.expose_secret();
        if key.trim().is_empty() {
            return Err(GeminiError::Config("API key must not be empty".to_string()));
        }
        let mut api_key = HeaderValue::from_str(key).map_err(|_| {
            GeminiError::Config("API key contains characters not allowed in a header".to_string())
        })?;
        api_key.set_sensitive(true);

        let base_url = Url::parse(&self.base_url).map_err(|e| {
            GeminiError::Config(format!("invalid base URL {:?}: {}", self.base_url, e))
        })?;
        if base_url.scheme() != "https" {
            return Err(GeminiError::Config(format!(
                "base URL must use HTTPS, got {:?}",
                self.base_url
            )));
        }

        let endpoint = format!(
            "{}/{}:generateContent",
            base_url.as_str().trim_end_matches('/'),
            self.model
        );
        let endpoint = Url::parse(&endpoint).map_err(|e| {
            GeminiError::Config(format!("invalid model name {:?}: {}", self.model, e))
        })?;

        let executor = match self.executor {
            Some(executor) => executor,
            None => Arc::new(
                ReqwestExecutor::new(self.timeout)
                    .map_err(|e| GeminiError::Config(e.to_string()))?,
            ),
        };

        info!("Gemini client initialized");
        debug!("Model: {}", self.model);

        Ok(GeminiClient {
            api_key,
            model: self.model,
            endpoint,
            executor,
        })
    }
}

/// Client for the `generateContent` endpoint.
///
/// Holds only read-only configuration, so one instance can serve concurrent
/// calls as long as its executor can.
pub struct GeminiClient {
    api_key: HeaderValue,
    model: String,
    endpoint: Url,
    executor: Arc<dyn HttpExecutor>,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::builder(SecretString::new(api_key.into())).build()
    }

    pub fn builder(api_key: SecretString) -> ClientBuilder {
        ClientBuilder::new(api_key)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Sends `prompt` and returns the parsed response.
    ///
    /// Performs exactly one request through the executor. Cancelling `cancel`
    /// before the response has been read fails with
    /// [`TransportError::Cancelled`].
    pub async fn generate(
        &self,
        cancel: &CancellationToken,
        prompt: &str,
        options: GenerateOptions,
    ) -> Result<GenerateContentResponse> {
        options.validate()?;

        let mut request = GenerateContentRequest::from_prompt(
            prompt,
            GenerationConfig {
                max_output_tokens: options.max_tokens,
                temperature: options.temperature,
            },
        );
        if options.google_search {
            request.tools.push(Tool::google_search());
        }

        let payload = serde_json::to_vec(&request).map_err(GeminiError::Serialize)?;

        debug!(
            "Sending request to {} (max_tokens={}, temperature={:?}, google_search={}, {} bytes)",
            self.model,
            options.max_tokens,
            options.temperature,
            options.google_search,
            payload.len()
        );

        let http_request = HttpRequest::post_json(self.endpoint.clone(), Bytes::from(payload))
            .header(HeaderName::from_static(API_KEY_HEADER), self.api_key.clone());

        let (status, body) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransportError::Cancelled.into()),
            result = self.round_trip(http_request) => result?,
        };

        if status >= 400 {
            debug!("Request rejected with HTTP {}", status);
            return Err(GeminiError::ApiError {
                status,
                message: truncate_error_body(&body),
            });
        }

        let resp: GenerateContentResponse =
            serde_json::from_slice(&body).map_err(GeminiError::Deserialize)?;

        let usage = &resp.usage_metadata;
        debug!(
            "Tokens - prompt: {}, response: {}, total: {}",
            usage.prompt_token_count, usage.candidates_token_count, usage.total_token_count
        );

        Ok(resp)
    }

    async fn round_trip(&self, request: HttpRequest) -> Result<(u16, Bytes)> {
        let response = self.executor.execute(request).await?;
        let body = read_limited(response.body, MAX_RESPONSE_BYTES).await?;
        Ok((response.status, body))
    }
}

/// Buffers `body`, giving up as soon as it grows past `limit`.
async fn read_limited(mut body: BodyStream, limit: usize) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        if buf.len() + chunk.len() > limit {
            return Err(GeminiError::ResponseTooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

fn truncate_error_body(body: &[u8]) -> String {
    let truncated = body.len() > MAX_ERROR_BODY_BYTES;
    let text = String::from_utf8_lossy(&body[..body.len().min(MAX_ERROR_BODY_BYTES)]);

    // Lossy decoding can widen invalid bytes; cut back on a char boundary.
    let mut end = text.len().min(MAX_ERROR_BODY_BYTES);
    while !text.is_char_boundary(end) {
        end -= 1;
    }

    let mut message = text[..end].to_string();
    if truncated {
        message.push_str(TRUNCATION_MARKER);
    }
    message
}
