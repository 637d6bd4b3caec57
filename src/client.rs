use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use url::Url;

use crate::client_logger::ClientLogger;
use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_EMPTY_RESPONSES, CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS,
};
use crate::types::{
    ErrorResponse, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Model,
};

const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// The environment variable consulted when no API key is supplied directly.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

///////////////////////////////////////// CompletionClient /////////////////////////////////////////

/// One prompt to complete, plus the system instruction to steer it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionRequest {
    /// The fully composed prompt, sent verbatim.
    pub prompt: String,
    /// Tone/behavior instruction, if any.
    pub system_instruction: Option<String>,
    /// Model override; the client's own model is used when `None`.
    pub model: Option<Model>,
    /// Cap on output tokens, if any.
    pub max_output_tokens: Option<u32>,
}

impl CompletionRequest {
    /// Creates a request with no system instruction.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Sets the system instruction.
    pub fn with_system_instruction(mut self, system_instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(system_instruction.into());
        self
    }

    /// Sets the model override.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = Some(model);
        self
    }

    /// Sets the output token cap.
    pub fn with_max_output_tokens(mut self, max_output_tokens: Option<u32>) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }
}

/// Anything that can turn a prompt into a reply.
///
/// [`ChatSession`](crate::chat::ChatSession) talks to the model only through this trait, so a
/// session can be driven by [`Gemini`] in production and by a scripted client in tests.
#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync {
    /// Complete `request`, returning the reply text.
    ///
    /// # Errors
    ///
    /// Returns a completion error (see [`Error::is_completion`]) when the exchange fails.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/////////////////////////////////////////////// Gemini ///////////////////////////////////////////////

/// Read the API key from `GOOGLE_API_KEY`, loading a `.env` file from the working directory first.
///
/// Blank values count as missing.
pub fn api_key_from_env() -> Option<String> {
    let _ = dotenv::dotenv();
    env::var(API_KEY_ENV)
        .ok()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}

/// Client for the Gemini API.
#[derive(Clone)]
pub struct Gemini {
    api_key: String,
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
    model: Model,
    generation_config: GenerationConfig,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl Gemini {
    /// Create a new Gemini client.
    ///
    /// The API key can be provided directly or read from the GOOGLE_API_KEY environment
    /// variable (or a `.env` file).
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no non-blank key is available.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_options(api_key, None, None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(
        api_key: Option<String>,
        base_url: Option<String>,
        timeout: Option<Duration>,
        model: Option<Model>,
    ) -> Result<Self> {
        let api_key = resolve_api_key(api_key)?;

        let base_url = parse_base_url(base_url.as_deref().unwrap_or(DEFAULT_API_URL))?;
        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            api_key,
            client,
            base_url,
            timeout,
            model: model.unwrap_or_default(),
            generation_config: GenerationConfig::default(),
            logger: None,
        })
    }

    /// Install a logger that observes every request and response.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Sets the sampling parameters applied to every request.
    pub fn with_generation_config(mut self, generation_config: GenerationConfig) -> Self {
        self.generation_config = generation_config;
        self
    }

    /// Changes the model used for requests.
    pub fn set_model(&mut self, model: Model) {
        self.model = model;
    }

    /// Returns the model used for requests.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Returns the request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The last four characters of the key, for display.
    pub fn key_hint(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        let start = chars.len().saturating_sub(4);
        chars[start..].iter().collect()
    }

    fn endpoint(&self, model: &Model) -> Result<Url> {
        let model = model.to_string();
        let path = if model.contains('/') {
            format!("{model}:generateContent")
        } else {
            format!("models/{model}:generateContent")
        };
        Ok(self.base_url.join(&path)?)
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert("x-goog-api-key", api_key_header(&self.api_key)?);
        Ok(headers)
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        match response.text().await {
            Ok(body) => error_from_status(status_code, &body, retry_after),
            Err(e) => Error::http_client(
                format!("Failed to read error response: {}", e),
                Some(Box::new(e)),
            ),
        }
    }

    /// Send a request to `generateContent` for `model` and return the raw response.
    pub async fn generate_content(
        &self,
        model: &Model,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let model_name = model.to_string();
        if let Some(logger) = &self.logger {
            logger.log_request(&model_name, request);
        }
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let result = self.post(model, request).await;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        match &result {
            Ok(response) => {
                if let Some(logger) = &self.logger {
                    logger.log_response(&model_name, response);
                }
            }
            Err(err) => {
                CLIENT_REQUEST_ERRORS.click();
                if let Some(logger) = &self.logger {
                    logger.log_error(&model_name, err);
                }
            }
        }
        result
    }

    async fn post(
        &self,
        model: &Model,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = self.endpoint(model)?;
        let response = self
            .client
            .post(url)
            .headers(self.default_headers()?)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(
                        format!("Request timed out: {}", e),
                        Some(self.timeout.as_secs_f64()),
                    )
                } else if e.is_connect() {
                    Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
                }
            })?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| {
                Error::serialization(
                    format!("Failed to parse response: {}", e),
                    Some(Box::new(e)),
                )
            })
    }
}

impl std::fmt::Debug for Gemini {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gemini")
            .field("api_key", &format_args!("…{}", self.key_hint()))
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait::async_trait]
impl CompletionClient for Gemini {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let mut generation_config = self.generation_config.clone();
        if request.max_output_tokens.is_some() {
            generation_config.max_output_tokens = request.max_output_tokens;
        }
        let body = GenerateContentRequest::new(
            request.prompt.clone(),
            request.system_instruction.as_deref(),
        )
        .with_generation_config(generation_config);
        let model = request.model.as_ref().unwrap_or(&self.model);
        let response = self.generate_content(model, &body).await?;
        response.text().ok_or_else(|| {
            CLIENT_EMPTY_RESPONSES.click();
            Error::empty_response("the model returned no text", response.stop_reason())
        })
    }
}

fn resolve_api_key(api_key: Option<String>) -> Result<String> {
    let api_key = match api_key {
        Some(key) => key.trim().to_string(),
        None => api_key_from_env().ok_or_else(|| {
            Error::configuration(
                "API key not provided and GOOGLE_API_KEY is not set (environment or .env file)",
                Some(API_KEY_ENV.to_string()),
            )
        })?,
    };
    if api_key.is_empty() {
        return Err(Error::configuration(
            "API key is blank",
            Some(API_KEY_ENV.to_string()),
        ));
    }
    api_key_header(&api_key)?;
    Ok(api_key)
}

fn api_key_header(api_key: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(api_key).map_err(|_| {
        Error::configuration(
            "API key contains characters not allowed in an HTTP header",
            Some(API_KEY_ENV.to_string()),
        )
    })?;
    value.set_sensitive(true);
    Ok(value)
}

fn parse_base_url(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)?;
    if url.cannot_be_a_base() {
        return Err(Error::configuration(
            format!("{base_url} cannot be used as a base URL"),
            Some("base_url".to_string()),
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Map an HTTP status and error body to the matching error kind.
fn error_from_status(status_code: u16, body: &str, retry_after: Option<u64>) -> Error {
    let detail = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|parsed| parsed.error);
    let status = detail.as_ref().and_then(|d| d.status.clone());
    let message = detail
        .and_then(|d| d.message)
        .unwrap_or_else(|| body.to_string());

    match status_code {
        400 => {
            // Gemini reports an invalid key as a 400 with this reason.
            if message.contains("API key not valid") {
                Error::authentication(message)
            } else {
                Error::bad_request(message)
            }
        }
        401 => Error::authentication(message),
        403 => Error::permission(message),
        404 => Error::not_found(message),
        408 => Error::timeout(message, None),
        429 => Error::rate_limit(message, retry_after),
        500 => Error::internal_server(message),
        502..=504 => Error::service_unavailable(message, retry_after),
        _ => Error::api(status_code, status, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_key_is_used() {
        let client = Gemini::new(Some("  test-key-1234 ".to_string())).unwrap();
        assert_eq!(client.key_hint(), "1234");
        assert_eq!(client.model(), &Model::default());
        assert_eq!(client.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn blank_key_is_a_configuration_error() {
        let err = Gemini::new(Some("   ".to_string())).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn non_ascii_key_is_rejected_up_front() {
        let err = Gemini::new(Some("키값-1234".to_string())).unwrap_err();
        assert!(err.is_configuration());
        let err = Gemini::new(Some("abc\ndef".to_string())).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn debug_hides_key() {
        let client = Gemini::new(Some("secret-abcd".to_string())).unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("abcd"));
    }

    #[test]
    fn endpoint_for_known_and_custom_models() {
        let client = Gemini::new(Some("k".to_string())).unwrap();
        assert_eq!(
            client.endpoint(client.model()).unwrap().as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
        let tuned = Model::Custom("tunedModels/mine".to_string());
        assert_eq!(
            client.endpoint(&tuned).unwrap().as_str(),
            "https://generativelanguage.googleapis.com/v1beta/tunedModels/mine:generateContent"
        );
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let client = Gemini::with_options(
            Some("k".to_string()),
            Some("http://localhost:8080/v1".to_string()),
            Some(Duration::from_secs(5)),
            None,
        )
        .unwrap();
        assert_eq!(
            client.endpoint(client.model()).unwrap().as_str(),
            "http://localhost:8080/v1/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(client.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn invalid_base_url() {
        let err = Gemini::with_options(
            Some("k".to_string()),
            Some("not a url".to_string()),
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Url { .. }));
    }

    #[test]
    fn status_mapping() {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = error_from_status(429, body, Some(12));
        assert!(err.is_rate_limit());
        assert_eq!(
            err.to_string(),
            "Rate limit exceeded: Quota exceeded (retry after 12 seconds)"
        );

        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#;
        assert!(error_from_status(400, body, None).is_authentication());

        let body = r#"{"error":{"code":400,"message":"bad field","status":"INVALID_ARGUMENT"}}"#;
        assert!(matches!(
            error_from_status(400, body, None),
            Error::BadRequest { .. }
        ));

        let err = error_from_status(409, r#"{"error":{"message":"x","status":"ABORTED"}}"#, None);
        assert_eq!(err.status_code(), Some(409));
        assert_eq!(err.to_string(), "ABORTED (409): x");

        let err = error_from_status(503, "upstream down", None);
        assert_eq!(err.to_string(), "Service unavailable: upstream down");
        assert!(err.is_completion());
    }

    #[test]
    fn completion_request_builder() {
        let request = CompletionRequest::new("hi")
            .with_system_instruction("be brief")
            .with_model(Model::from("custom"))
            .with_max_output_tokens(Some(64));
        assert_eq!(request.prompt, "hi");
        assert_eq!(request.system_instruction.as_deref(), Some("be brief"));
        assert_eq!(request.model, Some(Model::Custom("custom".to_string())));
        assert_eq!(request.max_output_tokens, Some(64));
    }
}
