use std::pin::Pin;
use std::time::{Duration, Instant};

use futures::Stream;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::sse::process_sse;
use crate::types::{ChatCompletion, ChatCompletionParams, StreamEvent};

/// The public OpenAI endpoint.
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// A boxed stream of completion events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// A remote chat-completion service.
///
/// The chat loop only ever talks to the service through this trait, so tests can drive a
/// conversation with a scripted backend.
#[async_trait::async_trait]
pub trait Completions: Send + Sync {
    /// Send a request and wait for the complete reply.
    async fn send(&self, params: ChatCompletionParams) -> Result<ChatCompletion>;

    /// Send a request and receive the reply as a stream of events.
    async fn stream(&self, params: ChatCompletionParams) -> Result<EventStream>;
}

/// Client for an OpenAI-compatible chat completion API.
#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    client: ReqwestClient,
    base_url: Url,
}

impl OpenAi {
    /// Create a new client against the default endpoint.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_API_URL)
    }

    /// Create a new client against a proxy or alternate service.
    ///
    /// A missing trailing slash is added so that relative endpoints resolve beneath the
    /// given path: `http://localhost:8080/v1` and `http://localhost:8080/v1/` are the same.
    pub fn with_base_url(api_key: impl Into<String>, base_url: &str) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::authentication("API key is empty"));
        }
        let base_url = normalize_base_url(base_url)?;

        let client = ReqwestClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            api_key,
            client,
            base_url,
        })
    }

    /// The base URL requests are sent to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self) -> Result<Url> {
        Ok(self.base_url.join("chat/completions")?)
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| Error::authentication("API key contains invalid header characters"))?;
        headers.insert(header::AUTHORIZATION, bearer);
        Ok(headers)
    }

    async fn post(&self, params: &ChatCompletionParams, headers: HeaderMap) -> Result<Response> {
        let url = self.endpoint()?;
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        tracing::debug!(
            %url,
            model = %params.model,
            messages = params.messages.len(),
            stream = params.stream,
            "sending chat completion request"
        );

        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(params)
            .send()
            .await
            .map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                if e.is_timeout() {
                    Error::timeout(
                        format!("Request timed out: {e}"),
                        Some(CONNECT_TIMEOUT.as_secs_f64()),
                    )
                } else if e.is_connect() {
                    Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
                }
            })?;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            let err = process_error_response(response).await;
            tracing::warn!(error = %err, "chat completion request failed");
            return Err(err);
        }
        Ok(response)
    }
}

impl std::fmt::Debug for OpenAi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAi")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Completions for OpenAi {
    async fn send(&self, mut params: ChatCompletionParams) -> Result<ChatCompletion> {
        params.stream = false;
        let response = self.post(&params, self.default_headers()?).await?;
        let completion = response.json::<ChatCompletion>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {e}"),
                Some(Box::new(e)),
            )
        })?;
        if let Some(usage) = completion.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "chat completion received"
            );
        }
        Ok(completion)
    }

    async fn stream(&self, mut params: ChatCompletionParams) -> Result<EventStream> {
        params.stream = true;
        let mut headers = self.default_headers()?;
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        let response = self.post(&params, headers).await?;
        Ok(Box::pin(process_sse(response.bytes_stream())))
    }
}

fn normalize_base_url(base_url: &str) -> Result<Url> {
    let trimmed = base_url.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    let url = Url::parse(&with_slash)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(Error::url(
            format!("unsupported scheme '{scheme}' in base URL {trimmed}"),
            None,
        )),
    }
}

/// Process API response errors and convert to our Error type
async fn process_error_response(response: Response) -> Error {
    let status_code = response.status().as_u16();

    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .map(String::from);

    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|val| val.to_str().ok())
        .and_then(|val| val.parse::<u64>().ok());

    let error_body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            return Error::http_client(
                format!("Failed to read error response: {e}"),
                Some(Box::new(e)),
            );
        }
    };

    error_from_body(status_code, &error_body, request_id, retry_after)
}

fn error_from_body(
    status_code: u16,
    error_body: &str,
    request_id: Option<String>,
    retry_after: Option<u64>,
) -> Error {
    #[derive(Deserialize)]
    struct ErrorResponse {
        error: Option<ErrorDetail>,
    }

    #[derive(Deserialize)]
    struct ErrorDetail {
        #[serde(rename = "type")]
        error_type: Option<String>,
        message: Option<String>,
        param: Option<String>,
    }

    let detail = serde_json::from_str::<ErrorResponse>(error_body)
        .ok()
        .and_then(|e| e.error);
    let error_type = detail.as_ref().and_then(|e| e.error_type.clone());
    let error_message = detail
        .as_ref()
        .and_then(|e| e.message.clone())
        .unwrap_or_else(|| error_body.to_string());
    let error_param = detail.as_ref().and_then(|e| e.param.clone());

    match status_code {
        400 => Error::bad_request(error_message, error_param),
        401 => Error::authentication(error_message),
        403 => Error::permission(error_message),
        404 => Error::not_found(error_message),
        429 => Error::rate_limit(error_message, retry_after),
        500 => Error::internal_server(error_message, request_id),
        502..=504 => Error::service_unavailable(error_message, retry_after),
        _ => Error::api(status_code, error_type, error_message, request_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let client = OpenAi::new("test-key").unwrap();
        assert_eq!(client.api_key, "test-key");
        assert_eq!(client.base_url().as_str(), DEFAULT_API_URL);
        assert_eq!(
            client.endpoint().unwrap().as_str(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn proxy_without_trailing_slash() {
        let client = OpenAi::with_base_url("test-key", "http://localhost:8080/v1").unwrap();
        assert_eq!(
            client.endpoint().unwrap().as_str(),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn rejects_bad_base_url() {
        assert!(matches!(
            OpenAi::with_base_url("k", "not a url"),
            Err(Error::Url { .. })
        ));
        assert!(matches!(
            OpenAi::with_base_url("k", "ftp://example.com/"),
            Err(Error::Url { .. })
        ));
    }

    #[test]
    fn rejects_empty_key() {
        assert!(
            OpenAi::new("  ")
                .map(|_| ())
                .unwrap_err()
                .is_authentication()
        );
    }

    #[test]
    fn bearer_header() {
        let client = OpenAi::new("sk-abc").unwrap();
        let headers = client.default_headers().unwrap();
        assert_eq!(headers[header::AUTHORIZATION], "Bearer sk-abc");
        assert!(!format!("{client:?}").contains("sk-abc"));
    }

    #[test]
    fn status_mapping() {
        let body = r#"{"error":{"type":"invalid_request_error","message":"bad model","param":"model"}}"#;
        assert!(matches!(
            error_from_body(400, body, None, None),
            Error::BadRequest { param: Some(p), .. } if p == "model"
        ));
        assert!(error_from_body(401, body, None, None).is_authentication());
        assert!(matches!(
            error_from_body(429, body, None, Some(7)),
            Error::RateLimit {
                retry_after: Some(7),
                ..
            }
        ));
        assert!(matches!(
            error_from_body(503, "upstream down", None, None),
            Error::ServiceUnavailable { message, .. } if message == "upstream down"
        ));
        let err = error_from_body(418, body, Some("req_9".to_string()), None);
        assert_eq!(err.status_code(), Some(418));
        assert_eq!(err.request_id(), Some("req_9"));
    }
}
