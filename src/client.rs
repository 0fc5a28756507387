use futures::Stream;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, StatusCode, header};
use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, CLIENT_STATUS_ERRORS};
use crate::sse::{FramingPolicy, process_lines};
use crate::types::ChatRequest;

/// The endpoint used when neither a flag nor the environment names one.
pub const DEFAULT_CHAT_URL: &str = "http://localhost:9090/chat";

/// How much of an error response body is kept for the error message.
const ERROR_BODY_LIMIT: usize = 512;

/// How long to wait for an error response body before reporting without it.
const ERROR_BODY_WAIT: Duration = Duration::from_millis(500);

/// Client for the streaming chat endpoint.
///
/// There is no overall request timeout: a reply may stream for as
/// long as the server likes.  Only connection establishment can be bounded.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: ReqwestClient,
    endpoint: Url,
    framing: FramingPolicy,
    connect_timeout: Option<Duration>,
}

impl ChatClient {
    /// Create a client for `endpoint` with permissive framing and no timeout.
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_options(endpoint, FramingPolicy::default(), None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(
        endpoint: &str,
        framing: FramingPolicy,
        connect_timeout: Option<Duration>,
    ) -> Result<Self> {
        let endpoint = Url::parse(endpoint)?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(Error::url(
                format!("unsupported scheme {:?} in {endpoint}", endpoint.scheme()),
                None,
            ));
        }

        let mut builder = ReqwestClient::builder();
        if let Some(connect_timeout) = connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }
        let client = builder.build().map_err(|e| {
            Error::http_client(
                format!("Failed to build HTTP client: {}", e),
                Some(Box::new(e)),
            )
        })?;

        Ok(Self {
            client,
            endpoint,
            framing,
            connect_timeout,
        })
    }

    /// The endpoint every turn is POSTed to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The policy used to cut response lines into fragments.
    pub fn framing(&self) -> FramingPolicy {
        self.framing
    }

    /// The connect timeout, if one is configured.
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    /// Create and return default headers for chat requests.
    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        headers
    }

    /// Turn a non-200 response into an error carrying the status and a
    /// prefix of the body.
    ///
    /// At most [`ERROR_BODY_LIMIT`] bytes are read, for at most
    /// [`ERROR_BODY_WAIT`].  Whatever arrived by then is kept and the response
    /// is dropped, so a server that never finishes an error body cannot hold
    /// the turn open.
    async fn process_error_response(mut response: Response) -> Error {
        let status = response.status();
        let reason = status.canonical_reason().map(String::from);

        let mut prefix = Vec::new();
        let read = async {
            while prefix.len() < ERROR_BODY_LIMIT {
                match response.chunk().await {
                    Ok(Some(chunk)) => prefix.extend_from_slice(&chunk),
                    Ok(None) | Err(_) => break,
                }
            }
        };
        let _ = tokio::time::timeout(ERROR_BODY_WAIT, read).await;

        let body = String::from_utf8_lossy(&prefix);
        let body = truncate_at_char_boundary(body.trim(), ERROR_BODY_LIMIT).to_string();
        Error::status(status.as_u16(), reason, Some(body))
    }

    /// POST `request` and return the response body as a stream of lines.
    ///
    /// Fails before any line is produced if the body cannot be serialized, the
    /// request cannot be sent, or the status is anything but `200 OK`.  The
    /// connection is owned by the returned stream and closes when it drops.
    pub async fn open_stream(
        &self,
        request: &ChatRequest,
    ) -> Result<impl Stream<Item = Result<String>>> {
        let body = serde_json::to_vec(request).map_err(|e| {
            Error::serialization(
                format!("could not marshal request body: {e}"),
                Some(Box::new(e)),
            )
        })?;

        CLIENT_REQUESTS.click();
        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(self.default_headers())
            .body(body)
            .send()
            .await
            .map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                Error::from_reqwest(e, self.connect_timeout.map(|t| t.as_secs_f64()))
            })?;

        if response.status() != StatusCode::OK {
            CLIENT_STATUS_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }

        Ok(process_lines(response.bytes_stream()))
    }
}

fn truncate_at_char_boundary(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
