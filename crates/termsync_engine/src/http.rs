//! HTTP access to a Snowstorm branch.
//!
//! The actual HTTP client is abstracted via a trait so the engine stays
//! synchronous and testable. The CLI implements it with `reqwest`; tests use
//! [`MockClient`](crate::MockClient) or an in-memory fake server.

use crate::error::{body_preview, Error, Result};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET.
    Get,
    /// POST with a JSON body.
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// A request to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Method.
    pub method: Method,
    /// Absolute URL without query string.
    pub url: String,
    /// Query parameters, in order.
    pub query: Vec<(String, String)>,
    /// JSON body for POST requests.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Returns the value of a query parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A received response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// `Location` header.
    pub location: Option<String>,
    /// `Content-Type` header.
    pub content_type: Option<String>,
    /// Body bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response with the given status and no body.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Creates a 200 response with a JSON body.
    pub fn json(body: &serde_json::Value) -> Self {
        Self::status(200).with_json(body)
    }

    /// Sets a JSON body.
    pub fn with_json(mut self, body: &serde_json::Value) -> Self {
        self.body = body.to_string().into_bytes();
        self.content_type = Some("application/json".into());
        self
    }

    /// Sets a raw body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the `Location` header.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the start of the body for diagnostics.
    pub fn body_preview(&self) -> String {
        body_preview(&self.body)
    }
}

/// HTTP client abstraction.
///
/// Implementations carry session concerns (headers, cookies, timeouts).
/// An `Err` means no response was received at all; non-success statuses are
/// returned as responses.
pub trait HttpClient: Send + Sync {
    /// Sends a request and returns the response.
    fn send(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, String>;
}

impl<C: HttpClient + ?Sized> HttpClient for Arc<C> {
    fn send(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, String> {
        (**self).send(request)
    }
}

/// Routes calls to the concept endpoints of one branch.
pub struct RepositoryClient<C: HttpClient> {
    /// Base URL of the Snowstorm API.
    base_url: String,
    /// Branch path.
    branch: String,
    /// HTTP client implementation.
    http: C,
}

impl<C: HttpClient> RepositoryClient<C> {
    /// Creates a client for the given base URL and branch.
    pub fn new(base_url: impl Into<String>, branch: impl Into<String>, http: C) -> Self {
        let base_url: String = base_url.into();
        let branch: String = branch.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            branch: branch.trim_matches('/').to_string(),
            http,
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the branch path.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Returns the underlying HTTP client.
    pub fn http(&self) -> &C {
        &self.http
    }

    /// URL of a branch-scoped path, e.g. `/concepts`.
    pub fn branch_url(&self, path: &str) -> String {
        format!("{}/{}{}", self.base_url, self.branch, path)
    }

    /// URL of a browser path, e.g. `/concepts/bulk`.
    pub fn browser_url(&self, path: &str) -> String {
        format!("{}/browser/{}{}", self.base_url, self.branch, path)
    }

    /// Sends a GET request.
    pub fn get(&self, url: String, query: Vec<(String, String)>) -> Result<HttpResponse> {
        self.send(HttpRequest {
            method: Method::Get,
            url,
            query,
            body: None,
        })
    }

    /// Sends a POST request with a JSON body.
    pub fn post_json<T: Serialize + ?Sized>(&self, url: String, body: &T) -> Result<HttpResponse> {
        let body = serde_json::to_vec(body)?;
        self.send(HttpRequest {
            method: Method::Post,
            url,
            query: Vec::new(),
            body: Some(body),
        })
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!(method = %request.method, url = %request.url, "sending request");
        let response = self
            .http
            .send(&request)
            .map_err(Error::transport_retryable)?;
        debug!(status = response.status, bytes = response.body.len(), "received response");
        Ok(response)
    }
}

/// Fails with [`Error::Http`] unless the response is 2xx.
pub(crate) fn expect_success(endpoint: &str, response: HttpResponse) -> Result<HttpResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(Error::Http {
            endpoint: endpoint.to_string(),
            status: response.status,
            body: response.body_preview(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    struct TestClient {
        response: Mutex<Option<HttpResponse>>,
        last_request: Mutex<Option<HttpRequest>>,
    }

    impl TestClient {
        fn new(response: Option<HttpResponse>) -> Self {
            Self {
                response: Mutex::new(response),
                last_request: Mutex::new(None),
            }
        }
    }

    impl HttpClient for TestClient {
        fn send(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, String> {
            *self.last_request.lock() = Some(request.clone());
            self.response
                .lock()
                .clone()
                .ok_or_else(|| "connection refused".to_string())
        }
    }

    #[test]
    fn url_construction() {
        let client = RepositoryClient::new(
            "https://snowstorm.example.com/snowstorm/snomed-ct/",
            "/MAIN/PROJECT/TASK/",
            TestClient::new(None),
        );
        assert_eq!(client.base_url(), "https://snowstorm.example.com/snowstorm/snomed-ct");
        assert_eq!(client.branch(), "MAIN/PROJECT/TASK");
        assert_eq!(
            client.branch_url("/concepts"),
            "https://snowstorm.example.com/snowstorm/snomed-ct/MAIN/PROJECT/TASK/concepts"
        );
        assert_eq!(
            client.browser_url("/concepts/bulk"),
            "https://snowstorm.example.com/snowstorm/snomed-ct/browser/MAIN/PROJECT/TASK/concepts/bulk"
        );
    }

    #[test]
    fn post_json_encodes_body() {
        let client = RepositoryClient::new(
            "https://x",
            "MAIN",
            TestClient::new(Some(HttpResponse::json(&json!([])))),
        );
        let response = client
            .post_json(client.browser_url("/validate/concepts"), &json!([{"conceptId": "1"}]))
            .unwrap();
        assert!(response.is_success());

        let request = client.http().last_request.lock().clone().unwrap();
        assert_eq!(request.method, Method::Post);
        let body: serde_json::Value = serde_json::from_slice(&request.body.unwrap()).unwrap();
        assert_eq!(body, json!([{"conceptId": "1"}]));
    }

    #[test]
    fn transport_failure_is_retryable() {
        let client = RepositoryClient::new("https://x", "MAIN", TestClient::new(None));
        let err = client.get(client.branch_url("/concepts"), Vec::new()).unwrap_err();
        assert!(matches!(err, Error::Transport { retryable: true, .. }));
    }

    #[test]
    fn expect_success_keeps_body_preview() {
        let response = HttpResponse::status(404).with_body("x".repeat(1000));
        match expect_success("Bulk load", response) {
            Err(Error::Http { endpoint, status, body }) => {
                assert_eq!(endpoint, "Bulk load");
                assert_eq!(status, 404);
                assert_eq!(body.len(), 300);
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert!(expect_success("x", HttpResponse::status(204)).is_ok());
    }

    #[test]
    fn query_param_lookup() {
        let request = HttpRequest {
            method: Method::Get,
            url: "https://x".into(),
            query: vec![("offset".into(), "10".into())],
            body: None,
        };
        assert_eq!(request.query_param("offset"), Some("10"));
        assert_eq!(request.query_param("limit"), None);
    }
}
