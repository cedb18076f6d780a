//! `reqwest` implementation of the engine's HTTP client.

use reqwest::blocking::Client;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT_LANGUAGE, CONTENT_TYPE, COOKIE, LOCATION,
};
use std::time::Duration;
use termsync_engine::{HttpClient, HttpRequest, HttpResponse, Method};
use thiserror::Error;

/// Language preferences sent with every request.
pub const ACCEPT_LANGUAGE_VALUE: &str = "en-X-900000000000509007,en-X-900000000000508004,en";

/// Errors building the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The session cookie cannot be sent as a header.
    #[error("invalid cookie header: {0}")]
    Cookie(#[from] reqwest::header::InvalidHeaderValue),

    /// The TLS backend or client could not be initialised.
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Blocking HTTP client authenticated by a session cookie.
pub struct ReqwestClient {
    inner: Client,
}

impl ReqwestClient {
    /// Builds a client sending `name=value` as its cookie.
    pub fn new(cookie_name: &str, cookie_value: &str, timeout: Duration) -> Result<Self, ClientError> {
        let inner = Client::builder()
            .default_headers(default_headers(cookie_name, cookie_value)?)
            .timeout(timeout)
            .build()?;
        Ok(Self { inner })
    }
}

/// Headers attached to every request.
pub fn default_headers(cookie_name: &str, cookie_value: &str) -> Result<HeaderMap, ClientError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let mut cookie = HeaderValue::from_str(&format!("{cookie_name}={cookie_value}"))?;
    cookie.set_sensitive(true);
    headers.insert(COOKIE, cookie);
    Ok(headers)
}

impl HttpClient for ReqwestClient {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
        let builder = match request.method {
            Method::Get => self.inner.get(&request.url),
            Method::Post => self.inner.post(&request.url),
        };
        let builder = builder.query(&request.query);
        let builder = match &request.body {
            Some(body) => builder.body(body.clone()),
            None => builder,
        };

        let response = builder.send().map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        let location = header(LOCATION);
        let content_type = header(CONTENT_TYPE);
        let body = response.bytes().map_err(|e| e.to_string())?.to_vec();

        Ok(HttpResponse {
            status,
            location,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_carry_cookie_and_language() {
        let headers = default_headers("JSESSIONID", "abc123").unwrap();
        assert_eq!(headers[COOKIE], "JSESSIONID=abc123");
        assert!(headers[COOKIE].is_sensitive());
        assert_eq!(headers[ACCEPT_LANGUAGE], ACCEPT_LANGUAGE_VALUE);
        assert_eq!(headers[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn control_characters_in_cookie_are_rejected() {
        assert!(matches!(
            default_headers("JSESSIONID", "bad\nvalue"),
            Err(ClientError::Cookie(_))
        ));
    }
}
