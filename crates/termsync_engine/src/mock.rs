//! A scripted HTTP client for testing.

use crate::http::{HttpClient, HttpRequest, HttpResponse, Method};
use parking_lot::Mutex;
use std::collections::VecDeque;

struct Route {
    method: Method,
    path: String,
    responses: VecDeque<HttpResponse>,
}

/// A mock client answering from per-route response queues.
///
/// A route matches when the method is equal and the request URL ends with the
/// route path. Responses are consumed in order; the last one is repeated.
/// Every request is recorded.
#[derive(Default)]
pub struct MockClient {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockClient {
    /// Creates a mock client with no routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for requests to `path`.
    pub fn push_response(&self, method: Method, path: impl Into<String>, response: HttpResponse) {
        let path = path.into();
        let mut routes = self.routes.lock();
        match routes
            .iter_mut()
            .find(|route| route.method == method && route.path == path)
        {
            Some(route) => route.responses.push_back(response),
            None => routes.push(Route {
                method,
                path,
                responses: VecDeque::from([response]),
            }),
        }
    }

    /// Returns all requests received so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Returns the requests received for `path`.
    pub fn requests_to(&self, method: Method, path: &str) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|request| request.method == method && request.url.ends_with(path))
            .cloned()
            .collect()
    }
}

impl HttpClient for MockClient {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
        self.requests.lock().push(request.clone());

        let mut routes = self.routes.lock();
        let route = routes
            .iter_mut()
            .filter(|route| route.method == request.method && request.url.ends_with(&route.path))
            .max_by_key(|route| route.path.len())
            .ok_or_else(|| format!("no mock response for {} {}", request.method, request.url))?;

        if route.responses.len() > 1 {
            route
                .responses
                .pop_front()
                .ok_or_else(|| "mock queue drained".to_string())
        } else {
            route
                .responses
                .front()
                .cloned()
                .ok_or_else(|| "mock queue drained".to_string())
        }
    }
}
