//! Identifier selection by ECL.

use crate::error::{Error, Result};
use crate::http::{expect_success, HttpClient, RepositoryClient};
use std::collections::HashSet;
use termsync_model::IdPage;
use tracing::debug;

const ENDPOINT: &str = "Concept search";

/// Returns every concept id matching `ecl`, in server order without duplicates.
///
/// Pages through `GET /{branch}/concepts?returnIdOnly=true`, advancing the
/// offset by the number of items received. Stops on an empty page or once the
/// offset reaches the reported total; a missing total ends after the first
/// non-empty page.
pub fn select_ids<C: HttpClient>(
    client: &RepositoryClient<C>,
    ecl: &str,
    page_size: u32,
) -> Result<Vec<String>> {
    let page_size = page_size.max(1);
    let mut ids = Vec::new();
    let mut seen = HashSet::new();
    let mut offset: u64 = 0;

    loop {
        let query = vec![
            ("ecl".to_string(), ecl.to_string()),
            ("returnIdOnly".to_string(), "true".to_string()),
            ("offset".to_string(), offset.to_string()),
            ("limit".to_string(), page_size.to_string()),
        ];
        let response = expect_success(ENDPOINT, client.get(client.branch_url("/concepts"), query)?)?;
        let page: IdPage = serde_json::from_slice(&response.body).map_err(|e| Error::Decode {
            endpoint: ENDPOINT.into(),
            source: e.into(),
        })?;

        if page.items.is_empty() {
            break;
        }

        offset += page.items.len() as u64;
        let total = page.total.unwrap_or(offset);
        debug!(offset, total, "received id page");

        for id in page.items {
            if seen.insert(id.clone()) {
                ids.push(id);
            }
        }

        if offset >= total {
            break;
        }
    }

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpRequest, HttpResponse, Method};
    use crate::mock::MockClient;
    use parking_lot::Mutex;
    use serde_json::json;

    /// Serves `total` sequential ids honouring offset and limit.
    struct PagedServer {
        total: u64,
        calls: Mutex<Vec<(u64, u64)>>,
    }

    impl HttpClient for PagedServer {
        fn send(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, String> {
            let offset: u64 = request.query_param("offset").unwrap().parse().unwrap();
            let limit: u64 = request.query_param("limit").unwrap().parse().unwrap();
            self.calls.lock().push((offset, limit));

            let end = (offset + limit).min(self.total);
            let items: Vec<String> = (offset..end).map(|i| (1000 + i).to_string()).collect();
            Ok(HttpResponse::json(&json!({"items": items, "total": self.total})))
        }
    }

    fn paged(total: u64) -> RepositoryClient<PagedServer> {
        RepositoryClient::new(
            "https://x",
            "MAIN",
            PagedServer {
                total,
                calls: Mutex::new(Vec::new()),
            },
        )
    }

    #[test]
    fn empty_result_takes_one_page() {
        let client = paged(0);
        let ids = select_ids(&client, "<< 1", 1000).unwrap();
        assert!(ids.is_empty());
        assert_eq!(client.http().calls.lock().len(), 1);
    }

    #[test]
    fn pages_until_total() {
        let client = paged(2500);
        let ids = select_ids(&client, "<< 1", 1000).unwrap();

        assert_eq!(ids.len(), 2500);
        assert_eq!(ids[0], "1000");
        assert_eq!(ids[2499], "3499");
        assert_eq!(
            *client.http().calls.lock(),
            vec![(0, 1000), (1000, 1000), (2000, 1000)]
        );
    }

    #[test]
    fn exact_multiple_of_page_size() {
        let client = paged(2000);
        let ids = select_ids(&client, "<< 1", 1000).unwrap();
        assert_eq!(ids.len(), 2000);
        assert_eq!(client.http().calls.lock().len(), 2);
    }

    #[test]
    fn sends_query_parameters() {
        let mock = MockClient::new();
        mock.push_response(
            Method::Get,
            "/MAIN/concepts",
            HttpResponse::json(&json!({"items": [], "total": 0})),
        );
        let client = RepositoryClient::new("https://x", "MAIN", mock);
        select_ids(&client, "<< 781405001", 50).unwrap();

        let request = &client.http().requests()[0];
        assert_eq!(request.url, "https://x/MAIN/concepts");
        assert_eq!(request.query_param("ecl"), Some("<< 781405001"));
        assert_eq!(request.query_param("returnIdOnly"), Some("true"));
        assert_eq!(request.query_param("offset"), Some("0"));
        assert_eq!(request.query_param("limit"), Some("50"));
    }

    #[test]
    fn missing_total_stops_after_first_page() {
        let mock = MockClient::new();
        mock.push_response(
            Method::Get,
            "/MAIN/concepts",
            HttpResponse::json(&json!({"items": ["1", "2"]})),
        );
        let client = RepositoryClient::new("https://x", "MAIN", mock);

        let ids = select_ids(&client, "<< 1", 10).unwrap();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(client.http().requests().len(), 1);
    }

    #[test]
    fn duplicates_are_dropped() {
        let mock = MockClient::new();
        mock.push_response(
            Method::Get,
            "/MAIN/concepts",
            HttpResponse::json(&json!({"items": ["1", "2"], "total": 4})),
        );
        mock.push_response(
            Method::Get,
            "/MAIN/concepts",
            HttpResponse::json(&json!({"items": ["2", "3"], "total": 4})),
        );
        let client = RepositoryClient::new("https://x", "MAIN", mock);

        let ids = select_ids(&client, "<< 1", 2).unwrap();
        assert_eq!(ids, vec!["1", "2", "3"]);
        let offsets: Vec<_> = client
            .http()
            .requests()
            .iter()
            .map(|r| r.query_param("offset").unwrap().to_string())
            .collect();
        assert_eq!(offsets, vec!["0", "2"]);
    }

    #[test]
    fn http_error_aborts() {
        let mock = MockClient::new();
        mock.push_response(Method::Get, "/MAIN/concepts", HttpResponse::status(401));
        let client = RepositoryClient::new("https://x", "MAIN", mock);

        let err = select_ids(&client, "<< 1", 10).unwrap_err();
        assert!(matches!(err, Error::Http { status: 401, .. }));
    }
}
