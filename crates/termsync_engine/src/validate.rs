//! Server-side validation and the abort policy.

use crate::error::{Error, Result};
use crate::http::{expect_success, HttpClient, RepositoryClient};
use std::fmt;
use std::str::FromStr;
use termsync_model::{decode_list, Concept, ValidationFinding};
use tracing::warn;

const ENDPOINT: &str = "Validation";

/// Which validation findings stop a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationPolicy {
    /// Stop on any finding (`none` ignored).
    StopOnAny,
    /// Stop only on fatal findings (`warnings` ignored).
    #[default]
    IgnoreWarnings,
    /// Never stop (`all` ignored).
    IgnoreAll,
}

impl ValidationPolicy {
    /// Decides whether findings of the given counts stop the run.
    pub fn should_abort(&self, fatal: usize, non_fatal: usize) -> bool {
        match self {
            ValidationPolicy::IgnoreAll => false,
            ValidationPolicy::IgnoreWarnings => fatal > 0,
            ValidationPolicy::StopOnAny => fatal + non_fatal > 0,
        }
    }

    /// Returns the configuration name of the policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationPolicy::StopOnAny => "none",
            ValidationPolicy::IgnoreWarnings => "warnings",
            ValidationPolicy::IgnoreAll => "all",
        }
    }
}

impl fmt::Display for ValidationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(ValidationPolicy::StopOnAny),
            "warnings" => Ok(ValidationPolicy::IgnoreWarnings),
            "all" => Ok(ValidationPolicy::IgnoreAll),
            other => Err(Error::Config(format!(
                "unknown validation level {other:?}, expected none, warnings or all"
            ))),
        }
    }
}

/// Findings for one batch, split by severity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    /// Findings whose severity is fatal.
    pub fatal: Vec<ValidationFinding>,
    /// All other findings.
    pub non_fatal: Vec<ValidationFinding>,
}

impl ValidationReport {
    /// Splits findings into fatal and non-fatal.
    pub fn classify(findings: Vec<ValidationFinding>) -> Self {
        let (fatal, non_fatal) = findings.into_iter().partition(ValidationFinding::is_fatal);
        Self { fatal, non_fatal }
    }

    /// Returns true if there are no findings at all.
    pub fn is_clean(&self) -> bool {
        self.fatal.is_empty() && self.non_fatal.is_empty()
    }

    /// Applies `policy` to this report.
    pub fn should_abort(&self, policy: ValidationPolicy) -> bool {
        policy.should_abort(self.fatal.len(), self.non_fatal.len())
    }

    /// Logs counts and a few sample findings.
    pub fn log_samples(&self) {
        if !self.non_fatal.is_empty() {
            warn!("Non-fatal validation issues: {}", self.non_fatal.len());
            for finding in self.non_fatal.iter().take(2) {
                log_finding(finding);
            }
        }
        if !self.fatal.is_empty() {
            warn!("Fatal validation issues: {}", self.fatal.len());
            for finding in self.fatal.iter().take(3) {
                log_finding(finding);
            }
        }
    }
}

fn log_finding(finding: &ValidationFinding) {
    warn!(
        "  - {} {} concept: {}",
        finding.severity.as_deref().unwrap_or("?"),
        finding.message.as_deref().unwrap_or(""),
        finding.concept_id.as_deref().unwrap_or("?"),
    );
}

/// Validates a batch of patched concepts on the server.
pub fn validate_batch<C: HttpClient>(
    client: &RepositoryClient<C>,
    batch: &[Concept],
) -> Result<ValidationReport> {
    let response = client.post_json(client.browser_url("/validate/concepts"), batch)?;
    let response = expect_success(ENDPOINT, response)?;
    let findings = decode_list(&response.body).map_err(|source| Error::Decode {
        endpoint: ENDPOINT.into(),
        source,
    })?;
    Ok(ValidationReport::classify(findings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpResponse, Method};
    use crate::mock::MockClient;
    use serde_json::json;

    const PATH: &str = "/browser/MAIN/validate/concepts";
    const POLICIES: [ValidationPolicy; 3] = [
        ValidationPolicy::StopOnAny,
        ValidationPolicy::IgnoreWarnings,
        ValidationPolicy::IgnoreAll,
    ];

    #[test]
    fn no_findings_never_abort() {
        for policy in POLICIES {
            assert!(!policy.should_abort(0, 0), "{policy}");
        }
    }

    #[test]
    fn fatal_findings() {
        assert!(ValidationPolicy::StopOnAny.should_abort(1, 0));
        assert!(ValidationPolicy::IgnoreWarnings.should_abort(1, 0));
        assert!(!ValidationPolicy::IgnoreAll.should_abort(1, 0));
    }

    #[test]
    fn non_fatal_findings() {
        assert!(ValidationPolicy::StopOnAny.should_abort(0, 1));
        assert!(!ValidationPolicy::IgnoreWarnings.should_abort(0, 1));
        assert!(!ValidationPolicy::IgnoreAll.should_abort(0, 1));
    }

    #[test]
    fn policy_parsing() {
        assert_eq!("none".parse::<ValidationPolicy>().unwrap(), ValidationPolicy::StopOnAny);
        assert_eq!("Warnings".parse::<ValidationPolicy>().unwrap(), ValidationPolicy::IgnoreWarnings);
        assert_eq!(" ALL ".parse::<ValidationPolicy>().unwrap(), ValidationPolicy::IgnoreAll);
        assert!(matches!("some".parse::<ValidationPolicy>(), Err(Error::Config(_))));

        for policy in POLICIES {
            assert_eq!(policy.as_str().parse::<ValidationPolicy>().unwrap(), policy);
        }
    }

    #[test]
    fn classify_by_severity() {
        let report = ValidationReport::classify(vec![
            ValidationFinding::new("ERROR", "a"),
            ValidationFinding::new("warning", "b"),
            ValidationFinding::new("critical", "c"),
            ValidationFinding::new("INFO", "d"),
        ]);
        assert_eq!(report.fatal.len(), 2);
        assert_eq!(report.non_fatal.len(), 2);
        assert!(!report.is_clean());
        assert!(report.should_abort(ValidationPolicy::IgnoreWarnings));
        assert!(!report.should_abort(ValidationPolicy::IgnoreAll));
    }

    #[test]
    fn validate_batch_accepts_every_shape() {
        for body in [
            json!([{"severity": "WARNING", "message": "m"}]),
            json!({"items": [{"severity": "WARNING", "message": "m"}]}),
            json!({"results": [{"severity": "WARNING", "message": "m"}]}),
        ] {
            let mock = MockClient::new();
            mock.push_response(Method::Post, PATH, HttpResponse::json(&body));
            let client = RepositoryClient::new("https://x", "MAIN", mock);

            let report = validate_batch(&client, &[Concept::new("1")]).unwrap();
            assert_eq!(report.non_fatal.len(), 1, "{body}");
            assert!(report.fatal.is_empty());
        }
    }

    #[test]
    fn empty_body_is_clean() {
        let mock = MockClient::new();
        mock.push_response(Method::Post, PATH, HttpResponse::status(200));
        let client = RepositoryClient::new("https://x", "MAIN", mock);

        assert!(validate_batch(&client, &[Concept::new("1")]).unwrap().is_clean());
    }

    #[test]
    fn sends_batch_as_body() {
        let mock = MockClient::new();
        mock.push_response(Method::Post, PATH, HttpResponse::json(&json!([])));
        let client = RepositoryClient::new("https://x", "MAIN", mock);

        validate_batch(&client, &[Concept::new("1"), Concept::new("2")]).unwrap();
        let request = &client.http().requests()[0];
        let body: serde_json::Value = serde_json::from_slice(request.body.as_ref().unwrap()).unwrap();
        assert_eq!(body[0]["conceptId"], "1");
        assert_eq!(body[1]["conceptId"], "2");
    }

    #[test]
    fn server_error_is_fatal() {
        let mock = MockClient::new();
        mock.push_response(Method::Post, PATH, HttpResponse::status(400));
        let client = RepositoryClient::new("https://x", "MAIN", mock);

        assert!(matches!(
            validate_batch(&client, &[Concept::new("1")]),
            Err(Error::Http { status: 400, .. })
        ));
    }
}
