//! Blocking HTTP client for the release endpoint.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sbom_archiver_core::{AuthScheme, RecordKey, Settings};
use url::Url;

use crate::error::OracleError;
use crate::response::ReleaseList;

/// Maximum number of response-body bytes kept on a failed status.
const ERROR_BODY_LIMIT: usize = 2048;

/// Answers "is this build still active?" for one inventory record.
pub trait ActivityOracle: Send + Sync {
    /// `Ok(false)` only when the release system positively reports no
    /// matching artifact version. Every failure is an `Err`.
    fn is_build_active(&self, key: &RecordKey) -> Result<bool, OracleError>;
}

/// [`ActivityOracle`] over `GET {base}/{collection}/{project}/_apis/release/releases`.
///
/// The credential header is computed once and attached to every request.
pub struct ReleaseClient {
    agent: ureq::Agent,
    base_url: Url,
    api_version: String,
    authorization: String,
}

impl std::fmt::Debug for ReleaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl ReleaseClient {
    pub fn new(
        base_url: &str,
        api_version: impl Into<String>,
        scheme: AuthScheme,
        token: &str,
        timeout: Duration,
    ) -> Result<Self, OracleError> {
        let invalid = |reason: String| OracleError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason,
        };
        let base_url = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid("URL cannot carry path segments".to_string()));
        }

        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout_write(timeout)
            .build();

        Ok(Self {
            agent,
            base_url,
            api_version: api_version.into(),
            authorization: authorization_header(scheme, token),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, OracleError> {
        Self::new(
            &settings.oracle_base_url,
            settings.api_version.clone(),
            settings.auth_scheme,
            &settings.oracle_token,
            settings.request_timeout,
        )
    }

    /// Endpoint URL for one (collection, project) scope.
    pub fn releases_url(&self, key: &RecordKey) -> Result<Url, OracleError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| OracleError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: "URL cannot carry path segments".to_string(),
            })?
            .pop_if_empty()
            .extend([
                key.collection_id.0.as_str(),
                key.project_id.0.as_str(),
                "_apis",
                "release",
                "releases",
            ]);
        url.query_pairs_mut()
            .append_pair("$expand", "artifacts")
            .append_pair("api-version", &self.api_version);
        Ok(url)
    }

    /// Fetch the release list for the record's (collection, project).
    pub fn fetch_releases(&self, key: &RecordKey) -> Result<ReleaseList, OracleError> {
        let url = self.releases_url(key)?;
        let response = self
            .agent
            .get(url.as_str())
            .set("authorization", &self.authorization)
            .set("accept", "application/json")
            .call();

        match response {
            Ok(resp) => {
                let body = resp
                    .into_string()
                    .map_err(|e| OracleError::Transport(format!("reading body: {e}")))?;
                Ok(serde_json::from_str(&body)?)
            }
            Err(ureq::Error::Status(status, resp)) => {
                let mut body = resp.into_string().unwrap_or_default();
                truncate_at_char_boundary(&mut body, ERROR_BODY_LIMIT);
                Err(OracleError::Status { status, body })
            }
            Err(ureq::Error::Transport(err)) => Err(OracleError::Transport(err.to_string())),
        }
    }
}

impl ActivityOracle for ReleaseClient {
    fn is_build_active(&self, key: &RecordKey) -> Result<bool, OracleError> {
        let releases = self.fetch_releases(key)?;
        let active = releases.contains_build(key.build_number.as_str())?;
        tracing::debug!(
            collection = %key.collection_id,
            project = %key.project_id,
            build = %key.build_number,
            releases = releases.count,
            active,
            "release query answered",
        );
        Ok(active)
    }
}

fn authorization_header(scheme: AuthScheme, token: &str) -> String {
    match scheme {
        AuthScheme::Basic => format!("Basic {}", STANDARD.encode(format!(":{token}"))),
        AuthScheme::Bearer => format!("Bearer {token}"),
    }
}

fn truncate_at_char_boundary(body: &mut String, limit: usize) {
    if body.len() <= limit {
        return;
    }
    let mut cut = limit;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    body.truncate(cut);
}
