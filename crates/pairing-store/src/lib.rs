//! HTTP pairing store adapter.
//!
//! Implements the [`pairing::PairingStore`] trait over the Kitsu addon's
//! JSON endpoints:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | `list_pairings` | `GET {base}/pairing` |
//! | `create_pairing` | `POST {base}/pairing` with `{kitsuProjectId, ayonProjectName, ayonProjectCode}` |
//! | `trigger_sync` | `POST {base}/sync/{ayonProjectName}` |
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** URL building, bearer authentication, timeouts, and
//! response decoding all live here. The [`pairing`] crate sees only
//! [`pairing::PairingStore`] and [`pairing::PairingError`].
//!
//! ## Authentication
//!
//! The bearer token is handed in through [`StoreConfig`] and attached to
//! every request by this client. Nothing is stored in process-wide state, so
//! several stores with different tokens can coexist.

use std::time::Duration;

use async_trait::async_trait;
use pairing::{AyonProjectName, Pairing, PairingError, PairingRequest, PairingStore};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Deserialize;
use tracing::{debug, warn};

/// Connection settings for [`HttpPairingStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Root of the addon endpoints, e.g. `https://ayon.example/api/addons/kitsu/1.2.0`.
    pub base_url: String,
    /// Bearer token of the hosting session.
    pub token: String,
    /// Bound applied to each request, including reading the body.
    pub timeout: Duration,
}

/// [`PairingStore`] backed by the addon's HTTP endpoints.
#[derive(Debug, Clone)]
pub struct HttpPairingStore {
    client: Client,
    base_url: Url,
    token: String,
    timeout: Duration,
}

/// Error body sent by the store on rejection.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

impl HttpPairingStore {
    /// Builds a client for the store at `config.base_url`.
    pub fn new(config: StoreConfig) -> Result<Self, PairingError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| PairingError::Configuration {
            message: format!("invalid server URL '{}': {e}", config.base_url),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(PairingError::Configuration {
                message: format!("server URL '{}' cannot carry a path", config.base_url),
            });
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PairingError::Configuration {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url,
            token: config.token,
            timeout: config.timeout,
        })
    }

    /// Root URL the endpoint paths are appended to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `base_url` with `segments` appended, each percent-encoded as one
    /// path segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Checked in `new`: the base URL can carry a path.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, PairingError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "Store responded");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        let detail = rejection_detail(&body);
        warn!(status = status.as_u16(), detail = ?detail, "Store rejected request");
        Err(PairingError::RemoteRejection {
            status: status.as_u16(),
            detail,
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> PairingError {
        if err.is_timeout() {
            PairingError::Timeout {
                after: self.timeout,
            }
        } else if err.is_builder() {
            PairingError::Configuration {
                message: err.to_string(),
            }
        } else {
            PairingError::Network {
                message: err.to_string(),
            }
        }
    }
}

/// Extracts `detail` from a JSON error body.
///
/// Bodies that are empty, not JSON, or whose `detail` is not a string yield
/// `None`.
pub fn rejection_detail(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail)
}

#[async_trait]
impl PairingStore for HttpPairingStore {
    async fn list_pairings(&self) -> Result<Vec<Pairing>, PairingError> {
        let url = self.endpoint(&["pairing"]);
        debug!(%url, "Fetching pairing list");

        let response = self.send(self.client.get(url)).await?;
        response.json::<Vec<Pairing>>().await.map_err(|e| {
            if e.is_timeout() {
                self.transport_error(e)
            } else {
                PairingError::Network {
                    message: format!("invalid pairing list: {e}"),
                }
            }
        })
    }

    async fn create_pairing(&self, request: &PairingRequest) -> Result<(), PairingError> {
        let url = self.endpoint(&["pairing"]);
        debug!(
            %url,
            kitsu_project_id = %request.kitsu_project_id,
            ayon_project_name = %request.ayon_project_name,
            "Creating pairing"
        );

        self.send(self.client.post(url).json(request)).await?;
        Ok(())
    }

    async fn trigger_sync(&self, project: &AyonProjectName) -> Result<(), PairingError> {
        let url = self.endpoint(&["sync", project.as_str()]);
        debug!(%url, "Triggering sync");

        self.send(self.client.post(url)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(base_url: &str) -> HttpPairingStore {
        HttpPairingStore::new(StoreConfig {
            base_url: base_url.to_string(),
            token: "secret".to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn endpoints_are_appended_to_the_base_path() {
        let store = store("http://ayon.local/api/addons/kitsu/1.0.0");
        assert_eq!(
            store.endpoint(&["pairing"]).as_str(),
            "http://ayon.local/api/addons/kitsu/1.0.0/pairing"
        );
    }

    #[test]
    fn trailing_slash_in_base_is_not_doubled() {
        let store = store("http://ayon.local/api/addons/kitsu/1.0.0/");
        assert_eq!(
            store.endpoint(&["sync", "Big_Movie"]).as_str(),
            "http://ayon.local/api/addons/kitsu/1.0.0/sync/Big_Movie"
        );
    }

    #[test]
    fn project_names_are_encoded_as_one_segment() {
        let store = store("http://ayon.local/kitsu");
        assert_eq!(
            store.endpoint(&["sync", "a b/c"]).as_str(),
            "http://ayon.local/kitsu/sync/a%20b%2Fc"
        );
    }

    #[test]
    fn invalid_base_urls_are_configuration_errors() {
        for base_url in ["not a url", "mailto:ops@example.com"] {
            let err = HttpPairingStore::new(StoreConfig {
                base_url: base_url.to_string(),
                token: String::new(),
                timeout: Duration::from_secs(1),
            })
            .unwrap_err();
            assert!(
                matches!(err, PairingError::Configuration { .. }),
                "{base_url}: {err:?}"
            );
        }
    }

    #[test]
    fn detail_is_read_from_json_bodies_only() {
        assert_eq!(
            rejection_detail(br#"{"detail": "name already taken"}"#).as_deref(),
            Some("name already taken")
        );
        assert_eq!(rejection_detail(b""), None);
        assert_eq!(rejection_detail(b"<html>Bad Gateway</html>"), None);
        assert_eq!(rejection_detail(br#"{"detail": null}"#), None);
        assert_eq!(
            rejection_detail(br#"{"detail": [{"loc": ["body"], "msg": "bad"}]}"#),
            None
        );
    }
}
