// SADIS HTTP client
//
// Wraps `reqwest::Client` with directory URL construction and status
// mapping. The directory may sit behind its own cache; this client makes
// no assumption about freshness and issues one request per lookup.

use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::models::SubscriberEntry;
use crate::transport::TransportConfig;

/// Raw HTTP client for a SADIS subscriber directory.
pub struct SadisClient {
    http: reqwest::Client,
    base_url: Url,
}

impl SadisClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the directory root, e.g. `http://sadis:8080/`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The directory base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/subscribers/{id}`, percent-encoding the id segment.
    pub(crate) fn subscriber_url(&self, id: &str) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push("subscribers")
            .push(id);
        Ok(url)
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Fetch one subscriber entry. A `404` yields `Ok(None)`.
    pub async fn subscriber(&self, id: &str) -> Result<Option<SubscriberEntry>, Error> {
        let url = self.subscriber_url(id)?;
        self.get_optional(url).await
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn get_optional<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>, Error> {
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        let status = resp.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            trace!("directory has no entry");
            return Ok(None);
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Directory {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        serde_json::from_str(&body).map(Some).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })
    }
}
