use thiserror::Error;

/// Top-level error type for the `olt-sadis` crate.
///
/// `olt-core` maps these into its own directory-unavailable diagnostics;
/// consumers of the provisioning core never see HTTP status codes.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Directory ───────────────────────────────────────────────────
    /// The directory answered with a non-success status other than 404.
    #[error("directory returned HTTP {status}: {message}")]
    Directory { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Whether this failure came from the network rather than the directory.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Tls(_))
    }
}
