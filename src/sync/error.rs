use thiserror::Error;

/// Sync failure taxonomy. Each variant is contained at the smallest unit that
/// can be skipped: a record, a page, or a whole marketplace. None of them may
/// abort the scheduled tick for the remaining marketplaces.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Credential tag unrecognized or key material incomplete; the
    /// marketplace is skipped for this tick.
    #[error("unsupported credential scheme: {0}")]
    UnsupportedCredential(String),

    /// Non-2xx, transport failure or malformed body from count/fetch; skips
    /// the page (or the marketplace, when counting fails).
    #[error("remote fetch failed{}: {message}", .status.map(|s| format!(" (http {s})")).unwrap_or_default())]
    RemoteFetch {
        status: Option<u16>,
        message: String,
    },

    /// Remote record without an id; the record is dropped, the page continues.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// Best-effort image download failed; the row is still persisted.
    #[error("image mirror: {0}")]
    ImageMirror(String),

    /// One row failed to upsert; the rest of the batch continues.
    #[error("persistence: {0}")]
    Persistence(#[from] sqlx::Error),
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        SyncError::RemoteFetch {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}
