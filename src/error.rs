use thiserror::Error;

/// Everything that can go wrong between fetching a document and looking a record up in it.
///
/// Document-level and record-level decode failures are separate variants so callers can tell a
/// feed that is broken as a whole from one bad entry inside it.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("malformed document: {0}")]
    MalformedDocument(String),

    #[error("malformed record #{position} ({id}): {reason}")]
    MalformedRecord {
        /// Zero-based position of the record in the document
        position: usize,
        /// Registry id of the record, or `?` when the id itself is missing
        id: String,
        reason: String,
    },

    #[error("no record for key `{0}`")]
    KeyNotFound(String),
}

impl Error {
    pub(crate) fn document(reason: impl Into<String>) -> Self {
        Error::MalformedDocument(reason.into())
    }

    pub(crate) fn record(position: usize, id: Option<&str>, reason: impl Into<String>) -> Self {
        Error::MalformedRecord {
            position,
            id: id.unwrap_or("?").to_string(),
            reason: reason.into(),
        }
    }
}

/// Failure of a fetch collaborator. Never retried by this crate.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failure while accessing {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("unusable archive {url}: {reason}")]
    Archive { url: String, reason: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub(crate) fn from_ureq(url: &str, err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(status) => FetchError::Status {
                url: url.to_string(),
                status,
            },
            other => FetchError::Transport {
                url: url.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
