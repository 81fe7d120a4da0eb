use thiserror::Error;

/// Error types for playlist import, enrichment, and export operations.
///
/// Single-operation failures (a listing fetch, a one-off enrichment) are
/// terminal and surfaced to the caller. Batch enrichment converts per-track
/// errors into recorded failure entries and keeps iterating; only the batch
/// start guards ([`QuizlistError::AlreadyRunning`], [`QuizlistError::NothingToDo`])
/// are returned as errors from that path.
#[derive(Error, Debug)]
pub enum QuizlistError {
    /// No access token is available, or the stored token has expired.
    ///
    /// The caller is expected to send the user back through the
    /// authorization redirect; there is no silent refresh.
    #[error("not authorized: no valid access token")]
    Unauthorized,

    /// Authorization redirect handling failed.
    ///
    /// Returned when the redirect fragment is missing `access_token` or
    /// carries an unparseable `expires_in`.
    #[error("authorization failed: {0}")]
    Auth(String),

    /// A paginated listing fetch failed.
    ///
    /// `status` is `None` for transport-level failures. No partial result
    /// is ever returned alongside this error.
    #[error("listing fetch failed: {message}")]
    FetchFailed {
        /// HTTP status of the failing page, if the request got that far
        status: Option<u16>,
        /// Human-readable failure description
        message: String,
    },

    /// The completion endpoint answered with a non-success status.
    #[error("enrichment request failed with status {status}: {body}")]
    EnrichmentRequestFailed {
        /// HTTP status code returned by the endpoint
        status: u16,
        /// Raw error body as returned by the endpoint
        body: String,
    },

    /// The completion response is missing the expected message content.
    #[error("enrichment response missing expected message content")]
    EnrichmentMalformed,

    /// An imported playlist document has an invalid top-level shape.
    ///
    /// Per-song problems never produce this error; they are skipped with a
    /// warning instead.
    #[error("invalid playlist document: {0}")]
    InvalidDocument(String),

    /// A batch enrichment run was started while another is in progress.
    #[error("a batch enrichment run is already in progress")]
    AlreadyRunning,

    /// A batch enrichment run was started with an empty track list.
    #[error("no tracks to process")]
    NothingToDo,

    /// HTTP/network related errors outside of a listing fetch.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Failed to parse a payload or persisted blob.
    #[error("failed to parse: {0}")]
    Parse(String),

    /// File system I/O errors from persisted state handling.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
