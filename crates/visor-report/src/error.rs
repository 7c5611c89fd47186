use thiserror::Error;

/// Failures of the report lookup and rendering collaborators.
///
/// The API maps every variant to 503; none of them say anything about the
/// credential that led to the call.
#[derive(Error, Debug)]
pub enum ReportError {
    /// The backing store could not be reached or queried.
    #[error("report store unavailable: {0}")]
    Unavailable(String),

    /// A seed file could not be read.
    #[error("failed to read report file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A seed file was not a JSON array of reports.
    #[error("invalid report data: {0}")]
    Parse(#[from] serde_json::Error),

    /// The renderer could not produce a document.
    #[error("rendering failed: {0}")]
    Render(String),
}
