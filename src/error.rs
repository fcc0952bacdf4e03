use thiserror::Error;

/// Failures that abort projecting a releases page.
#[derive(Error, Debug)]
pub enum ProjectionError {
    #[error("Releases body is not a JSON array of releases: {0}")]
    Parse(
        #[from]
        #[source]
        serde_json::Error,
    ),
    #[error("Releases response was null")]
    NullResponse,
}
