use thiserror::Error;

/// Failure to obtain a successful HTTP response.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http request failed: {0}")]
    Http(
        #[from]
        #[source]
        reqwest::Error,
    ),

    #[error("got status code {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("invalid input string: {0}")]
    InvalidInput(String),
}

/// The embedded data blob could not be located or parsed in an otherwise
/// successfully fetched page.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("embedded data marker `{0}` not found in page")]
    MarkerNotFound(&'static str),

    #[error("embedded data is not valid json: {0}")]
    Json(
        #[from]
        #[source]
        serde_json::Error,
    ),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}
