use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpenDataError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid API URL \"{api_url}\": {reason}")]
    InvalidApiUrl { api_url: String, reason: String },

    #[error("page size {page_size} is outside the accepted range 1..={max}")]
    InvalidPageSize { page_size: u32, max: u32 },
}

impl OpenDataError {
    /// `true` when the server answered but the body was not a readable page.
    #[must_use]
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Deserialize { .. })
    }
}
