use wes_core::error::CoreError;

/// Errors from resolving an indirect input reference.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The reference could not be parsed into host, port and object id.
    #[error("Malformed object reference '{uri}': {reason}")]
    MalformedReference { uri: String, reason: String },

    /// The metadata endpoint could not be reached (network, DNS, timeout).
    #[error("Object metadata endpoint {url} unreachable: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The metadata endpoint returned a non-2xx status code.
    #[error("Object metadata endpoint {url} returned {status}: {body}")]
    Api { url: String, status: u16, body: String },

    /// The metadata response body was not a valid object document.
    #[error("Invalid object metadata from {url}: {reason}")]
    InvalidMetadata { url: String, reason: String },

    #[error("Object {object_id} has no access method at index {index}")]
    MissingAccessMethod { object_id: String, index: usize },

    #[error("Access method {index} of object {object_id} has no {field}")]
    IncompleteAccessMethod {
        object_id: String,
        index: usize,
        field: &'static str,
    },
}

impl From<ResolveError> for CoreError {
    fn from(err: ResolveError) -> Self {
        CoreError::Resolution(err.to_string())
    }
}
