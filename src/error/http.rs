use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Invalid host URL '{url}': {source}")]
    InvalidHost {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Host URL '{url}' must use http or https.")]
    UnsupportedScheme { url: String },
    #[error("Failed to build HTTP client: {source}")]
    BuildClientFailed {
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to bind web endpoint {addr}: {source}")]
    BindWeb {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize {context}: {source}")]
    Serialize {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to write {context}: {source}")]
    Write {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}
