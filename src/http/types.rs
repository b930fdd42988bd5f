use std::fmt;

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request issued on behalf of a session.
///
/// `name` groups samples in the statistics (`/api/influencers/[id]` rather
/// than every concrete id). The bearer token travels with the request, the
/// shared client never holds per-user state.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub name: &'static str,
    pub body: Option<Value>,
    pub bearer: Option<String>,
}

impl ApiRequest {
    #[must_use]
    pub const fn get(path: String, name: &'static str) -> Self {
        Self {
            method: HttpMethod::Get,
            path,
            name,
            body: None,
            bearer: None,
        }
    }

    #[must_use]
    pub const fn post(path: String, name: &'static str, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path,
            name,
            body: Some(body),
            bearer: None,
        }
    }

    #[must_use]
    pub fn with_bearer(mut self, token: Option<&str>) -> Self {
        self.bearer = token.map(str::to_owned);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Bytes,
}

impl ApiResponse {
    #[must_use]
    pub const fn new(status: u16, body: Bytes) -> Self {
        Self { status, body }
    }

    /// Parse the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error when the body is not valid JSON.
    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}
