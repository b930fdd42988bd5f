//! HTTP request/response types and the transport seam virtual users call through.
mod transport;
mod types;


pub use transport::{DEFAULT_USER_AGENT, ReqwestTransport, Transport, TransportError};
pub use types::{ApiRequest, ApiResponse, HttpMethod};
