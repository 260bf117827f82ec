//! Infrastructure layer: outbound HTTP to external services and vendor-body helpers.

pub mod http;
pub mod json;

pub use http::{
    Auth, HttpTransport, InboundResponse, Method, OutboundRequest, RequestBody, ReqwestTransport,
    TransportError,
};
pub use json::{
    DETAILS_LIMIT, MalformedBody, as_sequence, first_element, parse_body, scalar_string,
    truncate_chars, without_keys,
};
