//! Outbound HTTP boundary.
//!
//! Vendor adapters describe requests as plain data (`OutboundRequest`) and hand
//! them to an `HttpTransport`. Production wiring uses `ReqwestTransport`; tests
//! swap in the recording `MockTransport` and assert on what would have been sent.

pub mod reqwest_transport;
pub mod r#trait;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use r#trait::{
    Auth, HttpTransport, InboundResponse, Method, OutboundRequest, RequestBody, TransportError,
};
pub use reqwest_transport::ReqwestTransport;

#[cfg(any(test, feature = "test-util"))]
pub use mock::MockTransport;
