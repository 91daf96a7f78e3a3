//! SecurePay XML API: documents, timestamps, transport and response handling.

pub mod client;
pub mod request;
pub mod response;
pub mod timestamp;
pub mod xml;

pub use client::{GatewayResponse, HttpTransport, Transport, TransportError};
pub use request::{BuildError, MessageInfo, RequestBuilder};
pub use response::{GatewayStatus, InterpretError, TxnOutcome};
pub use xml::Element;
