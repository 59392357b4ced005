//! The wire client (C1): a NUL-framed request/response channel to the
//! system under test, over either a Unix-domain or TCP loopback socket.

mod client;
mod transport;

pub use client::WireClient;
pub use transport::WireTransport;
