//! Transport layer: endpoints, connectors and the protocol session.

pub mod connector;
pub mod session;
pub mod websocket;

#[cfg(test)]
pub(crate) mod testing;

pub use connector::{Connector, Endpoint, TcpConnector};
pub use session::Session;
pub use websocket::{WsConnector, WsStream};
