//! Domain state for the OBS controller.
//!
//! Nothing here touches sockets, clocks, or the async runtime. The
//! controller in the `valleycast` crate owns instances of these types and
//! drives them from its frame handler, which keeps every transition rule
//! testable without a server.

/// Handshake phases and the transitions between them.
pub mod connection;

/// Attempt counting for automatic reconnection.
pub mod reconnect;

/// Cached "is recording" value.
pub mod recording;
