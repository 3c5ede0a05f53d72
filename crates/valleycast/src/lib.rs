//! valleycast library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does valleycast do?
//!
//! It drives an OBS Studio instance over obs-websocket v5 on behalf of a
//! game session: it connects and authenticates, keeps a cached view of
//! whether OBS is recording, and starts, stops or restarts the recording
//! when the session asks it to.
//!
//! 1. Opens a WebSocket with the `obswebsocket.json` subprotocol and runs
//!    the Hello / Identify / Identified handshake.
//! 2. Correlates each request with its response by `requestId`, so any
//!    number of requests may be in flight.
//! 3. Applies `RecordStateChanged` events to the cached recording state
//!    and republishes every event to subscribers.
//! 4. Reconnects after a drop, up to a configured number of attempts, then
//!    tells the user.

/// Application layer: correlation, dispatch, handshake and recording use cases.
pub mod application;

/// Infrastructure layer: WebSocket transport, settings store, console bridge.
pub mod infrastructure;
