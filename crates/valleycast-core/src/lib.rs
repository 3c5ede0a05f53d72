//! # valleycast-core
//!
//! Shared library for ValleyCast containing the obs-websocket v5 frame
//! types, the JSON codec, the authentication string computation, and the
//! connection/recording domain state.
//!
//! This crate performs no I/O. It has no dependency on the async runtime or
//! on any WebSocket library, so everything in it can be tested with plain
//! `#[test]` functions.
//!
//! # Architecture overview
//!
//! ValleyCast drives OBS Studio's recording output over obs-websocket. The
//! server speaks JSON frames tagged with an opcode; the client opens the
//! socket, answers the server's Hello with an Identify (authenticated when
//! the server asks for it), then issues requests and receives events over
//! the same socket.
//!
//! - **`protocol`** – Frame schemas, the codec that turns socket text into
//!   typed [`Frame`]s and back, typed request/response pairs, and the
//!   authentication string.
//!
//! - **`domain`** – The handshake phase machine, the reconnect attempt
//!   counter, and the cached recording status.

pub mod domain;
pub mod protocol;

pub use domain::connection::{ConnectionPhase, ConnectionState, PhaseError};
pub use domain::reconnect::{ReconnectDecision, ReconnectPolicy};
pub use domain::recording::RecordingStatus;
pub use protocol::auth::compute_auth_response;
pub use protocol::codec::{decode_frame, encode_frame, CodecError, Frame};
pub use protocol::messages::ObsEvent;
