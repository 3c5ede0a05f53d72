//! Protocol module containing obs-websocket frame types, the JSON codec,
//! and the authentication string computation.

pub mod auth;
pub mod codec;
pub mod messages;
pub mod request_id;
pub mod requests;

pub use auth::compute_auth_response;
pub use codec::{decode_frame, encode_frame, CodecError, Frame};
pub use messages::*;
pub use request_id::new_request_id;
