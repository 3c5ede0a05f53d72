//! Application layer use cases for the OBS controller.
//!
//! Nothing here opens a socket. The infrastructure layer feeds inbound text
//! into [`frame_handler::FrameHandler`] and implements
//! [`recording::ObsRequester`] on top of [`correlator::RequestCorrelator`].
//!
//! - **`correlator`** – Pending-request map keyed by `requestId`.
//! - **`dispatcher`** – Applies server events to the recording cache and
//!   republishes them to subscribers.
//! - **`frame_handler`** – The Hello/Identify/Identified handshake and
//!   routing of post-handshake frames.
//! - **`notifier`** – The seam through which users are told things or asked
//!   to choose.
//! - **`recording`** – Status, start, stop-with-confirmation and restart.
//! - **`session`** – Save-loaded and day-started hooks, restart cadence.

pub mod correlator;
pub mod dispatcher;
pub mod frame_handler;
pub mod notifier;
pub mod recording;
pub mod session;
