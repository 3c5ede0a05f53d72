//! Infrastructure layer for the OBS controller.
//!
//! Contains the I/O-facing adapters: the WebSocket connection, the settings
//! file and the console bridge.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `valleycast_core`, but MUST NOT be imported by the `application` or
//! domain layers.
//!
//! # Sub-modules
//!
//! - **`network`** – `ObsController`: opens the socket, runs the read loop,
//!   issues requests, and reconnects when the connection drops.
//!
//! - **`storage`** – TOML settings at the platform config directory.
//!
//! - **`ui_bridge`** – Console implementation of `Notifier` and the status
//!   DTOs printed by the CLI.

pub mod network;
pub mod storage;
pub mod ui_bridge;
