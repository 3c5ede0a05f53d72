//! Persistent storage for controller settings.

pub mod config;
