//! Theatre - Resumable streaming playback controller
//!
//! This library crate exposes the playback controller, its backend client and
//! configuration for the CLI and for integration testing.

pub mod backend;
pub mod config;
pub mod headless;
pub mod player;
