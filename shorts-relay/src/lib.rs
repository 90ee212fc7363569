//! shorts-relay library crate.
//!
//! Receives PubSubHubbub pushes for YouTube channels, announces each new
//! upload on Telegram and archives it with `yt-dlp`. The registrar binary
//! (`shorts-relay-subscribe`) points the hub at this server.
//!
//! This module exposes the core functionality for integration testing.

pub mod api;
pub mod command;
pub mod config;
pub mod domain;
pub mod error;
pub mod feed;
pub mod fetcher;
pub mod logging;
pub mod notification;
pub mod relay;
pub mod store;
pub mod subscription;
pub mod test_utils;
pub mod utils;

pub use error::{Error, Result};
