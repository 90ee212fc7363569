//! HTTP surface.
//!
//! Exposes the PuSH callback (`/youtube-webhook`) and health probes.

pub mod error;
pub mod routes;
pub mod server;

pub use server::{ApiServer, ApiServerConfig, AppState};
