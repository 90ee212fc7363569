//! Domain layer for shorts-relay.
//!
//! Value objects shared by the webhook path and the subscription registrar.

pub mod value_objects;

pub use value_objects::*;
