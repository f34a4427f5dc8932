//! # Ports Layer
//!
//! Trait definitions for the inbound API and the outbound transport.

pub mod inbound;
pub mod outbound;
