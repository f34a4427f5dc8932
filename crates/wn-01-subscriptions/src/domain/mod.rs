//! # Domain Layer
//!
//! Subscription state and the signature scheme, with no transport I/O.

pub mod connection;
pub mod entities;
pub mod errors;
pub mod registry;
pub mod signature;
pub mod tag_index;
