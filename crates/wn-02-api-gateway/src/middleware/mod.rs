//! Middleware stack for the publish API.
//!
//! Layer order: Request → Auth → BodyLimit → Handler
//!
//! Both layers are applied as route layers, so unknown paths answer 404
//! without an auth check and `/health` stays open.

pub mod auth;
pub mod validation;

pub use auth::{constant_time_compare, ApiSecretLayer, AUTH_HEADER};
pub use validation::{read_body_with_limit, BodyLimitLayer};
