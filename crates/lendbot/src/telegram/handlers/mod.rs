//! Telegram handler tree configuration
//!
//! The dispatcher schema only converts updates into `Inbound` values and
//! hands them to the router, so tests can drive the router directly with
//! the same dependencies.

mod schema;
mod types;

pub use schema::schema;
pub use types::{HandlerDeps, HandlerError};
