//! Data model for captured RPC transactions.
//!
//! A [`Transaction`] is the structured capture of one client call: identity,
//! timing, addressing, headers and trailers, bodies, and outcome. Records are
//! filled in by the interception layer in `callscope` and handed to a
//! collector; this crate only defines their shape and encoding.

mod header;
mod primitives;
mod transaction;

pub use header::*;
pub use primitives::*;
pub use transaction::*;
