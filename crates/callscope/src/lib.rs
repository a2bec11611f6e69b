//! Transparent capture of RPC client calls.
//!
//! `callscope` wraps outbound calls so that every request and response, for
//! all four call shapes (unary, client-streaming, server-streaming and
//! bidirectional), is recorded as a [`Transaction`](callscope_types::Transaction)
//! without changing what the caller observes. Each intercepted call gets its
//! own record; it is handed to a [`Collector`] once when the request is sent
//! and again, in its final state, when the call closes.
//!
//! # Using this crate
//!
//! Put a [`CaptureInterceptor`] in front of a channel:
//!
//! ```rust,ignore
//! let config = callscope::CaptureConfig::default().redact_header("authorization");
//! let interceptor = callscope::CaptureInterceptor::new(config, callscope::TracingCollector);
//! let channel = callscope::intercept(channel, interceptor);
//! // calls created through `channel` are now captured
//! ```
//!
//! Capture is observation only: messages, flow control, cancellation and the
//! terminal status reach the caller exactly as the transport produced them.
//! Faults while rendering captured values degrade to blank or best-effort
//! text, and a panicking collector is contained.
//!
//! # Cargo features
//!
//! | Feature | Effect |
//! |---------|--------|
//! | `capture` *(default)* | Calls are decorated and records are collected. |
//! | *(none)* | [`CaptureInterceptor`] passes every call straight through. |
//!
//! Without `capture`, setting `CALLSCOPE_CAPTURE` logs a warning once.

mod accumulate;
mod collector;
mod config;
pub mod contract;
mod record;
mod redact;
mod status;
mod target;

pub use self::accumulate::*;
pub use self::collector::*;
pub use self::config::*;
pub use self::contract::*;
pub use self::record::*;
pub use self::redact::*;
pub use self::status::*;
pub use self::target::*;

pub use callscope_types as types;

#[cfg(not(feature = "capture"))]
mod disabled;
#[cfg(feature = "capture")]
mod enabled;

#[cfg(not(feature = "capture"))]
pub use disabled::*;
#[cfg(feature = "capture")]
pub use enabled::*;

#[cfg(test)]
mod test_support;
