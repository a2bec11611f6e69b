//! The client-call surface that interception wraps.
//!
//! These traits describe the standard RPC client contract: a [`Channel`]
//! creates [`ClientCall`]s, a call is started with a response [`Listener`],
//! and the transport drives the listener from its own execution context.
//! Metadata and terminal status use `tonic`'s types so captured values match
//! what a tonic-based stack puts on the wire.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub use callscope_types::MethodType;
pub use tonic::Status;
pub use tonic::metadata::MetadataMap;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Anything that can travel over a call. The canonical string form of a
/// message is its `Debug` rendering.
pub trait Message: fmt::Debug + Send + 'static {}

impl<T> Message for T where T: fmt::Debug + Send + 'static {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDescriptor {
    full_method_name: String,
    method_type: MethodType,
}

impl MethodDescriptor {
    /// `full_method_name` is `package.Service/Method`.
    pub fn new(full_method_name: impl Into<String>, method_type: MethodType) -> Self {
        Self {
            full_method_name: full_method_name.into(),
            method_type,
        }
    }

    pub fn full_method_name(&self) -> &str {
        &self.full_method_name
    }

    pub fn method_type(&self) -> MethodType {
        self.method_type
    }

    pub fn service_name(&self) -> &str {
        split_method_parts(&self.full_method_name).0
    }

    pub fn bare_method_name(&self) -> &str {
        split_method_parts(&self.full_method_name).1
    }
}

fn split_method_parts(full_method: &str) -> (&str, &str) {
    if let Some((service, method)) = full_method.rsplit_once('/') {
        (service, method)
    } else {
        ("", full_method)
    }
}

/// Per-call options. Opaque to interception and forwarded unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallOptions {
    pub deadline: Option<Duration>,
    pub authority: Option<String>,
    pub compression: Option<String>,
}

/// Receives inbound events for one call. The transport delivers them in
/// order, one at a time, and fires `on_close` exactly once.
pub trait Listener<Resp>: Send {
    fn on_headers(&mut self, _headers: MetadataMap) {}

    fn on_message(&mut self, _message: Resp) {}

    fn on_close(&mut self, status: Status, trailers: MetadataMap);

    fn on_ready(&mut self) {}
}

impl<Resp, L> Listener<Resp> for Box<L>
where
    L: Listener<Resp> + ?Sized,
{
    fn on_headers(&mut self, headers: MetadataMap) {
        (**self).on_headers(headers)
    }

    fn on_message(&mut self, message: Resp) {
        (**self).on_message(message)
    }

    fn on_close(&mut self, status: Status, trailers: MetadataMap) {
        (**self).on_close(status, trailers)
    }

    fn on_ready(&mut self) {
        (**self).on_ready()
    }
}

/// Outbound half of one call.
pub trait ClientCall<Req, Resp>: Send {
    fn start(&mut self, listener: Box<dyn Listener<Resp>>, headers: MetadataMap);

    /// Asks the transport for up to `num_messages` more inbound messages.
    fn request(&mut self, num_messages: usize);

    fn cancel(&mut self, message: Option<&str>, cause: Option<BoxError>);

    fn half_close(&mut self);

    fn send_message(&mut self, message: Req);

    fn is_ready(&self) -> bool {
        true
    }

    fn set_message_compression(&mut self, _enabled: bool) {}
}

pub trait Channel: Send + Sync {
    /// `host[:port]` the channel talks to, when known.
    fn authority(&self) -> Option<String>;

    fn new_call<Req, Resp>(
        &self,
        method: &MethodDescriptor,
        options: CallOptions,
    ) -> Box<dyn ClientCall<Req, Resp>>
    where
        Req: Message,
        Resp: Message;
}

impl<C> Channel for Arc<C>
where
    C: Channel,
{
    fn authority(&self) -> Option<String> {
        (**self).authority()
    }

    fn new_call<Req, Resp>(
        &self,
        method: &MethodDescriptor,
        options: CallOptions,
    ) -> Box<dyn ClientCall<Req, Resp>>
    where
        Req: Message,
        Resp: Message,
    {
        (**self).new_call(method, options)
    }
}

pub trait ClientInterceptor: Send + Sync {
    fn intercept_call<Req, Resp, C>(
        &self,
        method: &MethodDescriptor,
        options: CallOptions,
        next: &C,
    ) -> Box<dyn ClientCall<Req, Resp>>
    where
        Req: Message,
        Resp: Message,
        C: Channel;
}

/// A channel whose calls all pass through `interceptor` first.
pub struct InterceptedChannel<C, I> {
    channel: C,
    interceptor: I,
}

/// Installs `interceptor` in front of `channel`.
pub fn intercept<C, I>(channel: C, interceptor: I) -> InterceptedChannel<C, I>
where
    C: Channel,
    I: ClientInterceptor,
{
    InterceptedChannel {
        channel,
        interceptor,
    }
}

impl<C, I> InterceptedChannel<C, I> {
    pub fn inner(&self) -> &C {
        &self.channel
    }

    pub fn interceptor(&self) -> &I {
        &self.interceptor
    }
}

impl<C, I> Channel for InterceptedChannel<C, I>
where
    C: Channel,
    I: ClientInterceptor,
{
    fn authority(&self) -> Option<String> {
        self.channel.authority()
    }

    fn new_call<Req, Resp>(
        &self,
        method: &MethodDescriptor,
        options: CallOptions,
    ) -> Box<dyn ClientCall<Req, Resp>>
    where
        Req: Message,
        Resp: Message,
    {
        self.interceptor
            .intercept_call(method, options, &self.channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parts_split_at_last_slash() {
        let method = MethodDescriptor::new("greeter.Greeter/SayHello", MethodType::Unary);
        assert_eq!(method.service_name(), "greeter.Greeter");
        assert_eq!(method.bare_method_name(), "SayHello");

        let bare = MethodDescriptor::new("Ping", MethodType::Unknown);
        assert_eq!(bare.service_name(), "");
        assert_eq!(bare.bare_method_name(), "Ping");
    }
}
