use std::sync::Arc;

use tonic::metadata::MetadataMap;

use super::context::{CallContext, CallPhase};
use super::listener::CapturingListener;
use crate::{BoxError, ClientCall, Listener, Message, TransactionHandle};

/// Call decorator: records request headers and outgoing messages, then
/// forwards every operation to the wrapped call unchanged.
pub struct CapturingCall<Req, Resp> {
    inner: Box<dyn ClientCall<Req, Resp>>,
    context: Arc<CallContext>,
}

impl<Req, Resp> CapturingCall<Req, Resp> {
    pub(crate) fn new(inner: Box<dyn ClientCall<Req, Resp>>, context: Arc<CallContext>) -> Self {
        Self { inner, context }
    }

    /// The record this call is filling in.
    pub fn transaction(&self) -> &TransactionHandle {
        self.context.record()
    }

    pub fn phase(&self) -> CallPhase {
        self.context.phase()
    }
}

impl<Req, Resp> ClientCall<Req, Resp> for CapturingCall<Req, Resp>
where
    Req: Message,
    Resp: Message,
{
    fn start(&mut self, listener: Box<dyn Listener<Resp>>, headers: MetadataMap) {
        self.context.capture_request_headers(&headers);
        let listener = CapturingListener::new(listener, Arc::clone(&self.context));
        self.inner.start(Box::new(listener), headers);
    }

    fn request(&mut self, num_messages: usize) {
        self.inner.request(num_messages);
    }

    fn cancel(&mut self, message: Option<&str>, cause: Option<BoxError>) {
        self.inner.cancel(message, cause);
    }

    fn half_close(&mut self) {
        self.inner.half_close();
    }

    fn send_message(&mut self, message: Req) {
        self.context.record_outgoing(&message);
        self.inner.send_message(message);
    }

    fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }

    fn set_message_compression(&mut self, enabled: bool) {
        self.inner.set_message_compression(enabled);
    }
}
