use std::sync::Arc;

use tonic::Status;
use tonic::metadata::MetadataMap;

use super::context::CallContext;
use crate::{Listener, Message};

/// Listener decorator: records response headers, incoming messages and the
/// terminal status, then hands each event to the caller's listener as is.
pub(crate) struct CapturingListener<Resp> {
    inner: Box<dyn Listener<Resp>>,
    context: Arc<CallContext>,
}

impl<Resp> CapturingListener<Resp> {
    pub(crate) fn new(inner: Box<dyn Listener<Resp>>, context: Arc<CallContext>) -> Self {
        Self { inner, context }
    }
}

impl<Resp> Listener<Resp> for CapturingListener<Resp>
where
    Resp: Message,
{
    fn on_headers(&mut self, headers: MetadataMap) {
        self.context.capture_response_headers(&headers);
        self.inner.on_headers(headers);
    }

    fn on_message(&mut self, message: Resp) {
        self.context.record_incoming(&message);
        self.inner.on_message(message);
    }

    fn on_close(&mut self, status: Status, trailers: MetadataMap) {
        self.context.finalize(&status, &trailers);
        self.inner.on_close(status, trailers);
    }

    fn on_ready(&mut self) {
        self.inner.on_ready();
    }
}
