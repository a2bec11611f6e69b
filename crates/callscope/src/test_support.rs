//! Scripted transport doubles for exercising decorated calls.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tonic::metadata::{MetadataMap, MetadataValue};
use tonic::{Code, Status};

use crate::{BoxError, CallOptions, Channel, ClientCall, Listener, Message, MethodDescriptor};

/// Message whose canonical string form is exactly its text.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct Text(pub(crate) String);

impl Text {
    pub(crate) fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }
}

impl fmt::Debug for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Operation forwarded to the underlying call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum CallOp {
    Start { header_count: usize },
    Request(usize),
    Cancel(Option<String>),
    HalfClose,
    Send(String),
    Compression(bool),
}

type ListenerSlot<Resp> = Arc<Mutex<Option<Box<dyn Listener<Resp>>>>>;

/// Transport side of a [`FakeCall`]: drives the listener the call was
/// started with and exposes what the call forwarded.
pub(crate) struct Transport<Resp> {
    listener: ListenerSlot<Resp>,
    ops: Arc<Mutex<Vec<CallOp>>>,
}

impl<Resp> Clone for Transport<Resp> {
    fn clone(&self) -> Self {
        Self {
            listener: Arc::clone(&self.listener),
            ops: Arc::clone(&self.ops),
        }
    }
}

impl<Resp> Transport<Resp> {
    fn with_listener(&self, f: impl FnOnce(&mut dyn Listener<Resp>)) {
        let mut slot = self.listener.lock();
        let listener = slot.as_mut().expect("call was started");
        f(listener.as_mut());
    }

    pub(crate) fn headers(&self, headers: MetadataMap) {
        self.with_listener(|l| l.on_headers(headers));
    }

    pub(crate) fn message(&self, message: Resp) {
        self.with_listener(|l| l.on_message(message));
    }

    pub(crate) fn close(&self, status: Status, trailers: MetadataMap) {
        self.with_listener(|l| l.on_close(status, trailers));
    }

    pub(crate) fn ready(&self) {
        self.with_listener(|l| l.on_ready());
    }

    pub(crate) fn ops(&self) -> Vec<CallOp> {
        self.ops.lock().clone()
    }
}

pub(crate) struct FakeCall<Resp> {
    transport: Transport<Resp>,
    ready: bool,
}

impl<Req, Resp> ClientCall<Req, Resp> for FakeCall<Resp>
where
    Req: Message,
    Resp: Message,
{
    fn start(&mut self, listener: Box<dyn Listener<Resp>>, headers: MetadataMap) {
        self.transport.ops.lock().push(CallOp::Start {
            header_count: headers.len(),
        });
        *self.transport.listener.lock() = Some(listener);
    }

    fn request(&mut self, num_messages: usize) {
        self.transport.ops.lock().push(CallOp::Request(num_messages));
    }

    fn cancel(&mut self, message: Option<&str>, _cause: Option<BoxError>) {
        self.transport
            .ops
            .lock()
            .push(CallOp::Cancel(message.map(str::to_owned)));
    }

    fn half_close(&mut self) {
        self.transport.ops.lock().push(CallOp::HalfClose);
    }

    fn send_message(&mut self, message: Req) {
        self.transport
            .ops
            .lock()
            .push(CallOp::Send(format!("{message:?}")));
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn set_message_compression(&mut self, enabled: bool) {
        self.transport.ops.lock().push(CallOp::Compression(enabled));
    }
}

pub(crate) fn fake_call<Req, Resp>() -> (Box<dyn ClientCall<Req, Resp>>, Transport<Resp>)
where
    Req: Message,
    Resp: Message,
{
    let transport = Transport {
        listener: Arc::new(Mutex::new(None)),
        ops: Arc::new(Mutex::new(Vec::new())),
    };
    let call = FakeCall {
        transport: transport.clone(),
        ready: false,
    };
    (Box::new(call), transport)
}

/// Channel that hands out [`FakeCall`]s and keeps their transports.
pub(crate) struct FakeChannel {
    authority: Option<String>,
    created: Mutex<Vec<(String, Box<dyn Any + Send>)>>,
}

impl FakeChannel {
    pub(crate) fn new(authority: Option<&str>) -> Self {
        Self {
            authority: authority.map(str::to_owned),
            created: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn call_count(&self) -> usize {
        self.created.lock().len()
    }

    pub(crate) fn transport<Resp: Message>(&self, index: usize) -> Transport<Resp> {
        let created = self.created.lock();
        created[index]
            .1
            .downcast_ref::<Transport<Resp>>()
            .expect("transport response type")
            .clone()
    }
}

impl Channel for FakeChannel {
    fn authority(&self) -> Option<String> {
        self.authority.clone()
    }

    fn new_call<Req, Resp>(
        &self,
        method: &MethodDescriptor,
        _options: CallOptions,
    ) -> Box<dyn ClientCall<Req, Resp>>
    where
        Req: Message,
        Resp: Message,
    {
        let (call, transport) = fake_call::<Req, Resp>();
        self.created
            .lock()
            .push((method.full_method_name().to_owned(), Box::new(transport)));
        call
    }
}

/// What the caller's own listener observed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Observed {
    Headers(usize),
    Message(String),
    Close { code: Code, message: String, trailers: usize },
    Ready,
}

pub(crate) struct RecordingListener {
    events: Arc<Mutex<Vec<Observed>>>,
}

impl RecordingListener {
    pub(crate) fn new() -> (Box<Self>, Arc<Mutex<Vec<Observed>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        (
            Box::new(Self {
                events: Arc::clone(&events),
            }),
            events,
        )
    }
}

impl<Resp> Listener<Resp> for RecordingListener
where
    Resp: Message,
{
    fn on_headers(&mut self, headers: MetadataMap) {
        self.events.lock().push(Observed::Headers(headers.len()));
    }

    fn on_message(&mut self, message: Resp) {
        self.events.lock().push(Observed::Message(format!("{message:?}")));
    }

    fn on_close(&mut self, status: Status, trailers: MetadataMap) {
        self.events.lock().push(Observed::Close {
            code: status.code(),
            message: status.message().to_owned(),
            trailers: trailers.len(),
        });
    }

    fn on_ready(&mut self) {
        self.events.lock().push(Observed::Ready);
    }
}

pub(crate) fn metadata(entries: &[(&'static str, &'static str)]) -> MetadataMap {
    let mut map = MetadataMap::new();
    for (key, value) in entries {
        map.append(*key, MetadataValue::from_static(*value));
    }
    map
}
