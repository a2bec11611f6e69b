//! In-process transport: calls are served by a [`Greeter`] running on a tokio
//! task, so listener callbacks arrive off the caller's context, the way a
//! network transport would deliver them.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use callscope::{
    BoxError, CallOptions, Channel, ClientCall, Listener, Message, MethodDescriptor,
};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tonic::metadata::{MetadataMap, MetadataValue};
use tonic::{Code, Status};

use crate::greeter::Greeter;

pub type Payload = Box<dyn Any + Send>;

type SharedListener<Resp> = Arc<Mutex<Box<dyn Listener<Resp>>>>;

/// Channel whose calls are all served in-process by one [`Greeter`].
pub struct LoopbackChannel {
    authority: String,
    runtime: Handle,
    greeter: Arc<Greeter>,
}

impl LoopbackChannel {
    /// Must be called from within a tokio runtime.
    pub fn new(authority: impl Into<String>, greeter: Greeter) -> Self {
        Self {
            authority: authority.into(),
            runtime: Handle::current(),
            greeter: Arc::new(greeter),
        }
    }
}

impl Channel for LoopbackChannel {
    fn authority(&self) -> Option<String> {
        Some(self.authority.clone())
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
        Box::new(LoopbackCall {
            method: method.clone(),
            runtime: self.runtime.clone(),
            greeter: Arc::clone(&self.greeter),
            requests: None,
            cancel: None,
            _types: PhantomData,
        })
    }
}

struct LoopbackCall<Req, Resp> {
    method: MethodDescriptor,
    runtime: Handle,
    greeter: Arc<Greeter>,
    requests: Option<mpsc::UnboundedSender<Payload>>,
    cancel: Option<oneshot::Sender<String>>,
    _types: PhantomData<fn(Req) -> Resp>,
}

impl<Req, Resp> ClientCall<Req, Resp> for LoopbackCall<Req, Resp>
where
    Req: Message,
    Resp: Message,
{
    fn start(&mut self, listener: Box<dyn Listener<Resp>>, headers: MetadataMap) {
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = oneshot::channel();
        self.requests = Some(requests_tx);
        self.cancel = Some(cancel_tx);

        tracing::debug!(
            method = self.method.full_method_name(),
            headers = headers.len(),
            "loopback call started"
        );
        self.runtime.spawn(serve(
            Arc::clone(&self.greeter),
            self.method.clone(),
            Requests { rx: requests_rx },
            Arc::new(Mutex::new(listener)),
            cancel_rx,
        ));
    }

    fn request(&mut self, num_messages: usize) {
        tracing::trace!(num_messages, "loopback has no flow control");
    }

    fn cancel(&mut self, message: Option<&str>, cause: Option<BoxError>) {
        self.requests = None;
        if let Some(cancel) = self.cancel.take() {
            let reason = match (message, cause) {
                (Some(message), _) => message.to_owned(),
                (None, Some(cause)) => cause.to_string(),
                (None, None) => "cancelled by client".to_owned(),
            };
            let _ = cancel.send(reason);
        }
    }

    fn half_close(&mut self) {
        self.requests = None;
    }

    fn send_message(&mut self, message: Req) {
        let Some(requests) = self.requests.as_ref() else {
            tracing::warn!(
                method = self.method.full_method_name(),
                "message sent after half-close; dropped"
            );
            return;
        };
        if requests.send(Box::new(message)).is_err() {
            tracing::debug!(
                method = self.method.full_method_name(),
                "server finished before request was read"
            );
        }
    }

    fn is_ready(&self) -> bool {
        self.requests.is_some()
    }
}

async fn serve<Resp: Message>(
    greeter: Arc<Greeter>,
    method: MethodDescriptor,
    mut requests: Requests,
    listener: SharedListener<Resp>,
    mut cancel: oneshot::Receiver<String>,
) {
    let mut responses = Responder {
        listener: Arc::clone(&listener),
        headers_sent: false,
    };

    let outcome = tokio::select! {
        outcome = greeter.handle(&method, &mut requests, &mut responses) => outcome,
        Ok(reason) = &mut cancel => Err(Status::cancelled(reason)),
    };
    let status = match outcome {
        Ok(()) => Status::new(Code::Ok, ""),
        Err(status) => status,
    };

    let mut trailers = MetadataMap::new();
    trailers.insert("x-served-by", MetadataValue::from_static("callscope-loopback"));
    listener.lock().on_close(status, trailers);
}

/// Request messages as the server sees them.
pub struct Requests {
    rx: mpsc::UnboundedReceiver<Payload>,
}

impl Requests {
    /// `None` once the client half-closed.
    pub async fn next<T: Any>(&mut self) -> Result<Option<T>, Status> {
        match self.rx.recv().await {
            None => Ok(None),
            Some(payload) => payload
                .downcast::<T>()
                .map(|message| Some(*message))
                .map_err(|_| Status::internal("unexpected request message type")),
        }
    }

    pub async fn expect_one<T: Any>(&mut self) -> Result<T, Status> {
        self.next()
            .await?
            .ok_or_else(|| Status::invalid_argument("expected one request message"))
    }
}

/// Server side of the response stream. Headers go out ahead of the first
/// message; a call that closes without replying is trailers-only.
pub struct Responder<Resp> {
    listener: SharedListener<Resp>,
    headers_sent: bool,
}

impl<Resp: Message> Responder<Resp> {
    pub fn send<T: Any + Send>(&mut self, reply: T) -> Result<(), Status> {
        let payload: Payload = Box::new(reply);
        let reply = payload
            .downcast::<Resp>()
            .map_err(|_| Status::internal("unexpected response message type"))?;

        let mut listener = self.listener.lock();
        if !self.headers_sent {
            self.headers_sent = true;
            let mut headers = MetadataMap::new();
            headers.insert("content-type", MetadataValue::from_static("application/grpc"));
            headers.insert("server", MetadataValue::from_static("callscope-loopback"));
            listener.on_headers(headers);
        }
        listener.on_message(*reply);
        Ok(())
    }
}
