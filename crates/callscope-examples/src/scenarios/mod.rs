pub mod bidi;
pub mod client_stream;
pub mod failure;
pub mod server_stream;
pub mod unary;

use std::sync::Arc;
use std::time::Duration;

use callscope::types::Transaction;
use callscope::{
    CaptureConfig, CaptureInterceptor, Collector, InterceptedChannel, Listener, Message,
    MemoryCollector, TracingCollector, TransactionHandle, intercept,
};
use tokio::sync::mpsc;
use tonic::metadata::{MetadataMap, MetadataValue};
use tonic::{Code, Status};

use crate::AnyResult;
use crate::greeter::Greeter;
use crate::loopback::LoopbackChannel;

const LOOPBACK_AUTHORITY: &str = "localhost:50051";
const STREAM_PACE: Duration = Duration::from_millis(50);

/// Captured loopback channel shared by every scenario.
pub struct Harness {
    collector: Arc<MemoryCollector>,
    channel: InterceptedChannel<LoopbackChannel, CaptureInterceptor>,
}

impl Harness {
    pub fn new(config: CaptureConfig) -> Self {
        let collector = Arc::new(MemoryCollector::new());
        let interceptor = CaptureInterceptor::new(config, Fanout(Arc::clone(&collector)));
        let channel = intercept(
            LoopbackChannel::new(LOOPBACK_AUTHORITY, Greeter::new(STREAM_PACE)),
            interceptor,
        );
        Self { collector, channel }
    }

    pub fn channel(&self) -> &InterceptedChannel<LoopbackChannel, CaptureInterceptor> {
        &self.channel
    }

    /// Prints every record captured since the last report.
    pub fn report(&self, scenario: &str) -> AnyResult<()> {
        let records = self.collector.transactions();
        self.collector.clear();
        if records.is_empty() {
            return Err(format!("{scenario}: no transaction was captured"));
        }
        for record in records {
            let tx = record.snapshot();
            println!("{}", summary_line(&tx));
            println!(
                "{}",
                facet_json::to_string_pretty(&tx)
                    .map_err(|e| format!("encode transaction {}: {e}", tx.id))?
            );
        }
        Ok(())
    }
}

/// Keeps records for the report and logs each notification.
struct Fanout(Arc<MemoryCollector>);

impl Collector for Fanout {
    fn on_request_sent(&self, transaction: &TransactionHandle) {
        self.0.on_request_sent(transaction);
        TracingCollector.on_request_sent(transaction);
    }

    fn on_response_received(&self, transaction: &TransactionHandle) {
        self.0.on_response_received(transaction);
        TracingCollector.on_response_received(transaction);
    }
}

fn summary_line(tx: &Transaction) -> String {
    format!(
        "== {} {} {} -> {} ({:?}, {}ms, {}B out, {}B in)",
        tx.id,
        tx.method,
        tx.url,
        tx.response_message.as_deref().unwrap_or("<pending>"),
        tx.status(),
        tx.took_ms.unwrap_or_default(),
        tx.request_payload_size,
        tx.response_payload_size,
    )
}

/// Headers every scenario sends; `authorization` is there to show redaction.
pub fn request_headers() -> MetadataMap {
    let mut headers = MetadataMap::new();
    headers.insert("user-agent", MetadataValue::from_static("callscope-examples"));
    headers.insert(
        "authorization",
        MetadataValue::from_static("Bearer demo-token"),
    );
    headers
}

pub enum Event<Resp> {
    Message(Resp),
    Closed(Status),
}

/// Caller-side listener that hands events back to the scenario task.
pub struct ForwardingListener<Resp> {
    events: mpsc::UnboundedSender<Event<Resp>>,
}

pub fn listener<Resp: Message>()
-> (Box<ForwardingListener<Resp>>, mpsc::UnboundedReceiver<Event<Resp>>) {
    let (events, rx) = mpsc::unbounded_channel();
    (Box::new(ForwardingListener { events }), rx)
}

impl<Resp: Message> Listener<Resp> for ForwardingListener<Resp> {
    fn on_message(&mut self, message: Resp) {
        let _ = self.events.send(Event::Message(message));
    }

    fn on_close(&mut self, status: Status, _trailers: MetadataMap) {
        let _ = self.events.send(Event::Closed(status));
    }
}

/// Waits for the next reply; a close instead of a reply is an error.
pub async fn next_reply<Resp>(events: &mut mpsc::UnboundedReceiver<Event<Resp>>) -> AnyResult<Resp> {
    match events.recv().await {
        Some(Event::Message(reply)) => Ok(reply),
        Some(Event::Closed(status)) => Err(format!(
            "call closed before reply: {:?} {}",
            status.code(),
            status.message()
        )),
        None => Err("listener dropped before reply".to_owned()),
    }
}

/// Drains the remaining replies and returns them with the terminal status.
pub async fn finish<Resp>(
    events: &mut mpsc::UnboundedReceiver<Event<Resp>>,
) -> AnyResult<(Vec<Resp>, Status)> {
    let mut replies = Vec::new();
    while let Some(event) = events.recv().await {
        match event {
            Event::Message(reply) => replies.push(reply),
            Event::Closed(status) => return Ok((replies, status)),
        }
    }
    Err("listener dropped before close".to_owned())
}

pub fn expect_ok(scenario: &str, status: &Status) -> AnyResult<()> {
    if status.code() == Code::Ok {
        return Ok(());
    }
    Err(format!(
        "{scenario}: call failed with {:?}: {}",
        status.code(),
        status.message()
    ))
}
