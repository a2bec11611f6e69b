use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};

use callscope_types::{GRPC_CONTENT_TYPE, WallTime};
use tonic::Status;
use tonic::metadata::MetadataMap;

use super::interceptor::CaptureSettings;
use crate::{
    BodyAccumulator, Message, NotificationKind, StatusSummary, TransactionHandle, redact_metadata,
};

/// Progress of one call. Only ever moves forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum CallPhase {
    Created = 0,
    HeadersSent = 1,
    Exchanging = 2,
    Closed = 3,
}

impl CallPhase {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Created,
            1 => Self::HeadersSent,
            2 => Self::Exchanging,
            _ => Self::Closed,
        }
    }
}

/// State shared by the call decorator (outgoing side) and the listener
/// decorator (incoming side) of one intercepted call.
///
/// The size counters, the message counter, the phase and the one-shot
/// `request_sent` flag are atomics; record fields each have a single writer
/// and go through the handle's lock.
pub(crate) struct CallContext {
    record: TransactionHandle,
    request_body: BodyAccumulator,
    response_body: BodyAccumulator,
    messages_sent: AtomicU64,
    request_sent: AtomicBool,
    phase: AtomicU8,
    settings: Arc<CaptureSettings>,
}

impl CallContext {
    pub(crate) fn new(record: TransactionHandle, settings: Arc<CaptureSettings>) -> Self {
        let cap = settings.config.max_content_length;
        Self {
            record,
            request_body: BodyAccumulator::new(cap),
            response_body: BodyAccumulator::new(cap),
            messages_sent: AtomicU64::new(0),
            request_sent: AtomicBool::new(false),
            phase: AtomicU8::new(CallPhase::Created as u8),
            settings,
        }
    }

    pub(crate) fn record(&self) -> &TransactionHandle {
        &self.record
    }

    pub(crate) fn phase(&self) -> CallPhase {
        CallPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.phase() == CallPhase::Closed
    }

    fn advance(&self, to: CallPhase) {
        self.phase.fetch_max(to as u8, Ordering::AcqRel);
    }

    pub(crate) fn capture_request_headers(&self, headers: &MetadataMap) {
        let entries = redact_metadata(headers, &self.settings.config.redact_headers);
        self.record.mutate(|tx| {
            if let Err(err) = tx.set_request_headers(&entries) {
                tracing::warn!(id = %tx.id, %err, "dropping request headers");
            }
        });
        self.advance(CallPhase::HeadersSent);
    }

    pub(crate) fn record_outgoing<Req: Message>(&self, message: &Req) {
        let rendered = render_message(message);
        self.request_body.append(&rendered);
        self.advance(CallPhase::Exchanging);

        let first = self.messages_sent.fetch_add(1, Ordering::AcqRel) == 0;
        tracing::trace!(
            id = %self.record.id(),
            bytes = rendered.len(),
            first,
            "captured outgoing message"
        );

        if first && !self.is_closed() {
            self.record.mutate(|tx| {
                tx.request_content_type = Some(GRPC_CONTENT_TYPE.to_owned());
            });
        }

        if !self.request_sent.swap(true, Ordering::AcqRel) {
            let body = self.request_body.snapshot();
            self.record.mutate(|tx| {
                if !tx.is_closed() {
                    tx.request_body = Some(body.text);
                    tx.request_payload_size = body.size;
                }
            });
            self.notify(NotificationKind::RequestSent);
        }
    }

    pub(crate) fn capture_response_headers(&self, headers: &MetadataMap) {
        if self.is_closed() {
            return;
        }
        let entries = redact_metadata(headers, &self.settings.config.redact_headers);
        let now = WallTime::now();
        self.record.mutate(|tx| {
            tx.response_date.get_or_insert(now);
            tx.response_content_type = Some(GRPC_CONTENT_TYPE.to_owned());
            if let Err(err) = tx.set_response_headers(&entries) {
                tracing::warn!(id = %tx.id, %err, "dropping response headers");
            }
        });
    }

    pub(crate) fn record_incoming<Resp: Message>(&self, message: &Resp) {
        if self.is_closed() {
            return;
        }
        let rendered = render_message(message);
        self.response_body.append(&rendered);
        self.advance(CallPhase::Exchanging);
        tracing::trace!(
            id = %self.record.id(),
            bytes = rendered.len(),
            "captured incoming message"
        );
    }

    /// Completes the record from the terminal status and trailers, then
    /// notifies. Returns `false` when the call had already been finalized.
    pub(crate) fn finalize(&self, status: &Status, trailers: &MetadataMap) -> bool {
        let previous = self.phase.swap(CallPhase::Closed as u8, Ordering::AcqRel);
        if previous == CallPhase::Closed as u8 {
            tracing::debug!(id = %self.record.id(), "ignoring close after close");
            return false;
        }

        let summary = StatusSummary::from_status(status);
        let trailers = redact_metadata(trailers, &self.settings.config.redact_headers);
        let request = self.request_body.snapshot();
        let response = self.response_body.snapshot();
        let now = WallTime::now();

        self.record.mutate(|tx| {
            tx.response_code = Some(summary.code);
            tx.response_message = Some(summary.message);
            if let Some(error) = summary.error {
                tx.error = Some(error);
            }
            if let Err(err) = tx.append_response_trailers(&trailers) {
                tracing::warn!(id = %tx.id, %err, "dropping response trailers");
            }
            tx.response_date.get_or_insert(now);
            tx.took_ms = Some(now.millis_since(tx.request_date));
            tx.request_body = Some(request.text);
            tx.request_payload_size = request.size;
            tx.response_body = Some(response.text);
            tx.response_payload_size = response.size;

            tracing::debug!(
                id = %tx.id,
                method = %tx.method,
                path = %tx.path,
                code = summary.code,
                took_ms = ?tx.took_ms,
                "finalized transaction"
            );
        });

        if !self.request_sent.swap(true, Ordering::AcqRel) {
            self.notify(NotificationKind::RequestSent);
        }
        self.notify(NotificationKind::ResponseReceived);
        true
    }

    fn notify(&self, kind: NotificationKind) {
        let Some(collector) = self.settings.collector.as_ref() else {
            return;
        };
        let outcome = catch_unwind(AssertUnwindSafe(|| match kind {
            NotificationKind::RequestSent => collector.on_request_sent(&self.record),
            NotificationKind::ResponseReceived => collector.on_response_received(&self.record),
        }));
        if outcome.is_err() {
            tracing::warn!(id = %self.record.id(), ?kind, "collector panicked; notification dropped");
        }
    }
}

fn render_message<T: Message>(message: &T) -> String {
    format!("{message:?}")
}
