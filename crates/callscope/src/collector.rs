//! The consumer side of capture.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::TransactionHandle;

/// Receives captured records.
///
/// Called from live transport callback paths: implementations should return
/// quickly. Both methods get the same handle for a given call, and
/// `on_response_received` carries the final state.
pub trait Collector: Send + Sync {
    fn on_request_sent(&self, transaction: &TransactionHandle);

    fn on_response_received(&self, transaction: &TransactionHandle);
}

impl<C> Collector for Arc<C>
where
    C: Collector + ?Sized,
{
    fn on_request_sent(&self, transaction: &TransactionHandle) {
        (**self).on_request_sent(transaction)
    }

    fn on_response_received(&self, transaction: &TransactionHandle) {
        (**self).on_response_received(transaction)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    RequestSent,
    ResponseReceived,
}

#[derive(Clone, Debug)]
pub struct Notification {
    pub kind: NotificationKind,
    pub transaction: TransactionHandle,
}

/// Keeps every notification in arrival order. Unbounded; meant for tests and
/// short-lived demos.
#[derive(Default)]
pub struct MemoryCollector {
    notifications: Mutex<Vec<Notification>>,
}

impl MemoryCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().clone()
    }

    pub fn count(&self, kind: NotificationKind) -> usize {
        self.notifications
            .lock()
            .iter()
            .filter(|n| n.kind == kind)
            .count()
    }

    /// Distinct records in the order they were first notified.
    pub fn transactions(&self) -> Vec<TransactionHandle> {
        let notifications = self.notifications.lock();
        let mut seen: Vec<TransactionHandle> = Vec::new();
        for notification in notifications.iter() {
            if !seen.iter().any(|h| h.ptr_eq(&notification.transaction)) {
                seen.push(notification.transaction.clone());
            }
        }
        seen
    }

    pub fn clear(&self) {
        self.notifications.lock().clear();
    }

    fn push(&self, kind: NotificationKind, transaction: &TransactionHandle) {
        self.notifications.lock().push(Notification {
            kind,
            transaction: transaction.clone(),
        });
    }
}

impl Collector for MemoryCollector {
    fn on_request_sent(&self, transaction: &TransactionHandle) {
        self.push(NotificationKind::RequestSent, transaction);
    }

    fn on_response_received(&self, transaction: &TransactionHandle) {
        self.push(NotificationKind::ResponseReceived, transaction);
    }
}

/// Emits one `tracing` event per notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingCollector;

impl Collector for TracingCollector {
    fn on_request_sent(&self, transaction: &TransactionHandle) {
        transaction.read(|tx| {
            tracing::info!(
                id = %tx.id,
                method = %tx.method,
                url = %tx.url,
                request_bytes = tx.request_payload_size,
                "rpc request sent"
            );
        });
    }

    fn on_response_received(&self, transaction: &TransactionHandle) {
        transaction.read(|tx| {
            tracing::info!(
                id = %tx.id,
                method = %tx.method,
                url = %tx.url,
                code = ?tx.response_code,
                message = tx.response_message.as_deref().unwrap_or(""),
                took_ms = ?tx.took_ms,
                request_bytes = tx.request_payload_size,
                response_bytes = tx.response_payload_size,
                "rpc response received"
            );
        });
    }
}
