use std::sync::Arc;

use callscope_types::{Transaction, TransactionId};
use parking_lot::Mutex;

/// Shared reference to the one [`Transaction`] of an intercepted call.
///
/// Both collector notifications for a call receive the same handle. Cloning
/// the handle keeps the record alive; it does not copy it.
#[derive(Clone)]
pub struct TransactionHandle {
    id: TransactionId,
    inner: Arc<Mutex<Transaction>>,
}

impl TransactionHandle {
    pub fn new(transaction: Transaction) -> Self {
        Self {
            id: transaction.id,
            inner: Arc::new(Mutex::new(transaction)),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn read<R>(&self, f: impl FnOnce(&Transaction) -> R) -> R {
        f(&self.inner.lock())
    }

    pub fn mutate<R>(&self, f: impl FnOnce(&mut Transaction) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Copies the record as it stands now.
    pub fn snapshot(&self) -> Transaction {
        self.inner.lock().clone()
    }

    pub fn ptr_eq(&self, other: &TransactionHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for TransactionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
