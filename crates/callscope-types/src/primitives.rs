use facet::Facet;
use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Opaque transaction identifier, unique within a process.
#[derive(Facet, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[facet(transparent)]
pub struct TransactionId(pub(crate) u64);

impl TransactionId {
    /// Allocates the next identifier.
    ///
    /// Bits 47..62 carry a per-process prefix so ids from different
    /// processes rarely collide when records are merged into one store.
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);

        let counter = COUNTER.fetch_add(1, Ordering::Relaxed) & 0x0000_7FFF_FFFF_FFFF;
        Self(((process_prefix_u16() as u64 & 0x7FFF) << 47) | counter)
    }

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TX#{:x}", self.0)
    }
}

fn process_prefix_u16() -> u16 {
    static PROCESS_PREFIX: OnceLock<u16> = OnceLock::new();
    *PROCESS_PREFIX.get_or_init(|| {
        let pid = std::process::id() as u64;
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        ((seed ^ pid) & 0xFFFF) as u16
    })
}

/// Wall-clock instant, in milliseconds since the unix epoch.
#[derive(Facet, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[facet(transparent)]
pub struct WallTime(u64);

impl WallTime {
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis().min(u64::MAX as u128) as u64)
            .unwrap_or(0);
        Self(millis)
    }

    pub fn from_unix_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub fn as_unix_millis(&self) -> u64 {
        self.0
    }

    /// Milliseconds from `earlier` to `self`, saturating at zero when the
    /// clock stepped backwards.
    pub fn millis_since(&self, earlier: WallTime) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// Message-multiplicity shape of a call.
#[derive(Facet, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum MethodType {
    Unary,
    ClientStreaming,
    ServerStreaming,
    BidiStreaming,
    Unknown,
}

impl MethodType {
    /// Canonical upper-case name, stored as the record's `method`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unary => "UNARY",
            Self::ClientStreaming => "CLIENT_STREAMING",
            Self::ServerStreaming => "SERVER_STREAMING",
            Self::BidiStreaming => "BIDI_STREAMING",
            Self::Unknown => "UNKNOWN",
        }
    }

    pub fn client_sends_one(self) -> bool {
        matches!(self, Self::Unary | Self::ServerStreaming)
    }

    pub fn server_sends_one(self) -> bool {
        matches!(self, Self::Unary | Self::ClientStreaming)
    }
}

impl fmt::Display for MethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_ids_are_distinct() {
        let a = TransactionId::next();
        let b = TransactionId::next();
        assert_ne!(a, b);
        assert_eq!(a.get() >> 63, 0, "ids stay within the positive i64 range");
    }

    #[test]
    fn millis_since_saturates() {
        let early = WallTime::from_unix_millis(1_000);
        let late = WallTime::from_unix_millis(1_250);
        assert_eq!(late.millis_since(early), 250);
        assert_eq!(early.millis_since(late), 0);
    }

    #[test]
    fn method_type_names() {
        assert_eq!(MethodType::BidiStreaming.to_string(), "BIDI_STREAMING");
        assert!(MethodType::ServerStreaming.client_sends_one());
        assert!(!MethodType::ServerStreaming.server_sends_one());
    }
}
