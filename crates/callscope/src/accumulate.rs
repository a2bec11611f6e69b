//! Capped accumulation of rendered message text.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Appended to a snapshot whose true size exceeded the cap.
pub const TRUNCATION_MARKER: &str = "... (truncated)";

/// Collects one direction's message text up to `cap` bytes while counting
/// the full size observed.
///
/// The buffer and the size counter are updated under the same lock, so a
/// [`snapshot`](Self::snapshot) sees every append that completed before it.
/// [`size`](Self::size) reads the counter without taking the lock.
#[derive(Debug)]
pub struct BodyAccumulator {
    cap: u64,
    buffer: Mutex<String>,
    size: AtomicU64,
}

/// Retained text and true size, read together.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BodySnapshot {
    pub text: String,
    pub size: u64,
}

impl BodyAccumulator {
    pub fn new(cap: u64) -> Self {
        Self {
            cap,
            buffer: Mutex::new(String::new()),
            size: AtomicU64::new(0),
        }
    }

    pub fn cap(&self) -> u64 {
        self.cap
    }

    /// Counts `fragment` in full; retains it only while the buffer is still
    /// under the cap. The last retained fragment may overshoot the cap.
    pub fn append(&self, fragment: &str) {
        let mut buffer = self.buffer.lock();
        if (buffer.len() as u64) < self.cap {
            buffer.push_str(fragment);
        }
        self.size.fetch_add(fragment.len() as u64, Ordering::Release);
    }

    pub fn size(&self) -> u64 {
        self.size.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> BodySnapshot {
        let buffer = self.buffer.lock();
        let size = self.size.load(Ordering::Acquire);
        let text = if size > self.cap {
            let end = floor_char_boundary(&buffer, self.cap);
            let mut text = String::with_capacity(end + TRUNCATION_MARKER.len());
            text.push_str(&buffer[..end]);
            text.push_str(TRUNCATION_MARKER);
            text
        } else {
            buffer.clone()
        };
        BodySnapshot { text, size }
    }
}

fn floor_char_boundary(text: &str, cap: u64) -> usize {
    let mut end = usize::try_from(cap).unwrap_or(usize::MAX).min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn under_cap_keeps_everything() {
        let acc = BodyAccumulator::new(250_000);
        acc.append("name: \"a\"");
        acc.append("name: \"b\"");
        let snap = acc.snapshot();
        assert_eq!(snap.text, "name: \"a\"name: \"b\"");
        assert_eq!(snap.size, 18);
        assert!(!snap.text.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn exactly_at_cap_is_not_truncated() {
        let acc = BodyAccumulator::new(4);
        acc.append("abcd");
        assert_eq!(acc.snapshot().text, "abcd");
    }

    #[test]
    fn over_cap_truncates_at_snapshot() {
        let acc = BodyAccumulator::new(10);
        acc.append("0123456789abcdefghijklmno");
        let snap = acc.snapshot();
        assert_eq!(snap.size, 25);
        insta::assert_snapshot!(snap.text, @"0123456789... (truncated)");
    }

    #[test]
    fn fragments_past_the_cap_are_counted_not_kept() {
        let acc = BodyAccumulator::new(5);
        acc.append("abc");
        acc.append("defg");
        acc.append("hij");
        let snap = acc.snapshot();
        assert_eq!(snap.size, 10);
        assert_eq!(snap.text, format!("abcde{TRUNCATION_MARKER}"));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let acc = BodyAccumulator::new(4);
        acc.append("ééé");
        let snap = acc.snapshot();
        assert_eq!(snap.size, 6);
        assert_eq!(snap.text, format!("éé{TRUNCATION_MARKER}"));

        let acc = BodyAccumulator::new(3);
        acc.append("ééé");
        assert_eq!(acc.snapshot().text, format!("é{TRUNCATION_MARKER}"));
    }

    #[test]
    fn zero_cap_keeps_only_the_marker() {
        let acc = BodyAccumulator::new(0);
        assert_eq!(acc.snapshot().text, "");
        acc.append("x");
        assert_eq!(acc.snapshot().text, TRUNCATION_MARKER);
    }

    #[test]
    fn snapshot_is_idempotent() {
        let acc = BodyAccumulator::new(3);
        acc.append("abcdef");
        assert_eq!(acc.snapshot(), acc.snapshot());
    }

    #[test]
    fn concurrent_appends_are_all_counted() {
        let acc = Arc::new(BodyAccumulator::new(64));
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let acc = Arc::clone(&acc);
                std::thread::spawn(move || {
                    for _ in 0..1_000 {
                        acc.append("xy");
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().expect("worker thread");
        }
        let snap = acc.snapshot();
        assert_eq!(snap.size, 8_000);
        assert_eq!(acc.size(), 8_000);
        assert_eq!(snap.text, format!("{}{TRUNCATION_MARKER}", "xy".repeat(32)));
    }
}
