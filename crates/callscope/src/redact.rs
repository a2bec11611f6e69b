//! Metadata to display-header conversion with value masking.

use std::collections::HashSet;

use callscope_types::HeaderEntry;
use tonic::metadata::{KeyRef, MetadataMap};

/// Value shown in place of a redacted header.
pub const REDACTED: &str = "**REDACTED**";

/// Suffix appended to the decoded text of a binary metadata value.
pub const BINARY_ANNOTATION: &str = " (binary)";

/// Header names whose values are masked. Names are lowercased on the way in,
/// and lookups lowercase the candidate, so matching is case-insensitive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RedactionSet {
    names: HashSet<String>,
}

impl RedactionSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|name| name.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn insert(&mut self, name: impl AsRef<str>) {
        self.names.insert(name.as_ref().to_ascii_lowercase());
    }

    pub fn contains(&self, name: &str) -> bool {
        if self.names.is_empty() {
            return false;
        }
        self.names.contains(&name.to_ascii_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}

impl<S> FromIterator<S> for RedactionSet
where
    S: AsRef<str>,
{
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::new(iter)
    }
}

/// Flattens `metadata` into display headers, one entry per value.
///
/// Keys are visited once each, in the map's own order, and every value of a
/// key is emitted in insertion order. Binary (`-bin`) values are decoded and
/// annotated; an ASCII value that is not valid visible text shows as empty.
/// Values of redacted keys are replaced by [`REDACTED`]; nothing is dropped.
pub fn redact_metadata(metadata: &MetadataMap, redact: &RedactionSet) -> Vec<HeaderEntry> {
    let mut headers = Vec::with_capacity(metadata.len());
    for key in metadata.keys() {
        match key {
            KeyRef::Ascii(key) => {
                let name = key.as_str();
                let masked = redact.contains(name);
                for value in metadata.get_all(name).iter() {
                    let display = if masked {
                        REDACTED.to_owned()
                    } else {
                        value.to_str().map(str::to_owned).unwrap_or_default()
                    };
                    headers.push(HeaderEntry::new(name, display));
                }
            }
            KeyRef::Binary(key) => {
                let name = key.as_str();
                let masked = redact.contains(name);
                for value in metadata.get_all_bin(name).iter() {
                    let display = if masked {
                        REDACTED.to_owned()
                    } else {
                        match value.to_bytes() {
                            Ok(bytes) => {
                                format!("{}{BINARY_ANNOTATION}", String::from_utf8_lossy(&bytes))
                            }
                            Err(_) => String::new(),
                        }
                    };
                    headers.push(HeaderEntry::new(name, display));
                }
            }
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::metadata::{MetadataValue, MetadataKey};

    fn sample() -> MetadataMap {
        let mut metadata = MetadataMap::new();
        metadata.insert("authorization", MetadataValue::from_static("Bearer secret"));
        metadata.append("x-trace", MetadataValue::from_static("a"));
        metadata.append("x-trace", MetadataValue::from_static("b"));
        metadata.insert("user-agent", MetadataValue::from_static("callscope-test"));
        metadata.insert_bin(
            MetadataKey::from_static("x-blob-bin"),
            MetadataValue::from_bytes(b"raw"),
        );
        metadata
    }

    fn names(headers: &[HeaderEntry]) -> Vec<&str> {
        headers.iter().map(|h| h.name.as_str()).collect()
    }

    #[test]
    fn emits_one_entry_per_value() {
        let headers = redact_metadata(&sample(), &RedactionSet::default());
        assert_eq!(headers.len(), 5);

        let traces: Vec<&str> = headers
            .iter()
            .filter(|h| h.name == "x-trace")
            .map(|h| h.value.as_str())
            .collect();
        assert_eq!(traces, vec!["a", "b"]);
    }

    #[test]
    fn redaction_is_case_insensitive_and_keeps_entries() {
        let redact = RedactionSet::new(["Authorization", "X-TRACE"]);
        let headers = redact_metadata(&sample(), &redact);

        assert_eq!(headers.len(), 5);
        for header in &headers {
            match header.name.as_str() {
                "authorization" | "x-trace" => assert_eq!(header.value, REDACTED),
                "user-agent" => assert_eq!(header.value, "callscope-test"),
                "x-blob-bin" => assert_eq!(header.value, "raw (binary)"),
                other => panic!("unexpected header {other}"),
            }
        }
        assert_eq!(
            names(&headers).iter().filter(|n| **n == "x-trace").count(),
            2
        );
    }

    #[test]
    fn binary_values_can_be_redacted() {
        let redact = RedactionSet::new(["x-blob-bin"]);
        let headers = redact_metadata(&sample(), &redact);
        let blob = headers
            .iter()
            .find(|h| h.name == "x-blob-bin")
            .expect("binary header present");
        assert_eq!(blob.value, REDACTED);
    }

    #[test]
    fn empty_metadata_yields_nothing() {
        let headers = redact_metadata(&MetadataMap::new(), &RedactionSet::new(["authorization"]));
        assert!(headers.is_empty());
    }

    #[test]
    fn redaction_set_normalizes() {
        let mut set: RedactionSet = ["Cookie"].into_iter().collect();
        set.insert("X-Api-Key");
        assert!(set.contains("cookie"));
        assert!(set.contains("COOKIE"));
        assert!(set.contains("x-api-key"));
        assert!(!set.contains("x-api"));
        assert_eq!(set.len(), 2);
    }
}
