use facet::Facet;

/// Prefix that marks a trailer entry inside the response-header blob.
pub const TRAILER_PREFIX: &str = "(Trailer) ";

/// One metadata entry as shown to a reader: `name` is the wire key, `value`
/// is the display value (possibly redacted or annotated as binary).
#[derive(Facet, Clone, Debug, PartialEq, Eq)]
pub struct HeaderEntry {
    pub name: String,
    pub value: String,
}

impl HeaderEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Returns this entry renamed as a trailer.
    pub fn into_trailer(self) -> Self {
        Self {
            name: format!("{TRAILER_PREFIX}{}", self.name),
            value: self.value,
        }
    }

    pub fn is_trailer(&self) -> bool {
        self.name.starts_with(TRAILER_PREFIX)
    }
}

/// Error produced when a header list cannot be turned into its blob form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderBlobError(pub String);

impl std::fmt::Display for HeaderBlobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "encode header blob: {}", self.0)
    }
}

impl std::error::Error for HeaderBlobError {}

/// Encodes an ordered header list as the JSON blob stored on a record.
pub fn encode_headers(headers: &[HeaderEntry]) -> Result<String, HeaderBlobError> {
    facet_json::to_string(&headers.to_vec()).map_err(|e| HeaderBlobError(e.to_string()))
}

/// Decodes a header blob. Anything unparsable decodes to an empty list.
pub fn decode_headers(blob: &str) -> Vec<HeaderEntry> {
    if blob.trim().is_empty() {
        return Vec::new();
    }
    facet_json::from_str::<Vec<HeaderEntry>>(blob).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_preserves_order_and_duplicates() {
        let headers = vec![
            HeaderEntry::new("x-b", "2"),
            HeaderEntry::new("x-a", "1"),
            HeaderEntry::new("x-a", "1"),
        ];
        let blob = encode_headers(&headers).expect("header list encodes");
        assert_eq!(decode_headers(&blob), headers);
    }

    #[test]
    fn garbage_blob_decodes_empty() {
        assert!(decode_headers("not json").is_empty());
        assert!(decode_headers("").is_empty());
    }

    #[test]
    fn trailer_rename() {
        let trailer = HeaderEntry::new("grpc-status", "0").into_trailer();
        assert_eq!(trailer.name, "(Trailer) grpc-status");
        assert!(trailer.is_trailer());
        assert!(!HeaderEntry::new("grpc-status", "0").is_trailer());
    }
}
