use facet::Facet;

use crate::{
    HeaderBlobError, HeaderEntry, MethodType, TransactionId, WallTime, decode_headers,
    encode_headers,
};

/// Protocol tag stored on every record.
pub const PROTOCOL_GRPC: &str = "gRPC";

/// Content-type marker stamped on request and response sides.
pub const GRPC_CONTENT_TYPE: &str = "application/grpc";

/// Structured capture of one client call.
///
/// Addressing and identity are fixed at construction. Everything else fills
/// in as the call progresses: request headers at start, response headers on
/// arrival, and bodies, sizes, status and timing at close.
#[derive(Facet, Clone, Debug, PartialEq)]
pub struct Transaction {
    pub id: TransactionId,

    /// When interception began.
    pub request_date: WallTime,

    /// First response-headers arrival (or close, for trailers-only replies).
    pub response_date: Option<WallTime>,

    pub took_ms: Option<u64>,

    pub protocol: String,

    /// Call shape, as [`MethodType::as_str`].
    pub method: String,

    pub url: String,
    pub host: String,
    pub path: String,
    pub scheme: String,

    pub request_content_type: Option<String>,
    /// Encoded [`HeaderEntry`] list.
    pub request_headers: Option<String>,
    pub request_body: Option<String>,
    pub request_payload_size: u64,

    pub response_code: Option<i32>,
    pub response_message: Option<String>,
    pub error: Option<String>,

    pub response_content_type: Option<String>,
    /// Encoded [`HeaderEntry`] list; trailers are appended with
    /// [`crate::TRAILER_PREFIX`] names.
    pub response_headers: Option<String>,
    pub response_body: Option<String>,
    pub response_payload_size: u64,
}

/// Coarse lifecycle state derived from a record's fields.
#[derive(Facet, Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum TransactionStatus {
    Requested,
    Complete,
    Failed,
}

/// Addressing derived from the channel target and the method name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub path: String,
    pub url: String,
    pub scheme: String,
}

impl Transaction {
    /// Opens a fresh record stamped with the current time.
    pub fn new(method: MethodType, target: Target) -> Self {
        Self {
            id: TransactionId::next(),
            request_date: WallTime::now(),
            response_date: None,
            took_ms: None,
            protocol: PROTOCOL_GRPC.to_owned(),
            method: method.as_str().to_owned(),
            url: target.url,
            host: target.host,
            path: target.path,
            scheme: target.scheme,
            request_content_type: None,
            request_headers: None,
            request_body: None,
            request_payload_size: 0,
            response_code: None,
            response_message: None,
            error: None,
            response_content_type: None,
            response_headers: None,
            response_body: None,
            response_payload_size: 0,
        }
    }

    pub fn set_request_headers(&mut self, headers: &[HeaderEntry]) -> Result<(), HeaderBlobError> {
        self.request_headers = Some(encode_headers(headers)?);
        Ok(())
    }

    pub fn set_response_headers(&mut self, headers: &[HeaderEntry]) -> Result<(), HeaderBlobError> {
        self.response_headers = Some(encode_headers(headers)?);
        Ok(())
    }

    /// Appends trailers to the response-header blob, each renamed with the
    /// trailer prefix. An empty list leaves the blob untouched.
    pub fn append_response_trailers(
        &mut self,
        trailers: &[HeaderEntry],
    ) -> Result<(), HeaderBlobError> {
        if trailers.is_empty() {
            return Ok(());
        }
        let mut all = self.parsed_response_headers();
        all.extend(trailers.iter().cloned().map(HeaderEntry::into_trailer));
        self.response_headers = Some(encode_headers(&all)?);
        Ok(())
    }

    pub fn parsed_request_headers(&self) -> Vec<HeaderEntry> {
        self.request_headers
            .as_deref()
            .map(decode_headers)
            .unwrap_or_default()
    }

    pub fn parsed_response_headers(&self) -> Vec<HeaderEntry> {
        self.response_headers
            .as_deref()
            .map(decode_headers)
            .unwrap_or_default()
    }

    pub fn status(&self) -> TransactionStatus {
        match self.response_code {
            None => TransactionStatus::Requested,
            Some(0) if self.error.is_none() => TransactionStatus::Complete,
            Some(_) => TransactionStatus::Failed,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.response_code.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> Target {
        Target {
            host: "localhost".into(),
            path: "/greeter.Greeter/SayHello".into(),
            url: "http://localhost:50051/greeter.Greeter/SayHello".into(),
            scheme: "http".into(),
        }
    }

    #[test]
    fn new_record_is_open() {
        let tx = Transaction::new(MethodType::Unary, target());
        assert_eq!(tx.method, "UNARY");
        assert_eq!(tx.protocol, "gRPC");
        assert_eq!(tx.status(), TransactionStatus::Requested);
        assert!(!tx.is_closed());
        assert!(tx.parsed_request_headers().is_empty());
    }

    #[test]
    fn trailers_follow_headers() {
        let mut tx = Transaction::new(MethodType::Unary, target());
        tx.set_response_headers(&[HeaderEntry::new("content-type", "application/grpc")])
            .expect("headers encode");
        tx.append_response_trailers(&[HeaderEntry::new("grpc-status", "0")])
            .expect("trailers encode");

        assert_eq!(
            tx.parsed_response_headers(),
            vec![
                HeaderEntry::new("content-type", "application/grpc"),
                HeaderEntry::new("(Trailer) grpc-status", "0"),
            ]
        );
    }

    #[test]
    fn trailers_without_headers_start_a_blob() {
        let mut tx = Transaction::new(MethodType::Unary, target());
        tx.append_response_trailers(&[HeaderEntry::new("x-t", "v")])
            .expect("trailers encode");
        assert_eq!(
            tx.parsed_response_headers(),
            vec![HeaderEntry::new("(Trailer) x-t", "v")]
        );

        let before = tx.response_headers.clone();
        tx.append_response_trailers(&[]).expect("no-op");
        assert_eq!(tx.response_headers, before);
    }

    #[test]
    fn status_follows_code_and_error() {
        let mut tx = Transaction::new(MethodType::Unary, target());
        tx.response_code = Some(0);
        assert_eq!(tx.status(), TransactionStatus::Complete);
        tx.error = Some("boom".into());
        assert_eq!(tx.status(), TransactionStatus::Failed);
        tx.error = None;
        tx.response_code = Some(14);
        assert_eq!(tx.status(), TransactionStatus::Failed);
    }
}
