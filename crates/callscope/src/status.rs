use std::error::Error;

use tonic::{Code, Status};

/// Canonical upper-snake name of a status code.
pub fn code_name(code: Code) -> &'static str {
    match code {
        Code::Ok => "OK",
        Code::Cancelled => "CANCELLED",
        Code::Unknown => "UNKNOWN",
        Code::InvalidArgument => "INVALID_ARGUMENT",
        Code::DeadlineExceeded => "DEADLINE_EXCEEDED",
        Code::NotFound => "NOT_FOUND",
        Code::AlreadyExists => "ALREADY_EXISTS",
        Code::PermissionDenied => "PERMISSION_DENIED",
        Code::ResourceExhausted => "RESOURCE_EXHAUSTED",
        Code::FailedPrecondition => "FAILED_PRECONDITION",
        Code::Aborted => "ABORTED",
        Code::OutOfRange => "OUT_OF_RANGE",
        Code::Unimplemented => "UNIMPLEMENTED",
        Code::Internal => "INTERNAL",
        Code::Unavailable => "UNAVAILABLE",
        Code::DataLoss => "DATA_LOSS",
        Code::Unauthenticated => "UNAUTHENTICATED",
    }
}

/// Terminal status reduced to the record's code, message and error fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusSummary {
    pub code: i32,
    /// Code name, then ` (description)` when the status has one.
    pub message: String,
    /// Display text of the attached cause, if any.
    pub error: Option<String>,
}

impl StatusSummary {
    pub fn from_status(status: &Status) -> Self {
        let name = code_name(status.code());
        let message = if status.message().is_empty() {
            name.to_owned()
        } else {
            format!("{name} ({})", status.message())
        };
        Self {
            code: status.code() as i32,
            message,
            error: status.source().map(|cause| cause.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Refused;

    impl std::fmt::Display for Refused {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("connection refused")
        }
    }

    impl Error for Refused {}

    #[test]
    fn ok_without_description() {
        let summary = StatusSummary::from_status(&Status::new(Code::Ok, ""));
        assert_eq!(summary.code, 0);
        assert_eq!(summary.message, "OK");
        assert_eq!(summary.error, None);
    }

    #[test]
    fn failure_with_description_and_cause() {
        let mut status = Status::unavailable("backend down");
        status.set_source(Arc::new(Refused));
        let summary = StatusSummary::from_status(&status);
        assert_eq!(summary.code, 14);
        assert_eq!(summary.message, "UNAVAILABLE (backend down)");
        assert_eq!(summary.error.as_deref(), Some("connection refused"));
    }
}
