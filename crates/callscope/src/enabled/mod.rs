pub(crate) mod call;
pub(crate) mod context;
pub(crate) mod interceptor;
pub(crate) mod listener;

pub use self::call::CapturingCall;
pub use self::context::CallPhase;
pub use self::interceptor::CaptureInterceptor;
