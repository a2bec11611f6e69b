use std::sync::{Arc, Once};

use crate::{
    CallOptions, CaptureConfig, Channel, ClientCall, ClientInterceptor, Collector, Message,
    MethodDescriptor,
};

/// Set to ask for capture in a build where it is compiled out.
pub const CAPTURE_ENV: &str = "CALLSCOPE_CAPTURE";

static CAPTURE_DISABLED_WARNING_ONCE: Once = Once::new();

fn emit_capture_disabled_warning_once() {
    let Some(value) = std::env::var_os(CAPTURE_ENV) else {
        return;
    };
    if value.to_string_lossy().trim().is_empty() {
        return;
    }

    CAPTURE_DISABLED_WARNING_ONCE.call_once(|| {
        tracing::warn!(
            "{CAPTURE_ENV} is set, but callscope was built without the `capture` feature; \
             calls pass through unrecorded"
        );
    });
}

/// Pass-through interceptor for builds without the `capture` feature.
/// Accepts the same configuration and collector for API parity.
#[derive(Clone)]
pub struct CaptureInterceptor {
    config: CaptureConfig,
}

impl CaptureInterceptor {
    pub fn new(config: CaptureConfig, _collector: impl Collector + 'static) -> Self {
        Self::without_collector(config)
    }

    pub fn without_collector(config: CaptureConfig) -> Self {
        emit_capture_disabled_warning_once();
        Self { config }
    }

    pub fn with_collector(config: CaptureConfig, _collector: Option<Arc<dyn Collector>>) -> Self {
        Self::without_collector(config)
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn has_collector(&self) -> bool {
        false
    }
}

impl ClientInterceptor for CaptureInterceptor {
    fn intercept_call<Req, Resp, C>(
        &self,
        method: &MethodDescriptor,
        options: CallOptions,
        next: &C,
    ) -> Box<dyn ClientCall<Req, Resp>>
    where
        Req: Message,
        Resp: Message,
        C: Channel,
    {
        next.new_call(method, options)
    }
}
