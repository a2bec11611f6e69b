use std::sync::Arc;

use callscope_types::Transaction;

use super::call::CapturingCall;
use super::context::CallContext;
use crate::{
    CallOptions, CaptureConfig, Channel, ClientCall, ClientInterceptor, Collector, Message,
    MethodDescriptor, TransactionHandle, describe_target,
};

pub(crate) struct CaptureSettings {
    pub(crate) config: CaptureConfig,
    pub(crate) collector: Option<Arc<dyn Collector>>,
}

/// Client interceptor that captures every call it sees as a transaction
/// record and hands it to a [`Collector`].
///
/// Holds only immutable configuration; each call gets a fresh record,
/// fresh accumulators and a fresh one-shot flag.
#[derive(Clone)]
pub struct CaptureInterceptor {
    settings: Arc<CaptureSettings>,
}

impl CaptureInterceptor {
    pub fn new(config: CaptureConfig, collector: impl Collector + 'static) -> Self {
        let collector: Arc<dyn Collector> = Arc::new(collector);
        Self::with_collector(config, Some(collector))
    }

    /// Captures records but notifies nobody.
    pub fn without_collector(config: CaptureConfig) -> Self {
        Self::with_collector(config, None)
    }

    pub fn with_collector(config: CaptureConfig, collector: Option<Arc<dyn Collector>>) -> Self {
        Self {
            settings: Arc::new(CaptureSettings { config, collector }),
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.settings.config
    }

    pub fn has_collector(&self) -> bool {
        self.settings.collector.is_some()
    }

    /// Decorates an already-created call. `authority` is the target the
    /// call's channel talks to.
    pub fn wrap_call<Req, Resp>(
        &self,
        method: &MethodDescriptor,
        authority: Option<&str>,
        inner: Box<dyn ClientCall<Req, Resp>>,
    ) -> CapturingCall<Req, Resp>
    where
        Req: Message,
        Resp: Message,
    {
        CapturingCall::new(inner, self.open_context(method, authority))
    }

    fn open_context(&self, method: &MethodDescriptor, authority: Option<&str>) -> Arc<CallContext> {
        let target = describe_target(authority, method.full_method_name());
        let record = TransactionHandle::new(Transaction::new(method.method_type(), target));
        tracing::debug!(
            id = %record.id(),
            method = %method.method_type(),
            full_method = method.full_method_name(),
            "intercepting call"
        );
        Arc::new(CallContext::new(record, Arc::clone(&self.settings)))
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
        let context = self.open_context(method, next.authority().as_deref());
        let inner = next.new_call(method, options);
        Box::new(CapturingCall::new(inner, context))
    }
}
