use crate::config::{global, QueryInspectConfig};
use crate::core::log::QueryLog;
use crate::core::pipeline::Inspector;
use crate::core::stats::RequestContext;
use crate::core::task_ctx;
use crate::error::{InspectError, Result};
use crate::observability::prom;

use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error,
};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use std::{
    rc::Rc,
    task::{Context, Poll},
};

/// Per-request SQL inspection middleware.
///
/// Each request runs with its own task-scoped [`QueryLog`]; every query logged
/// while serving it lands there. The middleware reports duplicates and slow
/// queries from that log and optionally attaches `x-queryinspect-*` headers.
pub struct QueryInspect {
    inspector: Inspector,
}

impl QueryInspect {
    /// Uses the process-wide config set by [`crate::init_global`].
    pub fn new() -> Self {
        Self::with_config(global())
    }

    pub fn with_config(cfg: QueryInspectConfig) -> Self {
        Self {
            inspector: Inspector::new(cfg),
        }
    }

    /// Like [`Self::with_config`], but refuses to build a disabled middleware.
    pub fn try_new(cfg: QueryInspectConfig) -> Result<Self> {
        let cfg = cfg.validate()?;
        if !cfg.enabled {
            return Err(InspectError::NotUsed);
        }
        Ok(Self::with_config(cfg))
    }

    pub fn is_enabled(&self) -> bool {
        self.inspector.enabled()
    }
}

impl Default for QueryInspect {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, B> Transform<S, ServiceRequest> for QueryInspect
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = QueryInspectMiddleware<S>;
    type InitError = ();
    type Future = Ready<std::result::Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        prom::init_prometheus();
        ready(Ok(QueryInspectMiddleware {
            service: Rc::new(service),
            inspector: self.inspector.clone(),
        }))
    }
}

pub struct QueryInspectMiddleware<S> {
    pub(crate) service: Rc<S>,
    pub(crate) inspector: Inspector,
}

impl<S, B> Service<ServiceRequest> for QueryInspectMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = self.service.clone();

        if !self.inspector.enabled() {
            return Box::pin(async move { svc.call(req).await });
        }

        let inspector = self.inspector.clone();
        let log = QueryLog::new();
        let ctx = RequestContext::begin(&log);

        Box::pin(async move {
            // failed requests are not reported
            let mut res = task_ctx::scope(log.clone(), async move { svc.call(req).await }).await?;

            let (records, request_time) = ctx.finish(&log);
            let analysis = match inspector.analyze(&records, request_time) {
                Ok(a) => a,
                Err(e) => {
                    tracing::error!(target: "query_inspect", path = %res.request().path(), "query inspection failed: {}", e);
                    return Ok(res);
                }
            };

            analysis.report.emit();
            prom::observe_analysis(&analysis);

            let headers = res.headers_mut();
            for (name, val) in &analysis.report.headers {
                if let Ok(hv) = HeaderValue::from_str(val) {
                    headers.insert(HeaderName::from_static(*name), hv);
                }
            }

            Ok(res)
        })
    }
}
