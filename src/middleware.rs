use axum::http::Request;
use axum::response::{IntoResponse, Response};
use axum::{extract::Request as AxumRequest, middleware::Next};
use futures::future::BoxFuture;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::{debug, info};

use crate::algorithms::Limiter;
use crate::client_key::{client_key, remote_addr};
use crate::registry::ClientRegistry;
use crate::response::{retry_after_secs, too_many_requests};
use crate::token_bucket::TokenBucket;

/// Wrap `handler` so that every request first passes per-client admission control
pub fn wrap<S, L: Limiter>(registry: ClientRegistry<L>, handler: S) -> Throttle<S, L> {
    ThrottleLayer::new(registry).layer(handler)
}

/// Layer applying [`Throttle`] to a service.
///
/// Several layers built from clones of the same registry share their
/// throttling state.
pub struct ThrottleLayer<L = TokenBucket> {
    registry: ClientRegistry<L>,
}

impl<L: Limiter> ThrottleLayer<L> {
    pub fn new(registry: ClientRegistry<L>) -> Self {
        Self { registry }
    }
}

impl<L> Clone for ThrottleLayer<L> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

impl<S, L: Limiter> Layer<S> for ThrottleLayer<L> {
    type Service = Throttle<S, L>;

    fn layer(&self, inner: S) -> Self::Service {
        Throttle {
            inner,
            registry: self.registry.clone(),
        }
    }
}

/// Service that admits or rejects each request before reaching `inner`
pub struct Throttle<S, L = TokenBucket> {
    inner: S,
    registry: ClientRegistry<L>,
}

impl<S: Clone, L> Clone for Throttle<S, L> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            registry: self.registry.clone(),
        }
    }
}

impl<S, L> Throttle<S, L> {
    pub fn registry(&self) -> &ClientRegistry<L> {
        &self.registry
    }
}

impl<S, L, B> Service<Request<B>> for Throttle<S, L>
where
    S: Service<Request<B>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
    L: Limiter,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let key = match client_key(&request) {
            Ok(key) => key,
            Err(err) => {
                self.registry.metrics().record_rejected();
                return Box::pin(async move { Ok(err.into_response()) });
            }
        };

        let allowed = self.registry.get_or_create(&key).allow();
        self.registry.metrics().record_request(allowed);

        if !allowed {
            debug!(
                target: "ipthrottle::middleware",
                client = %key,
                method = %request.method(),
                uri = %request.uri(),
                "Rate limit exceeded"
            );
            let retry_after = retry_after_secs(self.registry.config().quota.refill_rate);
            return Box::pin(async move { Ok(too_many_requests(retry_after)) });
        }

        // Drive the instance that was polled ready, leave a fresh clone behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        Box::pin(async move { inner.call(request).await })
    }
}

/// Logging middleware for request/response tracking
pub async fn logging_middleware(request: AxumRequest, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let remote = remote_addr(&request);

    info!(
        target: "ipthrottle::middleware",
        method = %method,
        uri = %uri,
        remote_addr = %remote,
        "Incoming request"
    );

    let response = next.run(request).await;

    info!(
        target: "ipthrottle::middleware",
        method = %method,
        uri = %uri,
        status = %response.status(),
        "Request completed"
    );

    response
}
