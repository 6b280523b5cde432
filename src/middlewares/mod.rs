use actix_web::{
    body::{EitherBody, MessageBody},
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    ResponseError,
};
use futures_util::{future::LocalBoxFuture, FutureExt};
use governor::{DefaultKeyedRateLimiter, Quota};
use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::api::error;

const PRUNE_THRESHOLD: usize = 10_000;

/// Per-client request budget: `max_requests` at once, refilled over `window`.
pub struct RateLimiter {
    limiter: DefaultKeyedRateLimiter<Option<IpAddr>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        let burst = NonZeroU32::new(max_requests).unwrap_or(NonZeroU32::MIN);
        let period = window / burst.get();
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        Self {
            limiter: governor::RateLimiter::keyed(quota),
        }
    }

    /// `false` once `client` has spent its budget.
    pub fn check(&self, client: Option<IpAddr>) -> bool {
        // forget clients whose budget is full again
        if self.limiter.len() > PRUNE_THRESHOLD {
            self.limiter.retain_recent();
        }
        self.limiter.check_key(&client).is_ok()
    }
}

/// Keyed on the socket peer. Forwarded headers are client-controlled and
/// are not trusted.
pub fn rate_limit<B>(
    limiter: Arc<RateLimiter>,
) -> impl Fn(
    ServiceRequest,
    Next<B>,
) -> LocalBoxFuture<'static, Result<ServiceResponse<EitherBody<B>>, actix_web::Error>>
where
    B: MessageBody + 'static,
{
    move |req: ServiceRequest, next: Next<B>| {
        let limiter = limiter.clone();
        async move {
            let client = req.peer_addr().map(|addr| addr.ip());

            if !limiter.check(client) {
                tracing::warn!(client = ?client, path = %req.path(), "rate limit exceeded");
                let response = error::Error::TooManyRequests.error_response();
                return Ok(req.into_response(response).map_into_right_body());
            }
            next.call(req).await.map(ServiceResponse::map_into_left_body)
        }
        .boxed_local()
    }
}
