//! Drives the extension's callbacks around each proxied request.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
    Router,
};

use crate::filter::WorkerPool;
use crate::host::Action;
use crate::http::request::RequestExchange;
use crate::http::response::ResponseExchange;
use crate::observability::metrics;

/// Run request headers → (terminal response | forward) → response headers → done.
pub async fn gray_filter_middleware(
    State(pool): State<Arc<WorkerPool>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let start_time = Instant::now();
    let mut ctx = pool.create_http_context();

    let num_headers = request.headers().len();
    let (action, resumed, local_response) = {
        let mut exchange = RequestExchange::new(request.headers_mut());
        let action = ctx.on_http_request_headers(&mut exchange, num_headers, false);
        (action, exchange.resumed(), exchange.into_local_response())
    };

    let mut response = match local_response {
        Some(response) => {
            // Forwarded requests are counted by the proxy handler.
            let status = response.status().as_u16();
            metrics::record_request(request.method().as_str(), status, start_time);
            response
        }
        None => {
            if action == Action::Pause && !resumed {
                // Nothing else will ever resume it from here.
                tracing::warn!("Filter paused without a local response; resuming request");
            }
            next.run(request).await
        }
    };

    let num_headers = response.headers().len();
    let mut exchange = ResponseExchange::new(response.headers_mut());
    ctx.on_http_response_headers(&mut exchange, num_headers, false);
    ctx.on_done();

    response
}

/// Wrap a router so every request passes through the gray filter.
pub fn with_gray_filter<S>(router: Router<S>, pool: Arc<WorkerPool>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(pool, gray_filter_middleware))
}
