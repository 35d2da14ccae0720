//! Read-through response cache.
//!
//! Wraps individual GET routes. A hit is answered straight from the store; a
//! miss runs the handler and stores successful JSON bodies in the background.

use std::time::Duration;

use axum::{
    Json,
    body::{Body, HttpBody},
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::MethodRouter,
};
use critica_api_types::{ApiErrorBody, ApiErrorMessage};
use http_body_util::BodyExt;
use metrics::counter;
use percent_encoding::percent_decode_str;
use serde::de::IgnoredAny;
use tracing::{debug, instrument, warn};

use super::keys::QueryParams;
use super::prefix::CachePrefix;
use super::state::CacheState;
use super::store::CacheLookup;
use crate::application::error::ErrorReport;

/// Header marking whether a response was served from the cache.
pub const CACHE_STATUS_HEADER: &str = "x-cache";

const METRIC_CACHE_HIT_TOTAL: &str = "critica_cache_hit_total";
const METRIC_CACHE_MISS_TOTAL: &str = "critica_cache_miss_total";

/// Per-route middleware state.
#[derive(Clone)]
pub struct RouteCache {
    pub cache: CacheState,
    pub prefix: CachePrefix,
    pub ttl: Duration,
}

/// Attach read-through caching to `route` using the prefix's configured TTL.
pub fn cached<S>(route: MethodRouter<S>, cache: &CacheState, prefix: CachePrefix) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    let ttl = cache.ttl(prefix);
    cached_with_ttl(route, cache, prefix, ttl)
}

/// Attach read-through caching to `route` with an explicit TTL.
pub fn cached_with_ttl<S>(
    route: MethodRouter<S>,
    cache: &CacheState,
    prefix: CachePrefix,
    ttl: Duration,
) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    let state = RouteCache {
        cache: cache.clone(),
        prefix,
        ttl,
    };
    route.layer(middleware::from_fn_with_state(state, response_cache_layer))
}

#[instrument(skip_all, fields(prefix = %route.prefix, path = %request.uri().path()))]
pub async fn response_cache_layer(
    State(route): State<RouteCache>,
    request: Request,
    next: Next,
) -> Response {
    if !route.cache.is_enabled() || request.method() != Method::GET {
        return next.run(request).await;
    }

    // Handlers see decoded path params, so encoded aliases must share a key.
    let path = match percent_decode_str(request.uri().path()).decode_utf8() {
        Ok(path) => path.into_owned(),
        Err(error) => {
            debug!(cache = "response", error = %error, "path is not valid UTF-8, not caching");
            counter!(METRIC_CACHE_MISS_TOTAL, "prefix" => route.prefix.as_str()).increment(1);
            return mark(next.run(request).await, "MISS");
        }
    };
    let params = request
        .uri()
        .query()
        .map(QueryParams::parse)
        .unwrap_or_default();
    let key = route.cache.key(route.prefix, &path, Some(&params));

    match route.cache.store.get(&key).await {
        CacheLookup::Hit(payload) => {
            if serde_json::from_str::<IgnoredAny>(&payload).is_ok() {
                debug!(cache = "response", outcome = "hit", "serving cached response");
                counter!(METRIC_CACHE_HIT_TOTAL, "prefix" => route.prefix.as_str()).increment(1);
                return cached_response(payload);
            }
            debug!(
                cache = "response",
                key = %key,
                "discarding malformed cached payload"
            );
        }
        CacheLookup::Miss => {}
        CacheLookup::BackendError(error) => {
            debug!(cache = "response", error = %error, "cache lookup failed, treating as miss");
        }
    }

    debug!(cache = "response", outcome = "miss", "executing handler");
    counter!(METRIC_CACHE_MISS_TOTAL, "prefix" => route.prefix.as_str()).increment(1);

    let response = next.run(request).await;
    if !response.status().is_success() {
        return mark(response, "MISS");
    }

    let max_body_bytes = route.cache.config.max_body_bytes as u64;
    let fits = response
        .body()
        .size_hint()
        .upper()
        .is_some_and(|upper| upper <= max_body_bytes);
    if !fits {
        debug!(cache = "response", "response body too large to cache");
        return mark(response, "MISS");
    }

    let (parts, body) = response.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(error) => {
            warn!(cache = "response", error = %error, "failed to buffer response body");
            return body_error_response(&error.to_string());
        }
    };

    match std::str::from_utf8(&bytes) {
        Ok(text) if serde_json::from_str::<IgnoredAny>(text).is_ok() => {
            route
                .cache
                .store
                .spawn_set(key, text.to_string(), route.ttl);
        }
        _ => debug!(cache = "response", "response body is not JSON, not caching"),
    }

    mark(Response::from_parts(parts, Body::from(bytes)), "MISS")
}

fn cached_response(payload: String) -> Response {
    let mut response = (StatusCode::OK, payload).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    mark(response, "HIT")
}

fn body_error_response(detail: &str) -> Response {
    let body = ApiErrorBody {
        error: ApiErrorMessage {
            code: "response_body_error".to_string(),
            message: "Failed to read response body".to_string(),
            hint: None,
        },
    };
    let mut response = (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
    ErrorReport::from_message(
        "cache::middleware",
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("response body error: {detail}"),
    )
    .attach(&mut response);
    mark(response, "MISS")
}

fn mark(mut response: Response, status: &'static str) -> Response {
    response
        .headers_mut()
        .insert(CACHE_STATUS_HEADER, HeaderValue::from_static(status));
    response
}
