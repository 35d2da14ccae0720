pub mod error;
pub mod handlers;
pub mod state;

pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, patch, post},
};

use crate::cache::{CachePrefix, cached};
use crate::infra::http::middleware::{log_responses, set_request_context};

/// Build the public review API. Every GET view except the health probe is
/// wrapped in the read-through cache under its own prefix.
pub fn build_api_router(state: ApiState) -> Router {
    let cache = state.cache.clone();

    Router::new()
        .route("/healthz", get(handlers::health))
        .route(
            "/categories",
            cached(
                get(handlers::list_categories),
                &cache,
                CachePrefix::Categories,
            )
            .post(handlers::create_category),
        )
        .route(
            "/reviews",
            cached(get(handlers::list_reviews), &cache, CachePrefix::ReviewsList)
                .post(handlers::create_review),
        )
        .route(
            "/reviews/latest",
            cached(
                get(handlers::latest_reviews),
                &cache,
                CachePrefix::ReviewsLatest,
            ),
        )
        .route(
            "/reviews/popular",
            cached(
                get(handlers::popular_reviews),
                &cache,
                CachePrefix::ReviewsPopular,
            ),
        )
        .route(
            "/reviews/slug/{slug}",
            cached(get(handlers::get_review), &cache, CachePrefix::ReviewsSlug),
        )
        .route("/reviews/{id}", delete(handlers::delete_review))
        .route(
            "/reviews/{id}/status",
            patch(handlers::update_review_status),
        )
        .route("/reviews/{id}/comments", post(handlers::post_comment))
        .route("/reviews/{id}/votes", post(handlers::cast_vote))
        .route(
            "/comments/{id}/status",
            patch(handlers::update_comment_status),
        )
        .route("/users", post(handlers::register_user))
        .route(
            "/users/{id}/profile",
            cached(
                get(handlers::user_profile),
                &cache,
                CachePrefix::UsersProfile,
            ),
        )
        .route(
            "/users/{id}/reviews",
            cached(
                get(handlers::user_reviews),
                &cache,
                CachePrefix::UsersReviews,
            ),
        )
        .route("/users/{id}/role", patch(handlers::update_user_role))
        .route(
            "/search",
            cached(get(handlers::search), &cache, CachePrefix::Search),
        )
        .route(
            "/sitemap/reviews",
            cached(
                get(handlers::review_sitemap),
                &cache,
                CachePrefix::SitemapReviews,
            ),
        )
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
