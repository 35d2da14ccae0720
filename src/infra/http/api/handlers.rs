use axum::Json;
use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use critica_api_types::{
    CastVoteRequest, CreateCategoryRequest, CreateCommentRequest, CreateReviewRequest,
    CreateUserRequest, HealthResponse, UpdateCommentStatusRequest, UpdateReviewStatusRequest,
    UpdateUserRoleRequest,
};
use uuid::Uuid;

use crate::application::ListReviewsParams;
use crate::cache::QueryParams;

use super::error::ApiError;
use super::state::ApiState;

pub async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        cache_backend: state.cache.backend_name().await.to_string(),
    })
}

/// -------- Categories --------
pub async fn list_categories(
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ApiError> {
    let categories = state.categories.list().await?;
    Ok(Json(categories))
}

pub async fn create_category(
    State(state): State<ApiState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state.categories.create(payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// -------- Reviews --------
pub async fn list_reviews(
    State(state): State<ApiState>,
    RawQuery(raw): RawQuery,
) -> Result<impl IntoResponse, ApiError> {
    let query = parse_query(raw);
    let params = ListReviewsParams {
        category: single(&query, "category")?.map(str::to_string),
        tags: query.get_all("tag").into_iter().map(str::to_string).collect(),
        page: parse_number(&query, "page")?,
        per_page: parse_number(&query, "per_page")?,
        sort: single(&query, "sort")?.map(str::to_string),
    };

    let reviews = state.reviews.list(params).await?;
    Ok(Json(reviews))
}

pub async fn latest_reviews(
    State(state): State<ApiState>,
    RawQuery(raw): RawQuery,
) -> Result<impl IntoResponse, ApiError> {
    let limit = parse_number(&parse_query(raw), "limit")?;
    let reviews = state.reviews.latest(limit).await?;
    Ok(Json(reviews))
}

pub async fn popular_reviews(
    State(state): State<ApiState>,
    RawQuery(raw): RawQuery,
) -> Result<impl IntoResponse, ApiError> {
    let limit = parse_number(&parse_query(raw), "limit")?;
    let reviews = state.reviews.popular(limit).await?;
    Ok(Json(reviews))
}

pub async fn get_review(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let review = state.reviews.by_slug(&slug).await?;
    Ok(Json(review))
}

pub async fn create_review(
    State(state): State<ApiState>,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let review = state.reviews.create(payload).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn update_review_status(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateReviewStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let review = state.reviews.update_status(id, payload.status).await?;
    Ok(Json(review))
}

pub async fn delete_review(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let review = state.reviews.delete(id).await?;
    Ok(Json(review))
}

/// -------- Comments and votes --------
pub async fn post_comment(
    State(state): State<ApiState>,
    Path(review_id): Path<Uuid>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state.comments.post(review_id, payload).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn update_comment_status(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCommentStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state.comments.update_status(id, payload.status).await?;
    Ok(Json(comment))
}

pub async fn cast_vote(
    State(state): State<ApiState>,
    Path(review_id): Path<Uuid>,
    Json(payload): Json<CastVoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let vote = state.votes.cast(review_id, payload).await?;
    Ok(Json(vote))
}

/// -------- Users --------
pub async fn register_user(
    State(state): State<ApiState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.users.register(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn user_profile(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.users.profile(id).await?;
    Ok(Json(profile))
}

pub async fn user_reviews(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    RawQuery(raw): RawQuery,
) -> Result<impl IntoResponse, ApiError> {
    let query = parse_query(raw);
    let page = parse_number(&query, "page")?;
    let per_page = parse_number(&query, "per_page")?;
    let reviews = state.reviews.by_author(id, page, per_page).await?;
    Ok(Json(reviews))
}

pub async fn update_user_role(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.users.update_role(id, payload.role).await?;
    Ok(Json(profile))
}

/// -------- Search and sitemap --------
pub async fn search(
    State(state): State<ApiState>,
    RawQuery(raw): RawQuery,
) -> Result<impl IntoResponse, ApiError> {
    let query = parse_query(raw);
    let text = single(&query, "q")?.unwrap_or_default();
    let category = single(&query, "category")?;
    let results = state.reviews.search(text, category).await?;
    Ok(Json(results))
}

pub async fn review_sitemap(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let sitemap = state.reviews.sitemap().await?;
    Ok(Json(sitemap))
}

fn parse_query(raw: Option<String>) -> QueryParams {
    raw.as_deref().map(QueryParams::parse).unwrap_or_default()
}

/// The cache key sorts repeated values, so a handler must never pick one of
/// several by position. Scalar parameters given more than once are rejected.
fn single<'q>(query: &'q QueryParams, name: &'static str) -> Result<Option<&'q str>, ApiError> {
    match query.get_all(name).as_slice() {
        [] => Ok(None),
        [value] => Ok(Some(*value)),
        _ => Err(ApiError::bad_request(
            "Invalid query parameter",
            Some(format!("`{name}` must be given at most once")),
        )),
    }
}

fn parse_number(query: &QueryParams, name: &'static str) -> Result<Option<u32>, ApiError> {
    single(query, name)?
        .map(|value| {
            value.parse::<u32>().map_err(|_| {
                ApiError::bad_request(
                    "Invalid query parameter",
                    Some(format!("`{name}` must be a non-negative integer")),
                )
            })
        })
        .transpose()
}
