//! Review reads and writes.
//!
//! Every write commits through the repository first and only then runs the
//! matching cache invalidation, so a concurrent reader can never repopulate a
//! view with pre-write data after it was evicted.

use std::collections::BTreeSet;
use std::sync::Arc;

use critica_api_types::{
    CommentItem, CreateReviewRequest, ReviewDetail, ReviewListResponse, ReviewStatusResponse,
    ReviewSummary, SearchResponse, SitemapEntry, SitemapResponse,
};
use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::repos::{
    CategoriesRepo, CommentsRepo, CreateReviewParams, RepoError, ReviewQuery, ReviewSort,
    ReviewWithStats, ReviewsRepo, UsersRepo,
};
use crate::cache::{CacheTrigger, review_detail_path};
use crate::domain::entities::CommentRecord;
use crate::domain::slug::{SlugAsyncError, generate_unique_slug_async, validate_slug};
use crate::domain::types::{CommentStatus, ReviewStatus};

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;
const DEFAULT_FEED_LIMIT: u32 = 10;
const MAX_FEED_LIMIT: u32 = 50;
const SEARCH_LIMIT: u64 = 20;
const MAX_TITLE_LEN: usize = 200;
const MAX_TAGS: usize = 10;

/// Listing filters as they arrive from the query string.
#[derive(Debug, Clone, Default)]
pub struct ListReviewsParams {
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub sort: Option<String>,
}

#[derive(Clone)]
pub struct ReviewService {
    reviews: Arc<dyn ReviewsRepo>,
    categories: Arc<dyn CategoriesRepo>,
    comments: Arc<dyn CommentsRepo>,
    users: Arc<dyn UsersRepo>,
    cache: CacheTrigger,
}

impl ReviewService {
    pub fn new(
        reviews: Arc<dyn ReviewsRepo>,
        categories: Arc<dyn CategoriesRepo>,
        comments: Arc<dyn CommentsRepo>,
        users: Arc<dyn UsersRepo>,
        cache: CacheTrigger,
    ) -> Self {
        Self {
            reviews,
            categories,
            comments,
            users,
            cache,
        }
    }

    pub async fn create(&self, request: CreateReviewRequest) -> Result<ReviewDetail, AppError> {
        let title = request.title.trim().to_string();
        if title.is_empty() || title.chars().count() > MAX_TITLE_LEN {
            return Err(AppError::validation(format!(
                "title must be between 1 and {MAX_TITLE_LEN} characters"
            )));
        }
        let body = request.body.trim().to_string();
        if body.is_empty() {
            return Err(AppError::validation("body must not be empty"));
        }
        if !(1..=5).contains(&request.rating) {
            return Err(AppError::validation("rating must be between 1 and 5"));
        }
        let tags = normalize_tags(&request.tags)?;

        let category = self
            .categories
            .find_category_by_slug(request.category.trim())
            .await?
            .ok_or_else(|| AppError::validation(format!("unknown category `{}`", request.category)))?;
        self.users
            .find_user(request.author_id)
            .await?
            .ok_or_else(|| AppError::validation("unknown author"))?;

        let slug = match request.slug {
            Some(slug) => {
                validate_slug(&slug)?;
                if self.reviews.review_slug_exists(&slug).await? {
                    return Err(RepoError::duplicate("reviews_slug_key").into());
                }
                slug
            }
            None => self.unique_slug(&title).await?,
        };

        let record = self
            .reviews
            .create_review(CreateReviewParams {
                slug,
                title,
                body,
                rating: request.rating,
                category_id: category.id,
                author_id: request.author_id,
                tags,
                status: request.status.unwrap_or(ReviewStatus::Published),
            })
            .await?;

        self.cache.review_created().await;

        let stored = self
            .reviews
            .find_review_by_slug(&record.slug)
            .await?
            .ok_or(RepoError::NotFound)?;
        Ok(ReviewDetail {
            summary: review_summary(&stored),
            body: stored.review.body.clone(),
            status: stored.review.status,
            comments: Vec::new(),
        })
    }

    pub async fn list(&self, params: ListReviewsParams) -> Result<ReviewListResponse, AppError> {
        let page = params.page.unwrap_or(1).max(1);
        let per_page = params
            .per_page
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let sort = match params.sort.as_deref() {
            Some(value) => ReviewSort::parse(value)
                .ok_or_else(|| AppError::validation(format!("unknown sort `{value}`")))?,
            None => ReviewSort::Latest,
        };

        let category_id = match params.category.as_deref() {
            Some(slug) => match self.categories.find_category_by_slug(slug).await? {
                Some(category) => Some(category.id),
                None => return Ok(empty_list(page, per_page)),
            },
            None => None,
        };

        let query = ReviewQuery {
            category_id,
            tags: normalize_tags(&params.tags)?,
            sort,
            offset: u64::from(page - 1) * u64::from(per_page),
            limit: u64::from(per_page),
            ..Default::default()
        };
        let result = self.reviews.list_reviews(&query).await?;

        Ok(ReviewListResponse {
            items: result.items.iter().map(review_summary).collect(),
            page,
            per_page,
            total: result.total,
        })
    }

    pub async fn latest(&self, limit: Option<u32>) -> Result<Vec<ReviewSummary>, AppError> {
        self.feed(ReviewSort::Latest, limit).await
    }

    pub async fn popular(&self, limit: Option<u32>) -> Result<Vec<ReviewSummary>, AppError> {
        self.feed(ReviewSort::Popular, limit).await
    }

    async fn feed(&self, sort: ReviewSort, limit: Option<u32>) -> Result<Vec<ReviewSummary>, AppError> {
        let limit = limit.unwrap_or(DEFAULT_FEED_LIMIT).clamp(1, MAX_FEED_LIMIT);
        let query = ReviewQuery {
            sort,
            limit: u64::from(limit),
            ..Default::default()
        };
        let result = self.reviews.list_reviews(&query).await?;
        Ok(result.items.iter().map(review_summary).collect())
    }

    /// Published review with its visible comments.
    pub async fn by_slug(&self, slug: &str) -> Result<ReviewDetail, AppError> {
        let stored = self
            .reviews
            .find_review_by_slug(slug)
            .await?
            .filter(|stored| stored.review.status.is_public())
            .ok_or_else(|| AppError::not_found("review"))?;

        let comments = self
            .comments
            .list_comments(stored.review.id, Some(CommentStatus::Visible))
            .await?;

        Ok(ReviewDetail {
            summary: review_summary(&stored),
            body: stored.review.body.clone(),
            status: stored.review.status,
            comments: comments.iter().map(comment_item).collect(),
        })
    }

    pub async fn update_status(
        &self,
        id: Uuid,
        status: ReviewStatus,
    ) -> Result<ReviewStatusResponse, AppError> {
        let record = self.reviews.update_review_status(id, status).await?;

        self.cache.review_status_changed(&record.slug).await;

        Ok(ReviewStatusResponse {
            id: record.id,
            slug: record.slug,
            status: record.status,
        })
    }

    /// Soft delete.
    pub async fn delete(&self, id: Uuid) -> Result<ReviewStatusResponse, AppError> {
        self.update_status(id, ReviewStatus::Deleted).await
    }

    pub async fn search(
        &self,
        text: &str,
        category: Option<&str>,
    ) -> Result<SearchResponse, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::validation("search query must not be empty"));
        }

        let category_id = match category {
            Some(slug) => match self.categories.find_category_by_slug(slug).await? {
                Some(category) => Some(category.id),
                None => {
                    return Ok(SearchResponse {
                        query: text.to_string(),
                        items: Vec::new(),
                    });
                }
            },
            None => None,
        };

        let query = ReviewQuery {
            category_id,
            text: Some(text.to_string()),
            limit: SEARCH_LIMIT,
            ..Default::default()
        };
        let result = self.reviews.list_reviews(&query).await?;

        Ok(SearchResponse {
            query: text.to_string(),
            items: result.items.iter().map(review_summary).collect(),
        })
    }

    pub async fn by_author(
        &self,
        author_id: Uuid,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<ReviewListResponse, AppError> {
        self.users
            .find_user(author_id)
            .await?
            .ok_or_else(|| AppError::not_found("user"))?;

        let page = page.unwrap_or(1).max(1);
        let per_page = per_page.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let query = ReviewQuery {
            author_id: Some(author_id),
            offset: u64::from(page - 1) * u64::from(per_page),
            limit: u64::from(per_page),
            ..Default::default()
        };
        let result = self.reviews.list_reviews(&query).await?;

        Ok(ReviewListResponse {
            items: result.items.iter().map(review_summary).collect(),
            page,
            per_page,
            total: result.total,
        })
    }

    pub async fn sitemap(&self) -> Result<SitemapResponse, AppError> {
        let query = ReviewQuery {
            limit: u64::MAX,
            ..Default::default()
        };
        let result = self.reviews.list_reviews(&query).await?;

        Ok(SitemapResponse {
            entries: result
                .items
                .iter()
                .map(|stored| SitemapEntry {
                    loc: review_detail_path(&stored.review.slug),
                    last_modified: stored.review.updated_at,
                })
                .collect(),
        })
    }

    async fn unique_slug(&self, title: &str) -> Result<String, AppError> {
        let reviews = self.reviews.clone();
        generate_unique_slug_async(title, move |candidate| {
            let reviews = reviews.clone();
            let candidate = candidate.to_string();
            async move { reviews.review_slug_exists(&candidate).await.map(|taken| !taken) }
        })
        .await
        .map_err(|err| match err {
            SlugAsyncError::Slug(slug) => AppError::from(slug),
            SlugAsyncError::Predicate(repo) => AppError::from(repo),
        })
    }
}

pub(crate) fn review_summary(stored: &ReviewWithStats) -> ReviewSummary {
    let review = &stored.review;
    ReviewSummary {
        id: review.id,
        slug: review.slug.clone(),
        title: review.title.clone(),
        rating: review.rating,
        category: stored.category_slug.clone(),
        author_id: review.author_id,
        tags: review.tags.clone(),
        score: stored.score,
        comment_count: stored.comment_count,
        created_at: review.created_at,
    }
}

pub(crate) fn comment_item(record: &CommentRecord) -> CommentItem {
    CommentItem {
        id: record.id,
        review_id: record.review_id,
        author_id: record.author_id,
        body: record.body.clone(),
        status: record.status,
        created_at: record.created_at,
    }
}

/// Trim, lowercase and deduplicate tags, keeping them sorted.
fn normalize_tags(tags: &[String]) -> Result<Vec<String>, AppError> {
    let normalized: BTreeSet<String> = tags
        .iter()
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect();
    if normalized.len() > MAX_TAGS {
        return Err(AppError::validation(format!(
            "at most {MAX_TAGS} tags are allowed"
        )));
    }
    Ok(normalized.into_iter().collect())
}

fn empty_list(page: u32, per_page: u32) -> ReviewListResponse {
    ReviewListResponse {
        items: Vec::new(),
        page,
        per_page,
        total: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_normalized_and_sorted() {
        let tags = vec![
            " Cordless ".to_string(),
            "budget".to_string(),
            "cordless".to_string(),
            "".to_string(),
        ];
        assert_eq!(
            normalize_tags(&tags).expect("valid tags"),
            vec!["budget".to_string(), "cordless".to_string()]
        );
    }

    #[test]
    fn too_many_tags_are_rejected() {
        let tags: Vec<String> = (0..=MAX_TAGS).map(|i| format!("tag-{i}")).collect();
        assert!(normalize_tags(&tags).is_err());
    }
}
