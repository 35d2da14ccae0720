//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{
    CategoryRecord, CommentRecord, ReviewRecord, UserRecord, VoteRecord,
};
use crate::domain::types::{CommentStatus, ReviewStatus, UserRole};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn duplicate(constraint: impl Into<String>) -> Self {
        Self::Duplicate {
            constraint: constraint.into(),
        }
    }
}

/// Ordering of public review listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReviewSort {
    /// Newest first.
    #[default]
    Latest,
    /// Highest vote score first, newest first on ties.
    Popular,
    /// Highest rating first, newest first on ties.
    Rating,
}

impl ReviewSort {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "latest" => Some(Self::Latest),
            "popular" => Some(Self::Popular),
            "rating" => Some(Self::Rating),
            _ => None,
        }
    }
}

/// Filter for published reviews.
#[derive(Debug, Clone, Default)]
pub struct ReviewQuery {
    pub category_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    /// A review must carry every listed tag.
    pub tags: Vec<String>,
    /// Case-insensitive match against title, body and tags.
    pub text: Option<String>,
    pub sort: ReviewSort,
    pub offset: u64,
    pub limit: u64,
}

/// A review joined with the aggregates its public views show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewWithStats {
    pub review: ReviewRecord,
    pub category_slug: String,
    pub score: i64,
    pub comment_count: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ReviewPage {
    pub items: Vec<ReviewWithStats>,
    /// Matches before `offset`/`limit` were applied.
    pub total: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthorStats {
    pub review_count: u32,
    pub total_score: i64,
}

#[derive(Debug, Clone)]
pub struct CreateCategoryParams {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateReviewParams {
    pub slug: String,
    pub title: String,
    pub body: String,
    pub rating: u8,
    pub category_id: Uuid,
    pub author_id: Uuid,
    pub tags: Vec<String>,
    pub status: ReviewStatus,
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub review_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub username: String,
    pub role: UserRole,
}

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError>;

    async fn find_category_by_slug(&self, slug: &str)
    -> Result<Option<CategoryRecord>, RepoError>;

    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError>;
}

#[async_trait]
pub trait ReviewsRepo: Send + Sync {
    async fn create_review(&self, params: CreateReviewParams) -> Result<ReviewRecord, RepoError>;

    async fn find_review(&self, id: Uuid) -> Result<Option<ReviewRecord>, RepoError>;

    /// Any status; callers decide what is public.
    async fn find_review_by_slug(&self, slug: &str)
    -> Result<Option<ReviewWithStats>, RepoError>;

    async fn review_slug_exists(&self, slug: &str) -> Result<bool, RepoError>;

    async fn update_review_status(
        &self,
        id: Uuid,
        status: ReviewStatus,
    ) -> Result<ReviewRecord, RepoError>;

    /// Published reviews only.
    async fn list_reviews(&self, query: &ReviewQuery) -> Result<ReviewPage, RepoError>;

    /// Aggregates over the author's published reviews.
    async fn author_stats(&self, author_id: Uuid) -> Result<AuthorStats, RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    async fn create_comment(&self, params: CreateCommentParams)
    -> Result<CommentRecord, RepoError>;

    async fn find_comment(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError>;

    async fn update_comment_status(
        &self,
        id: Uuid,
        status: CommentStatus,
    ) -> Result<CommentRecord, RepoError>;

    /// Oldest first.
    async fn list_comments(
        &self,
        review_id: Uuid,
        status: Option<CommentStatus>,
    ) -> Result<Vec<CommentRecord>, RepoError>;
}

#[async_trait]
pub trait VotesRepo: Send + Sync {
    /// Insert or replace the user's vote on a review.
    async fn upsert_vote(&self, vote: VoteRecord) -> Result<(), RepoError>;

    async fn review_score(&self, review_id: Uuid) -> Result<i64, RepoError>;
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;

    async fn update_user_role(&self, id: Uuid, role: UserRole) -> Result<UserRecord, RepoError>;
}
