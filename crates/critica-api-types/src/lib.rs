//! Request and response types for the Critica review API.
//!
//! These are the JSON bodies exchanged with the HTTP layer. Cached responses are
//! byte-for-byte copies of the serialized forms defined here.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

// ============================================================================
// Status enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Published,
    Hidden,
    Deleted,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Published => "published",
            ReviewStatus::Hidden => "hidden",
            ReviewStatus::Deleted => "deleted",
        }
    }

    pub fn is_public(&self) -> bool {
        matches!(self, ReviewStatus::Published)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentStatus {
    Visible,
    Hidden,
    Deleted,
}

impl CommentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentStatus::Visible => "visible",
            CommentStatus::Hidden => "hidden",
            CommentStatus::Deleted => "deleted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Member,
    Moderator,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Member => "member",
            UserRole::Moderator => "moderator",
            UserRole::Admin => "admin",
        }
    }
}

// ============================================================================
// Categories
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryItem {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryListResponse {
    pub items: Vec<CategoryItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

// ============================================================================
// Reviews
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub rating: u8,
    pub category: String,
    pub author_id: Uuid,
    pub tags: Vec<String>,
    pub score: i64,
    pub comment_count: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewDetail {
    #[serde(flatten)]
    pub summary: ReviewSummary,
    pub body: String,
    pub status: ReviewStatus,
    pub comments: Vec<CommentItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewListResponse {
    pub items: Vec<ReviewSummary>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReviewRequest {
    pub title: String,
    pub body: String,
    pub rating: u8,
    /// Category slug.
    pub category: String,
    pub author_id: Uuid,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Explicit slug; derived from the title when absent.
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub status: Option<ReviewStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateReviewStatusRequest {
    pub status: ReviewStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewStatusResponse {
    pub id: Uuid,
    pub slug: String,
    pub status: ReviewStatus,
}

// ============================================================================
// Comments and votes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentItem {
    pub id: Uuid,
    pub review_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub status: CommentStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    pub author_id: Uuid,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCommentStatusRequest {
    pub status: CommentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastVoteRequest {
    pub user_id: Uuid,
    /// `1` for an upvote, `-1` for a downvote.
    pub value: i8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteResponse {
    pub review_id: Uuid,
    pub score: i64,
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub role: UserRole,
    pub review_count: u32,
    pub total_score: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub joined_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUserRoleRequest {
    pub role: UserRole,
}

// ============================================================================
// Search, sitemap, health
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub items: Vec<ReviewSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitemapEntry {
    pub loc: String,
    #[serde(with = "time::serde::rfc3339")]
    pub last_modified: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitemapResponse {
    pub entries: Vec<SitemapEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub cache_backend: String,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub hint: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&ReviewStatus::Hidden).unwrap(),
            "\"hidden\""
        );
        assert_eq!(
            serde_json::to_string(&CommentStatus::Visible).unwrap(),
            "\"visible\""
        );
        assert_eq!(
            serde_json::from_str::<UserRole>("\"moderator\"").unwrap(),
            UserRole::Moderator
        );
    }

    #[test]
    fn review_detail_flattens_summary() {
        let detail = ReviewDetail {
            summary: ReviewSummary {
                id: Uuid::nil(),
                slug: "great-vacuum-2024".to_string(),
                title: "Great Vacuum".to_string(),
                rating: 5,
                category: "home".to_string(),
                author_id: Uuid::nil(),
                tags: vec![],
                score: 0,
                comment_count: 0,
                created_at: OffsetDateTime::UNIX_EPOCH,
            },
            body: "Sucks well.".to_string(),
            status: ReviewStatus::Published,
            comments: vec![],
        };

        let value = serde_json::to_value(&detail).unwrap();
        assert_eq!(value["slug"], "great-vacuum-2024");
        assert_eq!(value["status"], "published");
    }

    #[test]
    fn create_review_defaults_optional_fields() {
        let request: CreateReviewRequest = serde_json::from_str(
            r#"{"title":"T","body":"B","rating":3,"category":"c","author_id":"00000000-0000-0000-0000-000000000000"}"#,
        )
        .unwrap();
        assert!(request.tags.is_empty());
        assert!(request.slug.is_none());
        assert!(request.status.is_none());
    }
}
