//! Domain entity representations mirroring persisted records.

use time::OffsetDateTime;
use uuid::Uuid;

use super::types::{CommentStatus, ReviewStatus, UserRole};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRecord {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRecord {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub body: String,
    pub rating: u8,
    pub category_id: Uuid,
    pub author_id: Uuid,
    pub tags: Vec<String>,
    pub status: ReviewStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRecord {
    pub id: Uuid,
    pub review_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub status: CommentStatus,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteRecord {
    pub review_id: Uuid,
    pub user_id: Uuid,
    /// `1` or `-1`.
    pub value: i8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub role: UserRole,
    pub joined_at: OffsetDateTime,
}
