use std::sync::Arc;

use critica_api_types::{CommentItem, CreateCommentRequest};
use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::repos::{CommentsRepo, CreateCommentParams, ReviewsRepo, UsersRepo};
use crate::application::reviews::comment_item;
use crate::cache::{CachePrefix, CacheTrigger};
use crate::domain::types::CommentStatus;

const MAX_COMMENT_LEN: usize = 4000;

#[derive(Clone)]
pub struct CommentService {
    comments: Arc<dyn CommentsRepo>,
    reviews: Arc<dyn ReviewsRepo>,
    users: Arc<dyn UsersRepo>,
    cache: CacheTrigger,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentsRepo>,
        reviews: Arc<dyn ReviewsRepo>,
        users: Arc<dyn UsersRepo>,
        cache: CacheTrigger,
    ) -> Self {
        Self {
            comments,
            reviews,
            users,
            cache,
        }
    }

    pub async fn post(
        &self,
        review_id: Uuid,
        request: CreateCommentRequest,
    ) -> Result<CommentItem, AppError> {
        let body = request.body.trim().to_string();
        if body.is_empty() || body.chars().count() > MAX_COMMENT_LEN {
            return Err(AppError::validation(format!(
                "comment must be between 1 and {MAX_COMMENT_LEN} characters"
            )));
        }

        let review = self
            .reviews
            .find_review(review_id)
            .await?
            .filter(|review| review.status.is_public())
            .ok_or_else(|| AppError::not_found("review"))?;
        self.users
            .find_user(request.author_id)
            .await?
            .ok_or_else(|| AppError::validation("unknown author"))?;

        let record = self
            .comments
            .create_comment(CreateCommentParams {
                review_id,
                author_id: request.author_id,
                body,
            })
            .await?;

        self.cache.comment_posted(&review.slug).await;

        Ok(comment_item(&record))
    }

    /// Moderation: hide, restore or delete a comment.
    pub async fn update_status(
        &self,
        comment_id: Uuid,
        status: CommentStatus,
    ) -> Result<CommentItem, AppError> {
        let record = self.comments.update_comment_status(comment_id, status).await?;

        match self.reviews.find_review(record.review_id).await {
            Ok(Some(review)) => {
                self.cache.comment_status_changed(&review.slug).await;
            }
            Ok(None) => {
                tracing::warn!(
                    comment_id = %comment_id,
                    review_id = %record.review_id,
                    "comment moderated on a missing review"
                );
            }
            Err(error) => {
                // Without the slug the precise eviction is impossible, so every
                // cached review detail goes.
                tracing::warn!(
                    comment_id = %comment_id,
                    review_id = %record.review_id,
                    error = %error,
                    "parent review lookup failed after moderation"
                );
                self.cache
                    .invalidate_prefixes(&[CachePrefix::ReviewsSlug])
                    .await;
            }
        }

        Ok(comment_item(&record))
    }
}
