use std::sync::Arc;

use critica_api_types::{CastVoteRequest, VoteResponse};
use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::repos::{ReviewsRepo, UsersRepo, VotesRepo};
use crate::cache::CacheTrigger;
use crate::domain::entities::VoteRecord;

#[derive(Clone)]
pub struct VoteService {
    votes: Arc<dyn VotesRepo>,
    reviews: Arc<dyn ReviewsRepo>,
    users: Arc<dyn UsersRepo>,
    cache: CacheTrigger,
}

impl VoteService {
    pub fn new(
        votes: Arc<dyn VotesRepo>,
        reviews: Arc<dyn ReviewsRepo>,
        users: Arc<dyn UsersRepo>,
        cache: CacheTrigger,
    ) -> Self {
        Self {
            votes,
            reviews,
            users,
            cache,
        }
    }

    /// Record or replace the user's vote and return the new score.
    pub async fn cast(
        &self,
        review_id: Uuid,
        request: CastVoteRequest,
    ) -> Result<VoteResponse, AppError> {
        if request.value != 1 && request.value != -1 {
            return Err(AppError::validation("vote value must be 1 or -1"));
        }

        let review = self
            .reviews
            .find_review(review_id)
            .await?
            .filter(|review| review.status.is_public())
            .ok_or_else(|| AppError::not_found("review"))?;
        self.users
            .find_user(request.user_id)
            .await?
            .ok_or_else(|| AppError::validation("unknown user"))?;

        self.votes
            .upsert_vote(VoteRecord {
                review_id,
                user_id: request.user_id,
                value: request.value,
            })
            .await?;
        self.cache.vote_cast(&review.slug).await;

        let score = self.votes.review_score(review_id).await?;
        Ok(VoteResponse { review_id, score })
    }
}
