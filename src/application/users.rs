use std::sync::Arc;

use critica_api_types::{CreateUserRequest, UserProfile};
use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::repos::{CreateUserParams, ReviewsRepo, UsersRepo};
use crate::cache::CacheTrigger;
use crate::domain::entities::UserRecord;
use crate::domain::types::UserRole;

const MIN_USERNAME_LEN: usize = 3;
const MAX_USERNAME_LEN: usize = 32;

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UsersRepo>,
    reviews: Arc<dyn ReviewsRepo>,
    cache: CacheTrigger,
}

impl UserService {
    pub fn new(users: Arc<dyn UsersRepo>, reviews: Arc<dyn ReviewsRepo>, cache: CacheTrigger) -> Self {
        Self {
            users,
            reviews,
            cache,
        }
    }

    pub async fn register(&self, request: CreateUserRequest) -> Result<UserProfile, AppError> {
        let username = request.username.trim().to_string();
        validate_username(&username)?;

        let record = self
            .users
            .create_user(CreateUserParams {
                username,
                role: UserRole::Member,
            })
            .await?;

        Ok(profile(&record, 0, 0))
    }

    pub async fn profile(&self, id: Uuid) -> Result<UserProfile, AppError> {
        let record = self
            .users
            .find_user(id)
            .await?
            .ok_or_else(|| AppError::not_found("user"))?;
        let stats = self.reviews.author_stats(id).await?;
        Ok(profile(&record, stats.review_count, stats.total_score))
    }

    pub async fn update_role(&self, id: Uuid, role: UserRole) -> Result<UserProfile, AppError> {
        let record = self.users.update_user_role(id, role).await?;

        // Role changes map to an empty invalidation plan; cached profiles age out by TTL.
        self.cache.user_role_changed().await;

        let stats = self.reviews.author_stats(id).await?;
        Ok(profile(&record, stats.review_count, stats.total_score))
    }
}

fn validate_username(username: &str) -> Result<(), AppError> {
    let len = username.chars().count();
    let well_formed = (MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len)
        && username
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
    if well_formed {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "username must be {MIN_USERNAME_LEN}-{MAX_USERNAME_LEN} characters of letters, digits, `_` or `-`"
        )))
    }
}

fn profile(record: &UserRecord, review_count: u32, total_score: i64) -> UserProfile {
    UserProfile {
        id: record.id,
        username: record.username.clone(),
        role: record.role,
        review_count,
        total_score,
        joined_at: record.joined_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_are_validated() {
        assert!(validate_username("reviewer_1").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"x".repeat(MAX_USERNAME_LEN + 1)).is_err());
    }
}
