//! In-process repository implementations.
//!
//! All records live behind one mutex so that joined reads (score, comment
//! count, category slug) observe a consistent snapshot.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    AuthorStats, CategoriesRepo, CommentsRepo, CreateCategoryParams, CreateCommentParams,
    CreateReviewParams, CreateUserParams, RepoError, ReviewPage, ReviewQuery, ReviewSort,
    ReviewWithStats, ReviewsRepo, UsersRepo, VotesRepo,
};
use crate::domain::entities::{
    CategoryRecord, CommentRecord, ReviewRecord, UserRecord, VoteRecord,
};
use crate::domain::types::{CommentStatus, ReviewStatus, UserRole};

#[derive(Default)]
struct Tables {
    categories: HashMap<Uuid, CategoryRecord>,
    reviews: HashMap<Uuid, ReviewRecord>,
    comments: HashMap<Uuid, CommentRecord>,
    votes: HashMap<(Uuid, Uuid), i8>,
    users: HashMap<Uuid, UserRecord>,
}

impl Tables {
    fn score(&self, review_id: Uuid) -> i64 {
        self.votes
            .iter()
            .filter(|((review, _), _)| *review == review_id)
            .map(|(_, value)| i64::from(*value))
            .sum()
    }

    fn visible_comment_count(&self, review_id: Uuid) -> u32 {
        let count = self
            .comments
            .values()
            .filter(|comment| {
                comment.review_id == review_id && comment.status == CommentStatus::Visible
            })
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    fn with_stats(&self, review: &ReviewRecord) -> ReviewWithStats {
        ReviewWithStats {
            review: review.clone(),
            category_slug: self
                .categories
                .get(&review.category_id)
                .map(|category| category.slug.clone())
                .unwrap_or_default(),
            score: self.score(review.id),
            comment_count: self.visible_comment_count(review.id),
        }
    }

    fn matches(review: &ReviewRecord, query: &ReviewQuery, needle: Option<&str>) -> bool {
        if review.status != ReviewStatus::Published {
            return false;
        }
        if query.category_id.is_some_and(|id| id != review.category_id) {
            return false;
        }
        if query.author_id.is_some_and(|id| id != review.author_id) {
            return false;
        }
        if !query.tags.iter().all(|tag| review.tags.contains(tag)) {
            return false;
        }
        match needle {
            Some(needle) => {
                review.title.to_lowercase().contains(needle)
                    || review.body.to_lowercase().contains(needle)
                    || review.tags.iter().any(|tag| tag.contains(needle))
            }
            None => true,
        }
    }
}

/// Repository adapter holding every table in process memory.
#[derive(Default)]
pub struct MemoryRepositories {
    tables: Mutex<Tables>,
}

impl MemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, RepoError> {
        self.tables
            .lock()
            .map_err(|err| RepoError::from_persistence(format!("repository lock poisoned: {err}")))
    }
}

#[async_trait]
impl CategoriesRepo for MemoryRepositories {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        let tables = self.tables()?;
        let mut categories: Vec<CategoryRecord> = tables.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.slug.cmp(&b.slug)));
        Ok(categories)
    }

    async fn find_category_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<CategoryRecord>, RepoError> {
        let tables = self.tables()?;
        Ok(tables
            .categories
            .values()
            .find(|category| category.slug == slug)
            .cloned())
    }

    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let mut tables = self.tables()?;
        if tables
            .categories
            .values()
            .any(|category| category.slug == params.slug)
        {
            return Err(RepoError::duplicate("categories_slug_key"));
        }

        let record = CategoryRecord {
            id: Uuid::new_v4(),
            slug: params.slug,
            name: params.name,
            description: params.description,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.categories.insert(record.id, record.clone());
        Ok(record)
    }
}

#[async_trait]
impl ReviewsRepo for MemoryRepositories {
    async fn create_review(&self, params: CreateReviewParams) -> Result<ReviewRecord, RepoError> {
        let mut tables = self.tables()?;
        if tables
            .reviews
            .values()
            .any(|review| review.slug == params.slug)
        {
            return Err(RepoError::duplicate("reviews_slug_key"));
        }
        if !tables.categories.contains_key(&params.category_id) {
            return Err(RepoError::InvalidInput {
                message: format!("category {} does not exist", params.category_id),
            });
        }
        if !tables.users.contains_key(&params.author_id) {
            return Err(RepoError::InvalidInput {
                message: format!("user {} does not exist", params.author_id),
            });
        }

        let now = OffsetDateTime::now_utc();
        let record = ReviewRecord {
            id: Uuid::new_v4(),
            slug: params.slug,
            title: params.title,
            body: params.body,
            rating: params.rating,
            category_id: params.category_id,
            author_id: params.author_id,
            tags: params.tags,
            status: params.status,
            created_at: now,
            updated_at: now,
        };
        tables.reviews.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_review(&self, id: Uuid) -> Result<Option<ReviewRecord>, RepoError> {
        let tables = self.tables()?;
        Ok(tables.reviews.get(&id).cloned())
    }

    async fn find_review_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ReviewWithStats>, RepoError> {
        let tables = self.tables()?;
        Ok(tables
            .reviews
            .values()
            .find(|review| review.slug == slug)
            .map(|review| tables.with_stats(review)))
    }

    async fn review_slug_exists(&self, slug: &str) -> Result<bool, RepoError> {
        let tables = self.tables()?;
        Ok(tables.reviews.values().any(|review| review.slug == slug))
    }

    async fn update_review_status(
        &self,
        id: Uuid,
        status: ReviewStatus,
    ) -> Result<ReviewRecord, RepoError> {
        let mut tables = self.tables()?;
        let review = tables.reviews.get_mut(&id).ok_or(RepoError::NotFound)?;
        review.status = status;
        review.updated_at = OffsetDateTime::now_utc();
        Ok(review.clone())
    }

    async fn list_reviews(&self, query: &ReviewQuery) -> Result<ReviewPage, RepoError> {
        let tables = self.tables()?;
        let needle = query
            .text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_lowercase);

        let mut items: Vec<ReviewWithStats> = tables
            .reviews
            .values()
            .filter(|review| Tables::matches(review, query, needle.as_deref()))
            .map(|review| tables.with_stats(review))
            .collect();

        match query.sort {
            ReviewSort::Latest => items.sort_by_key(|item| {
                (Reverse(item.review.created_at), item.review.slug.clone())
            }),
            ReviewSort::Popular => items.sort_by_key(|item| {
                (
                    Reverse(item.score),
                    Reverse(item.review.created_at),
                    item.review.slug.clone(),
                )
            }),
            ReviewSort::Rating => items.sort_by_key(|item| {
                (
                    Reverse(item.review.rating),
                    Reverse(item.review.created_at),
                    item.review.slug.clone(),
                )
            }),
        }

        let total = items.len() as u64;
        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
        let items = items.into_iter().skip(offset).take(limit).collect();

        Ok(ReviewPage { items, total })
    }

    async fn author_stats(&self, author_id: Uuid) -> Result<AuthorStats, RepoError> {
        let tables = self.tables()?;
        let mut stats = AuthorStats::default();
        for review in tables.reviews.values().filter(|review| {
            review.author_id == author_id && review.status == ReviewStatus::Published
        }) {
            stats.review_count += 1;
            stats.total_score += tables.score(review.id);
        }
        Ok(stats)
    }
}

#[async_trait]
impl CommentsRepo for MemoryRepositories {
    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut tables = self.tables()?;
        if !tables.reviews.contains_key(&params.review_id) {
            return Err(RepoError::NotFound);
        }

        let record = CommentRecord {
            id: Uuid::new_v4(),
            review_id: params.review_id,
            author_id: params.author_id,
            body: params.body,
            status: CommentStatus::Visible,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.comments.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError> {
        let tables = self.tables()?;
        Ok(tables.comments.get(&id).cloned())
    }

    async fn update_comment_status(
        &self,
        id: Uuid,
        status: CommentStatus,
    ) -> Result<CommentRecord, RepoError> {
        let mut tables = self.tables()?;
        let comment = tables.comments.get_mut(&id).ok_or(RepoError::NotFound)?;
        comment.status = status;
        Ok(comment.clone())
    }

    async fn list_comments(
        &self,
        review_id: Uuid,
        status: Option<CommentStatus>,
    ) -> Result<Vec<CommentRecord>, RepoError> {
        let tables = self.tables()?;
        let mut comments: Vec<CommentRecord> = tables
            .comments
            .values()
            .filter(|comment| comment.review_id == review_id)
            .filter(|comment| status.is_none_or(|status| comment.status == status))
            .cloned()
            .collect();
        comments.sort_by_key(|comment| (comment.created_at, comment.id));
        Ok(comments)
    }
}

#[async_trait]
impl VotesRepo for MemoryRepositories {
    async fn upsert_vote(&self, vote: VoteRecord) -> Result<(), RepoError> {
        let mut tables = self.tables()?;
        if !tables.reviews.contains_key(&vote.review_id) {
            return Err(RepoError::NotFound);
        }
        tables
            .votes
            .insert((vote.review_id, vote.user_id), vote.value);
        Ok(())
    }

    async fn review_score(&self, review_id: Uuid) -> Result<i64, RepoError> {
        let tables = self.tables()?;
        Ok(tables.score(review_id))
    }
}

#[async_trait]
impl UsersRepo for MemoryRepositories {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut tables = self.tables()?;
        if tables
            .users
            .values()
            .any(|user| user.username.eq_ignore_ascii_case(&params.username))
        {
            return Err(RepoError::duplicate("users_username_key"));
        }

        let record = UserRecord {
            id: Uuid::new_v4(),
            username: params.username,
            role: params.role,
            joined_at: OffsetDateTime::now_utc(),
        };
        tables.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        let tables = self.tables()?;
        Ok(tables.users.get(&id).cloned())
    }

    async fn update_user_role(&self, id: Uuid, role: UserRole) -> Result<UserRecord, RepoError> {
        let mut tables = self.tables()?;
        let user = tables.users.get_mut(&id).ok_or(RepoError::NotFound)?;
        user.role = role;
        Ok(user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed(repos: &MemoryRepositories) -> (CategoryRecord, UserRecord) {
        let category = repos
            .create_category(CreateCategoryParams {
                slug: "home".to_string(),
                name: "Home".to_string(),
                description: None,
            })
            .await
            .expect("category");
        let user = repos
            .create_user(CreateUserParams {
                username: "tester".to_string(),
                role: UserRole::Member,
            })
            .await
            .expect("user");
        (category, user)
    }

    fn review_params(slug: &str, category: &CategoryRecord, user: &UserRecord) -> CreateReviewParams {
        CreateReviewParams {
            slug: slug.to_string(),
            title: slug.replace('-', " "),
            body: format!("body of {slug}"),
            rating: 4,
            category_id: category.id,
            author_id: user.id,
            tags: vec!["budget".to_string()],
            status: ReviewStatus::Published,
        }
    }

    #[tokio::test]
    async fn duplicate_review_slug_is_rejected() {
        let repos = MemoryRepositories::new();
        let (category, user) = seed(&repos).await;

        repos
            .create_review(review_params("robot-mop", &category, &user))
            .await
            .expect("first review");
        let err = repos
            .create_review(review_params("robot-mop", &category, &user))
            .await
            .expect_err("duplicate slug");

        assert!(matches!(err, RepoError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn listing_excludes_unpublished_reviews() {
        let repos = MemoryRepositories::new();
        let (category, user) = seed(&repos).await;

        let hidden = repos
            .create_review(review_params("hidden-one", &category, &user))
            .await
            .expect("review");
        repos
            .create_review(review_params("visible-one", &category, &user))
            .await
            .expect("review");
        repos
            .update_review_status(hidden.id, ReviewStatus::Hidden)
            .await
            .expect("status");

        let page = repos
            .list_reviews(&ReviewQuery {
                limit: 10,
                ..Default::default()
            })
            .await
            .expect("list");

        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].review.slug, "visible-one");
    }

    #[tokio::test]
    async fn revote_replaces_previous_vote() {
        let repos = MemoryRepositories::new();
        let (category, user) = seed(&repos).await;
        let review = repos
            .create_review(review_params("robot-mop", &category, &user))
            .await
            .expect("review");

        for value in [1, -1] {
            repos
                .upsert_vote(VoteRecord {
                    review_id: review.id,
                    user_id: user.id,
                    value,
                })
                .await
                .expect("vote");
        }

        assert_eq!(repos.review_score(review.id).await.expect("score"), -1);
    }

    #[tokio::test]
    async fn popular_sort_orders_by_score() {
        let repos = MemoryRepositories::new();
        let (category, user) = seed(&repos).await;
        repos
            .create_review(review_params("plain", &category, &user))
            .await
            .expect("review");
        let liked = repos
            .create_review(review_params("liked", &category, &user))
            .await
            .expect("review");
        repos
            .upsert_vote(VoteRecord {
                review_id: liked.id,
                user_id: user.id,
                value: 1,
            })
            .await
            .expect("vote");

        let page = repos
            .list_reviews(&ReviewQuery {
                sort: ReviewSort::Popular,
                limit: 10,
                ..Default::default()
            })
            .await
            .expect("list");

        assert_eq!(page.items[0].review.slug, "liked");
        assert_eq!(page.items[0].score, 1);
    }

    #[tokio::test]
    async fn text_search_matches_title_body_and_tags() {
        let repos = MemoryRepositories::new();
        let (category, user) = seed(&repos).await;
        repos
            .create_review(review_params("great-vacuum-2024", &category, &user))
            .await
            .expect("review");

        for text in ["VACUUM", "body of", "budget"] {
            let page = repos
                .list_reviews(&ReviewQuery {
                    text: Some(text.to_string()),
                    limit: 10,
                    ..Default::default()
                })
                .await
                .expect("search");
            assert_eq!(page.total, 1, "{text} should match");
        }
    }

    #[tokio::test]
    async fn comment_count_only_includes_visible_comments() {
        let repos = MemoryRepositories::new();
        let (category, user) = seed(&repos).await;
        let review = repos
            .create_review(review_params("robot-mop", &category, &user))
            .await
            .expect("review");

        let first = repos
            .create_comment(CreateCommentParams {
                review_id: review.id,
                author_id: user.id,
                body: "nice".to_string(),
            })
            .await
            .expect("comment");
        repos
            .create_comment(CreateCommentParams {
                review_id: review.id,
                author_id: user.id,
                body: "agreed".to_string(),
            })
            .await
            .expect("comment");
        repos
            .update_comment_status(first.id, CommentStatus::Hidden)
            .await
            .expect("moderate");

        let stored = repos
            .find_review_by_slug("robot-mop")
            .await
            .expect("lookup")
            .expect("review exists");
        assert_eq!(stored.comment_count, 1);
        assert_eq!(stored.category_slug, "home");
    }

    #[tokio::test]
    async fn usernames_are_unique_case_insensitively() {
        let repos = MemoryRepositories::new();
        seed(&repos).await;

        let err = repos
            .create_user(CreateUserParams {
                username: "TESTER".to_string(),
                role: UserRole::Member,
            })
            .await
            .expect_err("duplicate username");
        assert!(matches!(err, RepoError::Duplicate { .. }));
    }
}
