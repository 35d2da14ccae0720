use std::sync::Arc;

use crate::application::repos::{CategoriesRepo, CommentsRepo, ReviewsRepo, UsersRepo, VotesRepo};
use crate::application::{
    CategoryService, CommentService, ReviewService, UserService, VoteService,
};
use crate::cache::CacheState;

#[derive(Clone)]
pub struct ApiState {
    pub categories: Arc<CategoryService>,
    pub reviews: Arc<ReviewService>,
    pub comments: Arc<CommentService>,
    pub votes: Arc<VoteService>,
    pub users: Arc<UserService>,
    pub cache: CacheState,
}

impl ApiState {
    /// Wire every service to one repository adapter and the shared cache.
    pub fn new<R>(repositories: Arc<R>, cache: CacheState) -> Self
    where
        R: CategoriesRepo + ReviewsRepo + CommentsRepo + VotesRepo + UsersRepo + 'static,
    {
        let categories_repo: Arc<dyn CategoriesRepo> = repositories.clone();
        let reviews_repo: Arc<dyn ReviewsRepo> = repositories.clone();
        let comments_repo: Arc<dyn CommentsRepo> = repositories.clone();
        let votes_repo: Arc<dyn VotesRepo> = repositories.clone();
        let users_repo: Arc<dyn UsersRepo> = repositories;
        let trigger = cache.trigger();

        Self {
            categories: Arc::new(CategoryService::new(categories_repo.clone(), trigger.clone())),
            reviews: Arc::new(ReviewService::new(
                reviews_repo.clone(),
                categories_repo,
                comments_repo.clone(),
                users_repo.clone(),
                trigger.clone(),
            )),
            comments: Arc::new(CommentService::new(
                comments_repo,
                reviews_repo.clone(),
                users_repo.clone(),
                trigger.clone(),
            )),
            votes: Arc::new(VoteService::new(
                votes_repo,
                reviews_repo.clone(),
                users_repo.clone(),
                trigger.clone(),
            )),
            users: Arc::new(UserService::new(users_repo, reviews_repo, trigger)),
            cache,
        }
    }
}
