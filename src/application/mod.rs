//! Application services. Each write commits through a repository before the
//! matching cache invalidation runs.

pub mod categories;
pub mod comments;
pub mod error;
pub mod repos;
pub mod reviews;
pub mod users;
pub mod votes;

pub use categories::CategoryService;
pub use comments::CommentService;
pub use reviews::{ListReviewsParams, ReviewService};
pub use users::UserService;
pub use votes::VoteService;
