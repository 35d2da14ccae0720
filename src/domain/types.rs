//! Shared domain enumerations.
//!
//! The wire crate owns these so cached JSON and stored records agree on their
//! spelling.

pub use critica_api_types::{CommentStatus, ReviewStatus, UserRole};
