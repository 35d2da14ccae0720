//! Cache prefixes.
//!
//! A prefix names a class of cached views. It is both the middle segment of
//! every cache key and the unit of bulk invalidation.

use std::fmt;

/// Logical grouping of cached views.
///
/// The set is closed: a route can only cache under a variant listed here, and
/// every variant is reachable from the invalidation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CachePrefix {
    /// Newest published reviews.
    ReviewsLatest,
    /// Highest-scored published reviews.
    ReviewsPopular,
    /// Filtered, paginated review listing.
    ReviewsList,
    /// A single review addressed by slug.
    ReviewsSlug,
    /// Public user profile with review aggregates.
    UsersProfile,
    /// Reviews authored by one user.
    UsersReviews,
    /// Full-text search results.
    Search,
    /// Review sitemap.
    SitemapReviews,
    /// Category listing.
    Categories,
}

impl CachePrefix {
    pub const ALL: [CachePrefix; 9] = [
        CachePrefix::ReviewsLatest,
        CachePrefix::ReviewsPopular,
        CachePrefix::ReviewsList,
        CachePrefix::ReviewsSlug,
        CachePrefix::UsersProfile,
        CachePrefix::UsersReviews,
        CachePrefix::Search,
        CachePrefix::SitemapReviews,
        CachePrefix::Categories,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CachePrefix::ReviewsLatest => "reviews:latest",
            CachePrefix::ReviewsPopular => "reviews:popular",
            CachePrefix::ReviewsList => "reviews:list",
            CachePrefix::ReviewsSlug => "reviews:slug",
            CachePrefix::UsersProfile => "users:profile",
            CachePrefix::UsersReviews => "users:reviews",
            CachePrefix::Search => "search",
            CachePrefix::SitemapReviews => "sitemap:reviews",
            CachePrefix::Categories => "categories",
        }
    }
}

impl fmt::Display for CachePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn prefix_names_are_unique() {
        let names: HashSet<&str> = CachePrefix::ALL.iter().map(|p| p.as_str()).collect();
        assert_eq!(names.len(), CachePrefix::ALL.len());
    }

    #[test]
    fn no_prefix_is_a_segment_prefix_of_another() {
        // Bulk deletion matches `{prefix}:`; a name that extended another
        // name across a segment boundary would clear foreign entries.
        for a in CachePrefix::ALL {
            for b in CachePrefix::ALL {
                if a != b {
                    let scope = format!("{}:", a.as_str());
                    assert!(
                        !format!("{}:", b.as_str()).starts_with(&scope),
                        "{a} overlaps {b}"
                    );
                }
            }
        }
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(CachePrefix::SitemapReviews.to_string(), "sitemap:reviews");
    }
}
