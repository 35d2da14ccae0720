//! Invalidation table and plans.
//!
//! Every write declares what it can stale through [`MutationKind`]. The bulk
//! half of that declaration is a static table; the precise half (single detail
//! views) is derived from the mutation's data.

use std::collections::BTreeSet;
use std::fmt;

use super::prefix::CachePrefix;

/// Prefixes touched by anything that changes review listings.
const REVIEW_LISTS: &[CachePrefix] = &[
    CachePrefix::ReviewsLatest,
    CachePrefix::ReviewsPopular,
    CachePrefix::ReviewsList,
];

const REVIEW_STATUS_CHANGED: &[CachePrefix] = &[
    CachePrefix::ReviewsLatest,
    CachePrefix::ReviewsPopular,
    CachePrefix::ReviewsList,
    CachePrefix::Search,
    CachePrefix::SitemapReviews,
    CachePrefix::UsersProfile,
    CachePrefix::UsersReviews,
];

/// Kinds of write that can stale cached views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// A review was published, hidden or deleted.
    ReviewStatusChanged,
    ReviewCreated,
    CommentStatusChanged,
    CommentPosted,
    VoteCast,
    /// No cached view currently depends on roles.
    UserRoleChanged,
    CategoryChanged,
}

impl MutationKind {
    pub const ALL: [MutationKind; 7] = [
        MutationKind::ReviewStatusChanged,
        MutationKind::ReviewCreated,
        MutationKind::CommentStatusChanged,
        MutationKind::CommentPosted,
        MutationKind::VoteCast,
        MutationKind::UserRoleChanged,
        MutationKind::CategoryChanged,
    ];

    /// Prefixes cleared wholesale by this kind of write.
    pub fn bulk_prefixes(self) -> &'static [CachePrefix] {
        match self {
            MutationKind::ReviewStatusChanged => REVIEW_STATUS_CHANGED,
            MutationKind::ReviewCreated => REVIEW_LISTS,
            MutationKind::CommentStatusChanged => &[],
            MutationKind::CommentPosted => REVIEW_LISTS,
            MutationKind::VoteCast => REVIEW_LISTS,
            MutationKind::UserRoleChanged => &[],
            MutationKind::CategoryChanged => &[CachePrefix::Categories],
        }
    }

    /// Whether this kind evicts the detail view of the affected review.
    pub fn evicts_review_detail(self) -> bool {
        matches!(
            self,
            MutationKind::ReviewStatusChanged
                | MutationKind::CommentStatusChanged
                | MutationKind::CommentPosted
                | MutationKind::VoteCast
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MutationKind::ReviewStatusChanged => "review_status_changed",
            MutationKind::ReviewCreated => "review_created",
            MutationKind::CommentStatusChanged => "comment_status_changed",
            MutationKind::CommentPosted => "comment_posted",
            MutationKind::VoteCast => "vote_cast",
            MutationKind::UserRoleChanged => "user_role_changed",
            MutationKind::CategoryChanged => "category_changed",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A committed write, carrying what its precise evictions need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    ReviewStatusChanged { slug: String },
    ReviewCreated,
    /// `review_slug` is the parent review of the moderated comment.
    CommentStatusChanged { review_slug: String },
    CommentPosted { review_slug: String },
    VoteCast { review_slug: String },
    UserRoleChanged,
    CategoryChanged,
}

impl Mutation {
    pub fn kind(&self) -> MutationKind {
        match self {
            Mutation::ReviewStatusChanged { .. } => MutationKind::ReviewStatusChanged,
            Mutation::ReviewCreated => MutationKind::ReviewCreated,
            Mutation::CommentStatusChanged { .. } => MutationKind::CommentStatusChanged,
            Mutation::CommentPosted { .. } => MutationKind::CommentPosted,
            Mutation::VoteCast { .. } => MutationKind::VoteCast,
            Mutation::UserRoleChanged => MutationKind::UserRoleChanged,
            Mutation::CategoryChanged => MutationKind::CategoryChanged,
        }
    }

    /// Slug of the review whose detail view this write stales.
    pub fn review_slug(&self) -> Option<&str> {
        match self {
            Mutation::ReviewStatusChanged { slug } => Some(slug),
            Mutation::CommentStatusChanged { review_slug }
            | Mutation::CommentPosted { review_slug }
            | Mutation::VoteCast { review_slug } => Some(review_slug),
            Mutation::ReviewCreated | Mutation::UserRoleChanged | Mutation::CategoryChanged => None,
        }
    }
}

/// Request path of a review's detail view.
pub fn review_detail_path(slug: &str) -> String {
    format!("/reviews/slug/{slug}")
}

/// A precise eviction: one view addressed by prefix and path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ViewKey {
    pub prefix: CachePrefix,
    pub path: String,
}

/// Deduplicated set of evictions for one or more writes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InvalidationPlan {
    pub prefixes: BTreeSet<CachePrefix>,
    pub keys: BTreeSet<ViewKey>,
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InvalidationPlan {{ prefixes: {}, keys: {} }}",
            self.prefixes.len(),
            self.keys.len()
        )
    }
}

impl InvalidationPlan {
    pub fn for_mutation(mutation: &Mutation) -> Self {
        let kind = mutation.kind();
        let mut plan = Self::default();
        plan.prefixes.extend(kind.bulk_prefixes().iter().copied());

        if kind.evicts_review_detail()
            && let Some(slug) = mutation.review_slug()
        {
            plan.keys.insert(ViewKey {
                prefix: CachePrefix::ReviewsSlug,
                path: review_detail_path(slug),
            });
        }

        plan.prune();
        plan
    }

    pub fn from_mutations<'a>(mutations: impl IntoIterator<Item = &'a Mutation>) -> Self {
        mutations
            .into_iter()
            .fold(Self::default(), |mut plan, mutation| {
                plan.merge(Self::for_mutation(mutation));
                plan
            })
    }

    pub fn merge(&mut self, other: InvalidationPlan) {
        self.prefixes.extend(other.prefixes);
        self.keys.extend(other.keys);
        self.prune();
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty() && self.keys.is_empty()
    }

    /// Drop precise keys already covered by a bulk prefix.
    fn prune(&mut self) {
        let prefixes = &self.prefixes;
        self.keys.retain(|key| !prefixes.contains(&key.prefix));
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn slugged(kind: MutationKind) -> Mutation {
        let slug = "great-vacuum-2024".to_string();
        match kind {
            MutationKind::ReviewStatusChanged => Mutation::ReviewStatusChanged { slug },
            MutationKind::ReviewCreated => Mutation::ReviewCreated,
            MutationKind::CommentStatusChanged => Mutation::CommentStatusChanged { review_slug: slug },
            MutationKind::CommentPosted => Mutation::CommentPosted { review_slug: slug },
            MutationKind::VoteCast => Mutation::VoteCast { review_slug: slug },
            MutationKind::UserRoleChanged => Mutation::UserRoleChanged,
            MutationKind::CategoryChanged => Mutation::CategoryChanged,
        }
    }

    fn prefixes(kind: MutationKind) -> HashSet<CachePrefix> {
        kind.bulk_prefixes().iter().copied().collect()
    }

    #[test]
    fn review_status_change_clears_every_review_derived_view() {
        let expected: HashSet<_> = [
            CachePrefix::ReviewsLatest,
            CachePrefix::ReviewsPopular,
            CachePrefix::ReviewsList,
            CachePrefix::Search,
            CachePrefix::SitemapReviews,
            CachePrefix::UsersProfile,
            CachePrefix::UsersReviews,
        ]
        .into_iter()
        .collect();
        assert_eq!(prefixes(MutationKind::ReviewStatusChanged), expected);

        let plan = InvalidationPlan::for_mutation(&slugged(MutationKind::ReviewStatusChanged));
        assert_eq!(
            plan.keys.into_iter().collect::<Vec<_>>(),
            vec![ViewKey {
                prefix: CachePrefix::ReviewsSlug,
                path: "/reviews/slug/great-vacuum-2024".to_string(),
            }]
        );
    }

    #[test]
    fn list_affecting_writes_share_the_list_prefixes() {
        let lists: HashSet<_> = REVIEW_LISTS.iter().copied().collect();
        for kind in [
            MutationKind::ReviewCreated,
            MutationKind::CommentPosted,
            MutationKind::VoteCast,
        ] {
            assert_eq!(prefixes(kind), lists, "{kind}");
        }
    }

    #[test]
    fn precise_evictions_follow_the_table() {
        let expected_detail = [
            (MutationKind::ReviewStatusChanged, true),
            (MutationKind::ReviewCreated, false),
            (MutationKind::CommentStatusChanged, true),
            (MutationKind::CommentPosted, true),
            (MutationKind::VoteCast, true),
            (MutationKind::UserRoleChanged, false),
            (MutationKind::CategoryChanged, false),
        ];
        for (kind, evicts) in expected_detail {
            let plan = InvalidationPlan::for_mutation(&slugged(kind));
            assert_eq!(!plan.keys.is_empty(), evicts, "{kind}");
        }
    }

    #[test]
    fn comment_moderation_only_touches_the_detail_view() {
        let plan = InvalidationPlan::for_mutation(&slugged(MutationKind::CommentStatusChanged));
        assert!(plan.prefixes.is_empty());
        assert_eq!(plan.keys.len(), 1);
    }

    #[test]
    fn role_change_invalidates_nothing() {
        assert!(InvalidationPlan::for_mutation(&Mutation::UserRoleChanged).is_empty());
    }

    #[test]
    fn every_prefix_is_reachable_from_some_mutation() {
        let mut covered: HashSet<CachePrefix> = HashSet::new();
        for kind in MutationKind::ALL {
            let plan = InvalidationPlan::for_mutation(&slugged(kind));
            covered.extend(plan.prefixes);
            covered.extend(plan.keys.into_iter().map(|key| key.prefix));
        }

        for prefix in CachePrefix::ALL {
            assert!(covered.contains(&prefix), "{prefix} is never invalidated");
        }
    }

    #[test]
    fn merged_plans_deduplicate() {
        let mutations = vec![
            Mutation::VoteCast {
                review_slug: "a".to_string(),
            },
            Mutation::VoteCast {
                review_slug: "a".to_string(),
            },
            Mutation::CommentPosted {
                review_slug: "b".to_string(),
            },
            Mutation::ReviewCreated,
        ];
        let plan = InvalidationPlan::from_mutations(&mutations);

        assert_eq!(plan.prefixes.len(), 3);
        assert_eq!(plan.keys.len(), 2);
        assert_eq!(plan.to_string(), "InvalidationPlan { prefixes: 3, keys: 2 }");
    }

    #[test]
    fn keys_under_a_cleared_prefix_are_pruned() {
        let mut plan = InvalidationPlan::for_mutation(&slugged(MutationKind::VoteCast));
        plan.merge(InvalidationPlan {
            prefixes: [CachePrefix::ReviewsSlug].into_iter().collect(),
            keys: BTreeSet::new(),
        });

        assert!(plan.keys.is_empty());
        assert!(plan.prefixes.contains(&CachePrefix::ReviewsSlug));
    }
}
