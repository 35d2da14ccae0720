//! Cache key construction.
//!
//! Keys have the shape `{namespace}:{prefix}:{path}[?{query}]`. The query part
//! is canonical: parameter order and list-value order never change the key.

use std::borrow::Cow;
use std::collections::BTreeMap;

use url::form_urlencoded;

use super::prefix::CachePrefix;

/// A single query parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Scalar(String),
    List(Vec<String>),
    /// Absent value; dropped during canonicalization.
    Null,
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Scalar(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Scalar(value)
    }
}

impl From<Vec<&str>> for QueryValue {
    fn from(values: Vec<&str>) -> Self {
        QueryValue::List(values.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(values: Vec<String>) -> Self {
        QueryValue::List(values)
    }
}

impl From<u32> for QueryValue {
    fn from(value: u32) -> Self {
        QueryValue::Scalar(value.to_string())
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Scalar(value.to_string())
    }
}

impl<T: Into<QueryValue>> From<Option<T>> for QueryValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(QueryValue::Null, Into::into)
    }
}

/// Query parameters of a cached view.
///
/// Insertion order is preserved but irrelevant to [`QueryParams::canonical`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    params: Vec<(String, QueryValue)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<QueryValue>) {
        self.params.push((name.into(), value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Parse a raw request query string.
    ///
    /// Repeated names and names with a `[]` suffix become list values, so
    /// `tag=a&tag=b`, `tag[]=b&tag[]=a` and `tag=b&tag=a` all describe the same
    /// view.
    pub fn parse(raw: &str) -> Self {
        let mut grouped: BTreeMap<String, (bool, Vec<String>)> = BTreeMap::new();

        for (name, value) in form_urlencoded::parse(raw.as_bytes()) {
            let (name, bracketed) = match name.strip_suffix("[]") {
                Some(stripped) => (stripped.to_string(), true),
                None => (name.into_owned(), false),
            };
            if name.is_empty() {
                continue;
            }
            let entry = grouped.entry(name).or_default();
            entry.0 |= bracketed;
            entry.1.push(value.into_owned());
        }

        let params = grouped
            .into_iter()
            .map(|(name, (bracketed, mut values))| {
                let value = if values.len() == 1 && !bracketed {
                    QueryValue::Scalar(values.remove(0))
                } else {
                    QueryValue::List(values)
                };
                (name, value)
            })
            .collect();

        Self { params }
    }

    /// First scalar value (or first list element) for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .and_then(|(_, value)| match value {
                QueryValue::Scalar(v) => Some(v.as_str()),
                QueryValue::List(values) => values.first().map(String::as_str),
                QueryValue::Null => None,
            })
    }

    /// All values for `name`, whether it was given once or as a list.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.params
            .iter()
            .filter(|(key, _)| key == name)
            .flat_map(|(_, value)| match value {
                QueryValue::Scalar(v) => vec![v.as_str()],
                QueryValue::List(values) => values.iter().map(String::as_str).collect(),
                QueryValue::Null => Vec::new(),
            })
            .collect()
    }

    /// Canonical, percent-encoded query string.
    ///
    /// Null values are dropped, every `(name, value)` pair is sorted by name
    /// and then value, and the result is form-urlencoded.
    pub fn canonical(&self) -> String {
        let mut pairs: Vec<(&str, &str)> = Vec::new();
        for (name, value) in &self.params {
            match value {
                QueryValue::Scalar(v) => pairs.push((name.as_str(), v.as_str())),
                QueryValue::List(values) => {
                    let mut sorted: Vec<&str> = values.iter().map(String::as_str).collect();
                    sorted.sort_unstable();
                    pairs.extend(sorted.into_iter().map(|v| (name.as_str(), v)));
                }
                QueryValue::Null => {}
            }
        }
        pairs.sort_unstable();

        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish()
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<QueryValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

/// Key scope shared by every entry under `prefix`: `{namespace}:{prefix}:`.
pub fn prefix_scope(namespace: &str, prefix: CachePrefix) -> String {
    format!("{namespace}:{}:", prefix.as_str())
}

/// Build the cache key for a view.
pub fn build_key(
    namespace: &str,
    prefix: CachePrefix,
    path: &str,
    query: Option<&QueryParams>,
) -> String {
    let query: Cow<'_, str> = match query {
        Some(params) => Cow::Owned(params.canonical()),
        None => Cow::Borrowed(""),
    };

    if query.is_empty() {
        format!("{}{path}", prefix_scope(namespace, prefix))
    } else {
        format!("{}{path}?{query}", prefix_scope(namespace, prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "critica";

    #[test]
    fn key_without_query_omits_question_mark() {
        let key = build_key(NS, CachePrefix::Categories, "/categories", None);
        assert_eq!(key, "critica:categories:/categories");

        let empty = QueryParams::new().with("q", QueryValue::Null);
        let key = build_key(NS, CachePrefix::Search, "/search", Some(&empty));
        assert_eq!(key, "critica:search:/search");
    }

    #[test]
    fn parameter_order_does_not_change_key() {
        let a = QueryParams::new().with("a", 1u32).with("b", 2u32);
        let b = QueryParams::new().with("b", 2u32).with("a", 1u32);

        assert_eq!(
            build_key(NS, CachePrefix::ReviewsList, "/reviews", Some(&a)),
            build_key(NS, CachePrefix::ReviewsList, "/reviews", Some(&b)),
        );
        assert_eq!(
            build_key(NS, CachePrefix::ReviewsList, "/reviews", Some(&a)),
            "critica:reviews:list:/reviews?a=1&b=2"
        );
    }

    #[test]
    fn list_order_does_not_change_key() {
        let a = QueryParams::new().with("tags", vec!["b", "a"]);
        let b = QueryParams::new().with("tags", vec!["a", "b"]);
        assert_eq!(a.canonical(), b.canonical());
        assert_eq!(a.canonical(), "tags=a&tags=b");
    }

    #[test]
    fn null_values_are_dropped() {
        let params = QueryParams::new()
            .with("page", 2u32)
            .with("category", Option::<String>::None);
        assert_eq!(params.canonical(), "page=2");
    }

    #[test]
    fn reserved_characters_are_escaped() {
        let params = QueryParams::new().with("q", "a&b=c d");
        assert_eq!(params.canonical(), "q=a%26b%3Dc+d");
    }

    #[test]
    fn parse_groups_repeated_and_bracketed_names() {
        let repeated = QueryParams::parse("tag=b&page=1&tag=a");
        let bracketed = QueryParams::parse("page=1&tag[]=a&tag[]=b");

        assert_eq!(repeated.canonical(), bracketed.canonical());
        assert_eq!(repeated.get_all("tag"), vec!["b", "a"]);
        assert_eq!(repeated.get("page"), Some("1"));
    }

    #[test]
    fn parse_normalizes_percent_encoding() {
        let encoded = QueryParams::parse("q=%41pple");
        let plain = QueryParams::parse("q=Apple");
        assert_eq!(encoded.canonical(), plain.canonical());
    }

    #[test]
    fn parse_keeps_empty_values() {
        let params = QueryParams::parse("q=&page=3");
        assert_eq!(params.get("q"), Some(""));
        assert_eq!(params.canonical(), "page=3&q=");
    }

    #[test]
    fn scalar_and_single_element_list_share_a_key() {
        let scalar = QueryParams::parse("tag=a");
        let list = QueryParams::parse("tag[]=a");
        assert_eq!(scalar.canonical(), list.canonical());
    }

    #[test]
    fn prefix_scope_is_a_prefix_of_every_key() {
        let params = QueryParams::new().with("limit", 5u32);
        let key = build_key(NS, CachePrefix::ReviewsLatest, "/reviews/latest", Some(&params));
        assert!(key.starts_with(&prefix_scope(NS, CachePrefix::ReviewsLatest)));
    }

    #[test]
    fn collected_params_match_builder() {
        let collected: QueryParams = [("b", "2"), ("a", "1")].into_iter().collect();
        let built = QueryParams::new().with("a", "1").with("b", "2");
        assert_eq!(collected.canonical(), built.canonical());
    }
}
