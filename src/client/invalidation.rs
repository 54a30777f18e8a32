//! Mutation → cache invalidation rules.
//!
//! Each [`InvalidationRule`] pairs a set of HTTP methods and a route pattern
//! (`/posts/:id/like`) with the cache prefixes a successful call must purge.
//! All matching rules apply. The table is a plain lookup list, like the
//! policy table, and is fixed once the client is built.

use crate::types::Method;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param,
}

/// Route pattern matched segment by segment.
///
/// `:name` and `*` match any single non-empty segment; everything else must
/// match literally. Query strings are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    pub fn parse(pattern: &str) -> Self {
        let segments = split_path(pattern)
            .map(|s| {
                if s == "*" || s.starts_with(':') {
                    Segment::Param
                } else {
                    Segment::Literal(s.to_string())
                }
            })
            .collect();
        Self {
            raw: pattern.to_string(),
            segments,
        }
    }

    pub fn matches(&self, endpoint: &str) -> bool {
        let mut parts = split_path(endpoint);
        for segment in &self.segments {
            match (segment, parts.next()) {
                (Segment::Param, Some(_)) => {}
                (Segment::Literal(lit), Some(part)) if lit == part => {}
                _ => return false,
            }
        }
        parts.next().is_none()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

fn split_path(endpoint: &str) -> impl Iterator<Item = &str> {
    let path = endpoint.split(['?', '#']).next().unwrap_or_default();
    path.split('/').filter(|s| !s.is_empty())
}

/// Strip the query string and fragment from an endpoint.
pub(crate) fn path_of(endpoint: &str) -> &str {
    endpoint.split(['?', '#']).next().unwrap_or(endpoint)
}

/// Cache prefixes to purge after a successful mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationRule {
    pub methods: Vec<Method>,
    pub route: RoutePattern,
    pub prefixes: Vec<String>,
}

impl InvalidationRule {
    pub fn new(methods: &[Method], route: &str, prefixes: &[&str]) -> Self {
        Self {
            methods: methods.to_vec(),
            route: RoutePattern::parse(route),
            prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn applies_to(&self, method: &Method, endpoint: &str) -> bool {
        self.methods.contains(method) && self.route.matches(endpoint)
    }
}

/// Ordered set of invalidation rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationTable {
    rules: Vec<InvalidationRule>,
}

impl InvalidationTable {
    pub fn new(rules: Vec<InvalidationRule>) -> Self {
        Self { rules }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn push(&mut self, rule: InvalidationRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[InvalidationRule] {
        &self.rules
    }

    /// Prefixes to purge after a successful `method` call to `endpoint`.
    ///
    /// Always includes the mutated resource's own path, followed by the
    /// prefixes of every matching rule, without duplicates.
    pub fn prefixes_for(&self, method: &Method, endpoint: &str) -> Vec<String> {
        let mut prefixes = vec![path_of(endpoint).to_string()];
        for rule in self.rules.iter().filter(|r| r.applies_to(method, endpoint)) {
            for prefix in &rule.prefixes {
                if !prefixes.contains(prefix) {
                    prefixes.push(prefix.clone());
                }
            }
        }
        prefixes
    }
}

impl Default for InvalidationTable {
    /// Rules for the DevSocial backend.
    fn default() -> Self {
        let feed_writes = ["/posts", "/dashboard", "/users/profile"];
        Self::new(vec![
            InvalidationRule::new(&[Method::POST], "/posts", &feed_writes),
            InvalidationRule::new(&[Method::PUT, Method::PATCH], "/posts/:id", &feed_writes),
            InvalidationRule::new(&[Method::DELETE], "/posts/:id", &feed_writes),
            InvalidationRule::new(
                &[Method::POST],
                "/posts/:id/like",
                &["/posts", "/dashboard", "/leaderboard"],
            ),
            InvalidationRule::new(
                &[Method::POST, Method::DELETE],
                "/posts/:id/comments",
                &["/posts", "/dashboard"],
            ),
            InvalidationRule::new(&[Method::PUT, Method::PATCH], "/users/profile", &["/users"]),
            InvalidationRule::new(
                &[Method::POST, Method::DELETE],
                "/users/:id/follow",
                &["/users", "/posts", "/dashboard"],
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_pattern_matching() {
        let like = RoutePattern::parse("/posts/:id/like");
        assert!(like.matches("/posts/42/like"));
        assert!(like.matches("/posts/42/like?x=1"));
        assert!(!like.matches("/posts/42"));
        assert!(!like.matches("/posts/42/like/extra"));
        assert!(!like.matches("/users/42/like"));

        let wildcard = RoutePattern::parse("/users/*/follow");
        assert!(wildcard.matches("/users/ada/follow"));

        let root = RoutePattern::parse("/posts");
        assert!(root.matches("/posts"));
        assert!(root.matches("/posts/"));
        assert!(!root.matches("/posts/1"));
    }

    #[test]
    fn like_purges_feed_and_dashboard() {
        let table = InvalidationTable::default();
        let prefixes = table.prefixes_for(&Method::POST, "/posts/abc/like");
        assert!(prefixes.contains(&"/posts".to_string()));
        assert!(prefixes.contains(&"/dashboard".to_string()));
        assert!(prefixes.contains(&"/leaderboard".to_string()));
    }

    #[test]
    fn method_must_match() {
        let table = InvalidationTable::default();
        // GET on a mutation route never matches a rule; only the own path remains
        assert_eq!(
            table.prefixes_for(&Method::GET, "/posts/abc/like"),
            vec!["/posts/abc/like".to_string()]
        );
    }

    #[test]
    fn own_path_is_always_purged() {
        let table = InvalidationTable::empty();
        assert_eq!(
            table.prefixes_for(&Method::DELETE, "/notifications/7?soft=true"),
            vec!["/notifications/7".to_string()]
        );
    }

    #[test]
    fn prefixes_are_deduplicated() {
        let table = InvalidationTable::default();
        let prefixes = table.prefixes_for(&Method::POST, "/posts");
        let posts = prefixes.iter().filter(|p| *p == "/posts").count();
        assert_eq!(posts, 1);
        assert_eq!(prefixes.len(), 3);
    }
}
