//! Trie node implementation.
//!
//! Each [`Node`] owns one path segment. Literal children are kept sorted for
//! binary search; a node has at most one parameter child or one wildcard
//! child, never both.

use std::fmt;

use crate::error::RouteError;
use crate::params::Params;

/// A parsed segment of a route pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment<'p> {
    /// Exact text, e.g. `user`.
    Static(&'p str),
    /// Named parameter including the leading colon, e.g. `:id`.
    Param(&'p str),
    /// Bare `*`.
    Wildcard,
}

impl<'p> Segment<'p> {
    fn classify(pattern: &str, raw: &'p str) -> Result<Self, RouteError> {
        let invalid = || RouteError::InvalidSegment {
            pattern: pattern.to_string(),
            segment: raw.to_string(),
        };

        if raw == "*" {
            return Ok(Self::Wildcard);
        }
        if raw.contains('*') {
            return Err(invalid());
        }
        if let Some(name) = raw.strip_prefix(':') {
            if name.is_empty() || name.contains(':') {
                return Err(invalid());
            }
            return Ok(Self::Param(raw));
        }
        Ok(Self::Static(raw))
    }
}

/// Splits a route pattern into validated segments.
///
/// The root pattern `/` yields no segments.
pub(crate) fn parse_pattern(pattern: &str) -> Result<Vec<Segment<'_>>, RouteError> {
    if pattern.is_empty() {
        return Err(RouteError::EmptyPattern);
    }
    if !pattern.starts_with('/') {
        return Err(RouteError::MissingLeadingSlash {
            pattern: pattern.to_string(),
        });
    }
    if pattern == "/" {
        return Ok(Vec::new());
    }
    if pattern.ends_with('/') {
        return Err(RouteError::TrailingSlash {
            pattern: pattern.to_string(),
        });
    }

    pattern[1..]
        .split('/')
        .map(|raw| {
            if raw.is_empty() {
                Err(RouteError::EmptySegment {
                    pattern: pattern.to_string(),
                })
            } else {
                Segment::classify(pattern, raw)
            }
        })
        .collect()
}

/// Kind of segment a node matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// Literal text.
    Static,
    /// Named parameter; holds the name without the colon.
    Param(String),
    /// Single-segment wildcard.
    Wildcard,
}

/// A node in the routing trie.
///
/// A node with no handler is an intermediate node: it is reachable by lookup
/// but has nothing bound to it.
#[derive(Clone)]
pub struct Node<H> {
    segment: String,
    kind: SegmentKind,
    handler: Option<H>,
    route: Option<String>,
    static_children: Vec<Node<H>>,
    param_child: Option<Box<Node<H>>>,
    wildcard_child: Option<Box<Node<H>>>,
}

impl<H> Node<H> {
    fn new(segment: impl Into<String>, kind: SegmentKind) -> Self {
        Self {
            segment: segment.into(),
            kind,
            handler: None,
            route: None,
            static_children: Vec::new(),
            param_child: None,
            wildcard_child: None,
        }
    }

    /// Creates the root node of a method tree, representing `/`.
    #[must_use]
    pub fn root() -> Self {
        Self::new("/", SegmentKind::Static)
    }

    /// The segment text as registered (`user`, `:id` or `*`).
    #[must_use]
    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// The kind of segment this node matches.
    #[must_use]
    pub fn kind(&self) -> &SegmentKind {
        &self.kind
    }

    /// The bound handler, if this node terminates a registered route.
    #[must_use]
    pub fn handler(&self) -> Option<&H> {
        self.handler.as_ref()
    }

    /// The full pattern registered for this node.
    #[must_use]
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    /// Checks whether `segments` could be inserted without a conflict.
    ///
    /// Walks only the part of the trie that already exists; once the pattern
    /// leaves existing nodes every remaining segment is new and cannot clash.
    pub(crate) fn check(&self, segments: &[Segment<'_>], pattern: &str) -> Result<(), RouteError> {
        let mut node = self;
        for segment in segments {
            let next = match *segment {
                Segment::Static(text) => node.find_static_child(text),
                Segment::Param(raw) => {
                    if node.wildcard_child.is_some() {
                        return Err(RouteError::WildcardConflict {
                            pattern: pattern.to_string(),
                            segment: raw.to_string(),
                        });
                    }
                    match node.param_child.as_deref() {
                        Some(child) if child.segment != raw => {
                            return Err(RouteError::ParamNameConflict {
                                pattern: pattern.to_string(),
                                existing: child.segment.clone(),
                                new: raw.to_string(),
                            });
                        }
                        other => other,
                    }
                }
                Segment::Wildcard => {
                    if let Some(param) = node.param_child.as_deref() {
                        return Err(RouteError::ParamConflict {
                            pattern: pattern.to_string(),
                            existing: param.segment.clone(),
                        });
                    }
                    node.wildcard_child.as_deref()
                }
            };
            match next {
                Some(child) => node = child,
                None => return Ok(()),
            }
        }
        Ok(())
    }

    /// Returns true if walking `segments` ends on a node with a handler.
    pub(crate) fn is_bound(&self, segments: &[Segment<'_>]) -> bool {
        let mut node = self;
        for segment in segments {
            let next = match *segment {
                Segment::Static(text) => node.find_static_child(text),
                Segment::Param(_) => node.param_child.as_deref(),
                Segment::Wildcard => node.wildcard_child.as_deref(),
            };
            match next {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.handler.is_some()
    }

    /// Inserts a pattern that already passed [`Node::check`].
    pub(crate) fn insert(&mut self, segments: &[Segment<'_>], pattern: &str, handler: H) {
        let mut node = self;
        for segment in segments {
            node = node.child_or_insert(*segment);
        }
        node.handler = Some(handler);
        node.route = Some(pattern.to_string());
    }

    fn child_or_insert(&mut self, segment: Segment<'_>) -> &mut Self {
        match segment {
            Segment::Static(text) => {
                let idx = match self
                    .static_children
                    .binary_search_by(|c| c.segment.as_str().cmp(text))
                {
                    Ok(idx) => idx,
                    Err(idx) => {
                        self.static_children
                            .insert(idx, Node::new(text, SegmentKind::Static));
                        idx
                    }
                };
                &mut self.static_children[idx]
            }
            Segment::Param(raw) => self.param_child.get_or_insert_with(|| {
                Box::new(Node::new(raw, SegmentKind::Param(raw[1..].to_string())))
            }),
            Segment::Wildcard => self
                .wildcard_child
                .get_or_insert_with(|| Box::new(Node::new("*", SegmentKind::Wildcard))),
        }
    }

    /// Selects the child matching one request segment.
    ///
    /// Literal beats parameter beats wildcard. The first rule that matches
    /// wins and the walk never returns to try a lower tier.
    pub(crate) fn match_child(&self, segment: &str, params: &mut Params) -> Option<&Self> {
        if segment.is_empty() {
            return None;
        }
        if let Some(child) = self.find_static_child(segment) {
            return Some(child);
        }
        if let Some(child) = self.param_child.as_deref() {
            if let SegmentKind::Param(name) = &child.kind {
                params.push(name.clone(), segment);
            }
            return Some(child);
        }
        self.wildcard_child.as_deref()
    }

    fn find_static_child(&self, segment: &str) -> Option<&Self> {
        self.static_children
            .binary_search_by(|c| c.segment.as_str().cmp(segment))
            .ok()
            .map(|idx| &self.static_children[idx])
    }

    /// Counts nodes in this subtree, including `self`.
    pub(crate) fn node_count(&self) -> usize {
        1 + self
            .static_children
            .iter()
            .map(Node::node_count)
            .sum::<usize>()
            + self.param_child.as_ref().map_or(0, |c| c.node_count())
            + self.wildcard_child.as_ref().map_or(0, |c| c.node_count())
    }

    /// Collects registered patterns in this subtree.
    pub(crate) fn collect_routes<'a>(&'a self, out: &mut Vec<&'a str>) {
        if self.handler.is_some() {
            if let Some(route) = &self.route {
                out.push(route);
            }
        }
        for child in &self.static_children {
            child.collect_routes(out);
        }
        if let Some(child) = &self.param_child {
            child.collect_routes(out);
        }
        if let Some(child) = &self.wildcard_child {
            child.collect_routes(out);
        }
    }
}

impl<H> fmt::Debug for Node<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("segment", &self.segment)
            .field("kind", &self.kind)
            .field("has_handler", &self.handler.is_some())
            .field("route", &self.route)
            .field("static_children", &self.static_children)
            .field("param_child", &self.param_child)
            .field("wildcard_child", &self.wildcard_child)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert(root: &mut Node<&'static str>, pattern: &str, handler: &'static str) {
        let segments = parse_pattern(pattern).unwrap();
        root.check(&segments, pattern).unwrap();
        root.insert(&segments, pattern, handler);
    }

    fn lookup<'a>(root: &'a Node<&'static str>, path: &str) -> Option<(&'a Node<&'static str>, Params)> {
        let mut params = Params::new();
        let mut node = root;
        for segment in path.trim_matches('/').split('/').filter(|s| !s.is_empty()) {
            node = node.match_child(segment, &mut params)?;
        }
        Some((node, params))
    }

    #[test]
    fn test_parse_root() {
        assert!(parse_pattern("/").unwrap().is_empty());
    }

    #[test]
    fn test_parse_mixed_segments() {
        let segments = parse_pattern("/user/:id/*").unwrap();
        assert_eq!(
            segments,
            vec![Segment::Static("user"), Segment::Param(":id"), Segment::Wildcard]
        );
    }

    #[test]
    fn test_parse_rejects_mixed_grammar() {
        for bad in ["/a*", "/:", "/:a:b", "/*x", "/:id*"] {
            assert!(
                matches!(parse_pattern(bad), Err(RouteError::InvalidSegment { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_allows_colon_inside_literal() {
        let segments = parse_pattern("/v1/items:batch").unwrap();
        assert_eq!(segments[1], Segment::Static("items:batch"));
    }

    #[test]
    fn test_static_children_stay_sorted() {
        let mut root = Node::root();
        insert(&mut root, "/zeta", "z");
        insert(&mut root, "/alpha", "a");
        insert(&mut root, "/mid", "m");

        let order: Vec<_> = root.static_children.iter().map(|c| c.segment.as_str()).collect();
        assert_eq!(order, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_intermediate_node_has_no_handler() {
        let mut root = Node::root();
        insert(&mut root, "/order/create", "create");

        let (node, _) = lookup(&root, "/order").unwrap();
        assert!(node.handler().is_none());
        assert!(node.route().is_none());
    }

    #[test]
    fn test_param_binding() {
        let mut root = Node::root();
        insert(&mut root, "/param/:id", "param");

        let (node, params) = lookup(&root, "/param/123").unwrap();
        assert_eq!(node.handler(), Some(&"param"));
        assert_eq!(node.route(), Some("/param/:id"));
        assert_eq!(params.get("id"), Some("123"));
    }

    #[test]
    fn test_literal_beats_param() {
        let mut root = Node::root();
        insert(&mut root, "/user/:id", "param");
        insert(&mut root, "/user/home", "literal");

        let (node, params) = lookup(&root, "/user/home").unwrap();
        assert_eq!(node.handler(), Some(&"literal"));
        assert!(params.is_empty());
    }

    #[test]
    fn test_no_backtracking_from_literal() {
        let mut root = Node::root();
        insert(&mut root, "/a/b/c", "literal");
        insert(&mut root, "/a/:x/d", "param");

        // "b" commits to the literal branch, which has no "d" child.
        assert!(lookup(&root, "/a/b/d").is_none());
        let (node, params) = lookup(&root, "/a/z/d").unwrap();
        assert_eq!(node.handler(), Some(&"param"));
        assert_eq!(params.get("x"), Some("z"));
    }

    #[test]
    fn test_wildcard_matches_single_segment() {
        let mut root = Node::root();
        insert(&mut root, "/order/*", "star");

        assert_eq!(lookup(&root, "/order/delete").unwrap().0.handler(), Some(&"star"));
        assert!(lookup(&root, "/order/delete/123").is_none());
    }

    #[test]
    fn test_empty_request_segment_never_matches() {
        let mut root = Node::root();
        insert(&mut root, "/a/:id", "param");

        let mut params = Params::new();
        assert!(root.match_child("", &mut params).is_none());
    }

    #[test]
    fn test_check_detects_conflicts() {
        let mut root = Node::root();
        insert(&mut root, "/a/:id", "param");
        insert(&mut root, "/b/*", "star");

        let segments = parse_pattern("/a/*").unwrap();
        assert!(matches!(
            root.check(&segments, "/a/*"),
            Err(RouteError::ParamConflict { .. })
        ));

        let segments = parse_pattern("/b/:id").unwrap();
        assert!(matches!(
            root.check(&segments, "/b/:id"),
            Err(RouteError::WildcardConflict { .. })
        ));

        let segments = parse_pattern("/a/:name").unwrap();
        assert!(matches!(
            root.check(&segments, "/a/:name"),
            Err(RouteError::ParamNameConflict { .. })
        ));
    }

    #[test]
    fn test_node_count_and_routes() {
        let mut root = Node::root();
        insert(&mut root, "/user", "user");
        insert(&mut root, "/user/:id", "detail");

        assert_eq!(root.node_count(), 3);
        let mut routes = Vec::new();
        root.collect_routes(&mut routes);
        assert_eq!(routes, vec!["/user", "/user/:id"]);
    }
}
