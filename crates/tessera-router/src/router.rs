//! Method-keyed router.
//!
//! [`Router`] owns one trie per HTTP method and is the only place where path
//! segmentation rules live.

use std::collections::HashMap;
use std::fmt;

use http::Method;

use crate::error::RouteError;
use crate::node::{parse_pattern, Node};
use crate::params::Params;
use crate::RouteMatch;

/// A segment trie router, one tree per HTTP method.
///
/// `H` is whatever the caller binds to a route; the server binds handler
/// functions, tests often bind plain strings.
///
/// # Example
///
/// ```rust
/// use tessera_router::Router;
/// use http::Method;
///
/// let mut router = Router::new();
/// router.add_route(Method::GET, "/user/:id", "getUser").unwrap();
///
/// let m = router.find_route(&Method::GET, "/user/42").unwrap();
/// assert_eq!(m.handler(), Some(&"getUser"));
/// assert_eq!(m.params.get("id"), Some("42"));
/// ```
///
/// # Route Priority
///
/// At every level the router tries, in order:
///
/// 1. **Literal segments** (e.g., `/user/home`)
/// 2. **Parameter segments** (e.g., `/user/:id`)
/// 3. **Wildcard segments** (e.g., `/user/*`)
///
/// The first rule that matches decides the branch. A wildcard consumes exactly
/// one segment, so `/order/*` does not match `/order/a/b`.
#[derive(Clone)]
pub struct Router<H> {
    trees: HashMap<Method, Node<H>>,
    route_count: usize,
}

impl<H> Default for Router<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> Router<H> {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            trees: HashMap::new(),
            route_count: 0,
        }
    }

    /// Registers `handler` for `method` and `pattern`.
    ///
    /// The pattern is validated against the existing trie before anything is
    /// created, so a rejected registration leaves the router unchanged.
    ///
    /// # Errors
    ///
    /// Returns the [`RouteError`] naming the first rule the pattern breaks.
    pub fn add_route(&mut self, method: Method, pattern: &str, handler: H) -> Result<(), RouteError> {
        let segments = parse_pattern(pattern)?;

        if let Some(root) = self.trees.get(&method) {
            root.check(&segments, pattern)?;
            if root.is_bound(&segments) {
                return Err(RouteError::Duplicate {
                    method,
                    pattern: pattern.to_string(),
                });
            }
        }

        self.trees
            .entry(method)
            .or_insert_with(Node::root)
            .insert(&segments, pattern, handler);
        self.route_count += 1;
        Ok(())
    }

    /// Looks up the node for `method` and `path`.
    ///
    /// Returns `None` when the method has no routes or some segment has no
    /// matching child. A match on a node without a handler is still returned;
    /// callers decide how to answer it.
    #[must_use]
    pub fn find_route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_, H>> {
        let root = self.trees.get(method)?;
        let path = path.trim_matches('/');
        if path.is_empty() {
            return Some(RouteMatch::new(root, Params::new()));
        }

        let mut params = Params::new();
        let mut node = root;
        for segment in path.split('/') {
            node = node.match_child(segment, &mut params)?;
        }
        Some(RouteMatch::new(node, params))
    }

    /// Returns every registered `(method, pattern)` pair.
    ///
    /// Methods are listed in their string order; patterns within a method
    /// follow trie order.
    #[must_use]
    pub fn routes(&self) -> Vec<(&Method, &str)> {
        let mut methods: Vec<_> = self.trees.iter().collect();
        methods.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));

        let mut out = Vec::with_capacity(self.route_count);
        for (method, root) in methods {
            let mut patterns = Vec::new();
            root.collect_routes(&mut patterns);
            out.extend(patterns.into_iter().map(|p| (method, p)));
        }
        out
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.route_count
    }

    /// Returns true if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.route_count == 0
    }

    /// Total number of trie nodes across all methods.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.trees.values().map(Node::node_count).sum()
    }
}

impl<H> fmt::Debug for Router<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("trees", &self.trees)
            .field("route_count", &self.route_count)
            .finish()
    }
}
