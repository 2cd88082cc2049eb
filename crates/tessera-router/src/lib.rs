//! Segment trie router for Tessera.
//!
//! Routes are stored in a prefix tree keyed by `/`-separated path segment,
//! one tree per HTTP method. A segment is a literal (`user`), a named
//! parameter (`:id`) or a single-segment wildcard (`*`).
//!
//! # Features
//!
//! - **Validated registration**: malformed or conflicting patterns are
//!   rejected with a [`RouteError`] and leave the trie unchanged
//! - **Deterministic matching**: literal, then parameter, then wildcard,
//!   with no backtracking between tiers
//! - **Generic bindings**: the router stores any handler type `H`
//!
//! # Example
//!
//! ```rust
//! use tessera_router::Router;
//! use http::Method;
//!
//! let mut router = Router::new();
//! router.add_route(Method::GET, "/user", "listUsers").unwrap();
//! router.add_route(Method::GET, "/user/:id", "getUser").unwrap();
//! router.add_route(Method::POST, "/order/*", "anyOrder").unwrap();
//!
//! let m = router.find_route(&Method::GET, "/user/123").unwrap();
//! assert_eq!(m.handler(), Some(&"getUser"));
//! assert_eq!(m.route(), Some("/user/:id"));
//! assert_eq!(m.params.get("id"), Some("123"));
//!
//! // Wildcards match exactly one segment.
//! assert!(router.find_route(&Method::POST, "/order/a/b").is_none());
//! ```
//!
//! # Architecture
//!
//! ```text
//!              GET "/"                   POST "/"
//!                 │                         │
//!              "user"                    "order"
//!                 │                         │
//!         ┌───────┴──────┐          ┌───────┴───────┐
//!       (leaf)         ":id"     "create"          "*"
//!     listUsers          │        (leaf)          (leaf)
//!                      (leaf)
//!                     getUser
//! ```

mod error;
mod node;
mod params;
mod router;

use std::fmt;

pub use error::RouteError;
pub use node::{Node, SegmentKind};
pub use params::Params;
pub use router::Router;

/// Result of a successful lookup.
///
/// The node may be an intermediate node with no handler bound.
pub struct RouteMatch<'a, H> {
    node: &'a Node<H>,
    /// Parameters bound while walking down the trie.
    pub params: Params,
}

impl<'a, H> RouteMatch<'a, H> {
    /// Creates a match for `node`.
    #[must_use]
    pub fn new(node: &'a Node<H>, params: Params) -> Self {
        Self { node, params }
    }

    /// The matched node.
    #[must_use]
    pub fn node(&self) -> &'a Node<H> {
        self.node
    }

    /// The handler bound to the matched node.
    #[must_use]
    pub fn handler(&self) -> Option<&'a H> {
        self.node.handler()
    }

    /// The pattern the matched node was registered with.
    #[must_use]
    pub fn route(&self) -> Option<&'a str> {
        self.node.route()
    }
}

impl<H> fmt::Debug for RouteMatch<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMatch")
            .field("route", &self.route())
            .field("has_handler", &self.handler().is_some())
            .field("params", &self.params)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_basic_routing() {
        let mut router = Router::new();
        router.add_route(Method::GET, "/users", "listUsers").unwrap();
        router.add_route(Method::GET, "/users/:id", "getUser").unwrap();

        let m = router.find_route(&Method::GET, "/users").unwrap();
        assert_eq!(m.handler(), Some(&"listUsers"));
        assert!(m.params.is_empty());

        let m = router.find_route(&Method::GET, "/users/123").unwrap();
        assert_eq!(m.handler(), Some(&"getUser"));
        assert_eq!(m.params.get("id"), Some("123"));
    }

    #[test]
    fn test_multiple_params() {
        let mut router = Router::new();
        router
            .add_route(Method::GET, "/orgs/:org/users/:user", "getOrgUser")
            .unwrap();

        let m = router.find_route(&Method::GET, "/orgs/acme/users/7").unwrap();
        assert_eq!(m.handler(), Some(&"getOrgUser"));
        assert_eq!(m.params.get("org"), Some("acme"));
        assert_eq!(m.params.get("user"), Some("7"));
    }

    #[test]
    fn test_route_match_debug_omits_handler() {
        let mut router = Router::new();
        router.add_route(Method::GET, "/a", 1_u8).unwrap();
        let m = router.find_route(&Method::GET, "/a").unwrap();
        let debug = format!("{m:?}");
        assert!(debug.contains("\"/a\""));
        assert!(debug.contains("has_handler: true"));
    }
}
