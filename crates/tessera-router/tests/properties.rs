//! Property tests for route registration and lookup.

use std::collections::BTreeSet;

use http::Method;
use proptest::prelude::*;
use tessera_router::{RouteError, Router};

fn literal() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

fn value() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_-]{1,12}"
}

proptest! {
    #[test]
    fn param_routes_bind_exact_values(
        prefixes in prop::collection::btree_set(literal(), 1..8),
        picked in any::<prop::sample::Index>(),
        id in value(),
    ) {
        let prefixes: Vec<String> = prefixes.into_iter().collect();
        let mut router = Router::new();
        for (i, prefix) in prefixes.iter().enumerate() {
            router.add_route(Method::GET, &format!("/{prefix}/:id"), i).unwrap();
        }

        let idx = picked.index(prefixes.len());
        let path = format!("/{}/{id}", prefixes[idx]);
        let m = router.find_route(&Method::GET, &path).unwrap();

        prop_assert_eq!(m.handler(), Some(&idx));
        prop_assert_eq!(m.params.get("id"), Some(id.as_str()));
        prop_assert_eq!(m.params.len(), 1);
    }

    #[test]
    fn duplicate_registration_is_rejected_without_mutation(
        segments in prop::collection::vec(literal(), 1..5),
    ) {
        let pattern = format!("/{}", segments.join("/"));
        let mut router = Router::new();
        router.add_route(Method::POST, &pattern, 1).unwrap();
        let nodes = router.node_count();

        let err = router.add_route(Method::POST, &pattern, 2).unwrap_err();
        prop_assert_eq!(err, RouteError::Duplicate { method: Method::POST, pattern: pattern.clone() });
        prop_assert_eq!(router.node_count(), nodes);
        prop_assert_eq!(router.find_route(&Method::POST, &pattern).unwrap().handler(), Some(&1));
    }

    #[test]
    fn wildcard_never_matches_more_than_one_segment(
        prefix in literal(),
        extra in prop::collection::vec(value(), 2..5),
    ) {
        let mut router = Router::new();
        router.add_route(Method::GET, &format!("/{prefix}/*"), ()).unwrap();

        let one = format!("/{prefix}/{}", extra[0]);
        prop_assert!(router.find_route(&Method::GET, &one).is_some());

        let overflow = format!("/{prefix}/{}", extra.join("/"));
        prop_assert!(router.find_route(&Method::GET, &overflow).is_none());
    }

    #[test]
    fn routes_lists_every_registration(
        patterns in prop::collection::btree_set(literal(), 1..10),
    ) {
        let mut router = Router::new();
        for p in &patterns {
            router.add_route(Method::GET, &format!("/{p}"), ()).unwrap();
        }

        let listed: BTreeSet<String> = router
            .routes()
            .into_iter()
            .map(|(_, p)| p.trim_start_matches('/').to_string())
            .collect();
        prop_assert_eq!(listed, patterns);
    }
}
