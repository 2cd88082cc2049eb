//! Route registration errors.
//!
//! Every rejected registration maps to exactly one [`RouteError`] variant, so
//! startup failures name the rule that was broken.

use http::Method;
use thiserror::Error;

/// Error returned when a route pattern cannot be registered.
///
/// Registration happens at boot; callers are expected to propagate these
/// errors and abort startup rather than continue with a partial table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The pattern was the empty string.
    #[error("route pattern must not be empty")]
    EmptyPattern,

    /// The pattern does not begin with `/`.
    #[error("route pattern must start with '/': [{pattern}]")]
    MissingLeadingSlash {
        /// The rejected pattern.
        pattern: String,
    },

    /// The pattern ends with `/` and is not the root.
    #[error("route pattern must not end with '/': [{pattern}]")]
    TrailingSlash {
        /// The rejected pattern.
        pattern: String,
    },

    /// The pattern contains `//`.
    #[error("route pattern contains an empty segment: [{pattern}]")]
    EmptySegment {
        /// The rejected pattern.
        pattern: String,
    },

    /// A segment mixes literal, parameter and wildcard syntax.
    #[error("invalid segment [{segment}] in route pattern [{pattern}]")]
    InvalidSegment {
        /// The rejected pattern.
        pattern: String,
        /// The offending segment.
        segment: String,
    },

    /// The same method and pattern were already registered.
    #[error("duplicate route: {method} [{pattern}]")]
    Duplicate {
        /// HTTP method of the rejected registration.
        method: Method,
        /// The rejected pattern.
        pattern: String,
    },

    /// A parameter segment was registered where a wildcard already exists.
    #[error("route conflict in [{pattern}]: wildcard already registered, cannot add parameter [{segment}]")]
    WildcardConflict {
        /// The rejected pattern.
        pattern: String,
        /// The parameter segment that clashed.
        segment: String,
    },

    /// A wildcard segment was registered where a parameter already exists.
    #[error("route conflict in [{pattern}]: parameter [{existing}] already registered, cannot add wildcard")]
    ParamConflict {
        /// The rejected pattern.
        pattern: String,
        /// The parameter segment already in place.
        existing: String,
    },

    /// A parameter with a different name already occupies the position.
    #[error("route conflict in [{pattern}]: existing parameter [{existing}], new parameter [{new}]")]
    ParamNameConflict {
        /// The rejected pattern.
        pattern: String,
        /// Segment already registered, e.g. `:id`.
        existing: String,
        /// Segment being registered, e.g. `:name`.
        new: String,
    },
}
