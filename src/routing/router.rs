//! Route classification.
//!
//! # Responsibilities
//! - Store compiled matchers in evaluation order
//! - Classify a request path into a route class
//! - Return an explicit `NotFound` rather than a silent default
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Classification runs before authentication, so public paths never
//!   reach the authenticator
//! - Paths are classified in canonical form (see `path.rs`); public
//!   endpoints match exactly, never as prefixes
//! - First match wins: health, metrics, public paths, then the API prefix

use crate::config::schema::RoutingConfig;
use crate::routing::matcher::{ExactPathMatcher, Matcher, PathPrefixMatcher};

/// How the gateway handles a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Liveness endpoint.
    Health,
    /// Metrics exposition endpoint.
    Metrics,
    /// Forwarded without authentication or risk gating.
    Public,
    /// Authenticated, scored and admitted before forwarding.
    Protected,
    NotFound,
}

#[derive(Debug)]
struct Route {
    matcher: Box<dyn Matcher>,
    class: RouteClass,
}

/// Ordered route table built once from configuration.
#[derive(Debug)]
pub struct RouteTable {
    routes: Vec<Route>,
    api_prefix: PathPrefixMatcher,
}

impl RouteTable {
    pub fn from_config(config: &RoutingConfig) -> Self {
        let mut routes = vec![
            Route {
                matcher: Box::new(ExactPathMatcher::new(config.health_path.clone())),
                class: RouteClass::Health,
            },
            Route {
                matcher: Box::new(ExactPathMatcher::new(config.metrics_path.clone())),
                class: RouteClass::Metrics,
            },
        ];
        routes.extend(config.public_paths.iter().map(|path| Route {
            matcher: Box::new(ExactPathMatcher::new(trim_trailing_slash(path))) as Box<dyn Matcher>,
            class: RouteClass::Public,
        }));

        let api_prefix = PathPrefixMatcher::new(config.api_prefix.clone());
        routes.push(Route {
            matcher: Box::new(api_prefix.clone()),
            class: RouteClass::Protected,
        });

        tracing::debug!(routes = routes.len(), "Route table compiled");
        Self { routes, api_prefix }
    }

    /// Classify a canonical path.
    pub fn classify(&self, path: &str) -> RouteClass {
        self.routes
            .iter()
            .find(|route| route.matcher.matches(path))
            .map(|route| route.class)
            .unwrap_or(RouteClass::NotFound)
    }

    /// Strip the API prefix for forwarding. An empty remainder becomes `/`.
    pub fn upstream_path<'a>(&self, path: &'a str) -> &'a str {
        let prefix = self.api_prefix.prefix();
        if prefix == "/" {
            return path;
        }
        match path.strip_prefix(prefix) {
            Some("") => "/",
            Some(rest) if rest.starts_with('/') => rest,
            _ => path,
        }
    }
}

fn trim_trailing_slash(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
