//! Route lookup.
//!
//! # Responsibilities
//! - Compile route definitions into an immutable table
//! - Reject duplicate (method, pattern) pairs and parameter mismatches
//! - Look up the matching route for a method and path
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Routes sorted once by specificity; lookup is a linear scan, first match wins
//! - Bridge routes win ties against proxy routes
//! - Explicit NoMatch rather than silent default

use std::collections::HashSet;
use std::time::Duration;

use axum::http::Method;

use crate::config::ConfigError;
use crate::routing::matcher::{by_specificity, PathPattern, RouteParams, Segment};
use crate::upstream::BackendKind;

/// Where a matched request is dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTarget {
    /// Typed translation through the adapter owning `backend`.
    Bridge { backend: BackendKind },
    /// Verbatim forwarding to a cluster.
    Proxy(ProxyTarget),
}

/// Proxy-specific routing data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyTarget {
    pub cluster: String,
    pub strip_prefix: Option<String>,
}

/// A route before compilation.
#[derive(Debug, Clone)]
pub struct RouteDefinition {
    /// Route name, also the handler name for bridge routes.
    pub name: String,
    /// Accepted methods; empty means any method.
    pub methods: Vec<Method>,
    pub path: String,
    pub target: RouteTarget,
    /// Parameters the handler reads. `None` accepts whatever the pattern binds.
    pub params: Option<Vec<String>>,
    pub timeout: Duration,
}

/// A compiled route.
#[derive(Debug)]
pub struct Route {
    pub name: String,
    pub methods: Vec<Method>,
    pub pattern: PathPattern,
    pub target: RouteTarget,
    pub timeout: Duration,
}

impl Route {
    /// Label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self.target {
            RouteTarget::Bridge { .. } => "bridge",
            RouteTarget::Proxy(_) => "proxy",
        }
    }

    fn accepts(&self, method: &Method) -> bool {
        self.methods.is_empty() || self.methods.contains(method)
    }
}

/// Result of a successful lookup.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: RouteParams,
}

/// The compiled, read-only route table.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Compile route definitions.
    pub fn compile(definitions: Vec<RouteDefinition>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        let mut routes = Vec::with_capacity(definitions.len());

        for def in definitions {
            let pattern = PathPattern::parse(&def.path)?;

            if let Some(declared) = &def.params {
                check_params(&def.name, &pattern, declared)?;
            }
            if let RouteTarget::Proxy(ProxyTarget { strip_prefix: Some(prefix), .. }) = &def.target {
                check_strip_prefix(&pattern, prefix)?;
            }

            let canonical = pattern.canonical();
            let methods: Vec<String> = if def.methods.is_empty() {
                vec!["*".to_string()]
            } else {
                def.methods.iter().map(ToString::to_string).collect()
            };
            for method in methods {
                if !seen.insert((method.clone(), canonical.clone())) {
                    return Err(ConfigError::DuplicateRoute {
                        method,
                        pattern: def.path.clone(),
                    });
                }
            }

            routes.push(Route {
                name: def.name,
                methods: def.methods,
                pattern,
                target: def.target,
                timeout: def.timeout,
            });
        }

        routes.sort_by(|a, b| {
            by_specificity(&a.pattern, &b.pattern).then_with(|| bridge_first(a).cmp(&bridge_first(b)))
        });

        tracing::debug!(routes = routes.len(), "Route table compiled");
        Ok(Self { routes })
    }

    /// Find the route for `method` and `path`.
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        self.routes
            .iter()
            .filter(|r| r.accepts(method))
            .find_map(|route| route.pattern.matches(path).map(|params| RouteMatch { route, params }))
    }

    /// Routes in match order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn bridge_first(route: &Route) -> u8 {
    match route.target {
        RouteTarget::Bridge { .. } => 0,
        RouteTarget::Proxy(_) => 1,
    }
}

fn check_params(route: &str, pattern: &PathPattern, declared: &[String]) -> Result<(), ConfigError> {
    for param in declared {
        if !pattern.param_names().any(|p| p == param) {
            return Err(ConfigError::UndefinedParameter {
                route: route.to_string(),
                param: param.clone(),
            });
        }
    }
    if let Some(extra) = pattern.param_names().find(|p| !declared.iter().any(|d| d == p)) {
        return Err(ConfigError::UndefinedParameter {
            route: route.to_string(),
            param: extra.to_string(),
        });
    }
    Ok(())
}

fn check_strip_prefix(pattern: &PathPattern, prefix: &str) -> Result<(), ConfigError> {
    let prefix_pattern = PathPattern::parse(prefix)?;
    let is_prefix = prefix_pattern.segments().len() <= pattern.segments().len()
        && prefix_pattern
            .segments()
            .iter()
            .zip(pattern.segments())
            .all(|(p, s)| match (p, s) {
                (Segment::Literal(a), Segment::Literal(b)) => a.eq_ignore_ascii_case(b),
                _ => false,
            });

    if is_prefix {
        Ok(())
    } else {
        Err(ConfigError::InvalidPattern {
            pattern: pattern.as_str().to_string(),
            reason: format!("strip_prefix '{prefix}' is not a literal prefix of the pattern"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge(name: &str, method: Method, path: &str, params: &[&str]) -> RouteDefinition {
        RouteDefinition {
            name: name.into(),
            methods: vec![method],
            path: path.into(),
            target: RouteTarget::Bridge { backend: BackendKind::Auth },
            params: Some(params.iter().map(|p| p.to_string()).collect()),
            timeout: Duration::from_secs(1),
        }
    }

    fn proxy(name: &str, path: &str, cluster: &str, strip: Option<&str>) -> RouteDefinition {
        RouteDefinition {
            name: name.into(),
            methods: vec![],
            path: path.into(),
            target: RouteTarget::Proxy(ProxyTarget {
                cluster: cluster.into(),
                strip_prefix: strip.map(Into::into),
            }),
            params: None,
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_match_and_no_match() {
        let table = RouteTable::compile(vec![
            bridge("Auth_SignIn", Method::POST, "/api/v1/Auth/sign-in", &[]),
            proxy("users", "/api/v1/User/{**rest}", "users", None),
        ])
        .unwrap();

        let m = table.match_route(&Method::POST, "/api/v1/Auth/sign-in").unwrap();
        assert_eq!(m.route.name, "Auth_SignIn");

        // Wrong method on a bridge-only path
        assert!(table.match_route(&Method::GET, "/api/v1/Auth/sign-in").is_none());

        let m = table.match_route(&Method::DELETE, "/api/v1/User/42").unwrap();
        assert_eq!(m.route.name, "users");
        assert_eq!(m.params.get("rest"), Some("42"));

        assert!(table.match_route(&Method::GET, "/nowhere").is_none());
    }

    #[test]
    fn test_literal_beats_parameter() {
        let table = RouteTable::compile(vec![
            bridge("by_code", Method::GET, "/cities/{code}", &["code"]),
            bridge("all", Method::GET, "/cities/all", &[]),
        ])
        .unwrap();

        assert_eq!(table.match_route(&Method::GET, "/cities/all").unwrap().route.name, "all");
        let m = table.match_route(&Method::GET, "/cities/79").unwrap();
        assert_eq!(m.route.name, "by_code");
        assert_eq!(m.params.get("code"), Some("79"));
    }

    #[test]
    fn test_bridge_takes_precedence_over_overlapping_proxy() {
        let table = RouteTable::compile(vec![
            proxy("auth-legacy", "/api/v1/Auth/{**rest}", "auth", None),
            proxy("auth-signin-proxy", "/api/v1/Auth/sign-in", "auth", None),
            bridge("Auth_SignIn", Method::POST, "/api/v1/Auth/sign-in", &[]),
        ])
        .unwrap();

        let m = table.match_route(&Method::POST, "/api/v1/Auth/sign-in").unwrap();
        assert_eq!(m.route.name, "Auth_SignIn");

        // Same path, method the bridge does not handle: the proxy route takes it.
        let m = table.match_route(&Method::GET, "/api/v1/Auth/sign-in").unwrap();
        assert_eq!(m.route.name, "auth-signin-proxy");

        let m = table.match_route(&Method::GET, "/api/v1/Auth/other").unwrap();
        assert_eq!(m.route.name, "auth-legacy");
    }

    #[test]
    fn test_duplicate_routes_rejected() {
        let err = RouteTable::compile(vec![
            bridge("a", Method::GET, "/x/{id}", &["id"]),
            bridge("b", Method::GET, "/X/{other}", &["other"]),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateRoute { .. }));

        // Same pattern, different method is fine.
        assert!(RouteTable::compile(vec![
            bridge("a", Method::GET, "/x", &[]),
            bridge("b", Method::POST, "/x", &[]),
        ])
        .is_ok());
    }

    #[test]
    fn test_undefined_parameter_rejected() {
        let err = RouteTable::compile(vec![bridge(
            "Auth_GetWards",
            Method::GET,
            "/api/v1/Auth/cities/provinces/wards",
            &["province_code"],
        )])
        .unwrap_err();
        assert!(matches!(err, ConfigError::UndefinedParameter { ref param, .. } if param == "province_code"));

        let err = RouteTable::compile(vec![bridge("x", Method::GET, "/a/{id}", &[])]).unwrap_err();
        assert!(matches!(err, ConfigError::UndefinedParameter { ref param, .. } if param == "id"));
    }

    #[test]
    fn test_strip_prefix_must_be_literal_prefix() {
        assert!(RouteTable::compile(vec![proxy("u", "/api/v1/User/{**rest}", "u", Some("/api/v1"))]).is_ok());

        let err = RouteTable::compile(vec![proxy("u", "/api/v1/User/{**rest}", "u", Some("/api/v2"))]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }
}
