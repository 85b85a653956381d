//! Path pattern compilation and matching.
//!
//! # Responsibilities
//! - Parse patterns such as `/api/v1/Auth/cities/provinces/{province_code}/wards`
//! - Match request paths segment by segment, binding named captures
//! - Expose the specificity used to order routes
//!
//! # Design Decisions
//! - Literal segments compare ASCII case-insensitively
//! - Empty segments are ignored (`/a//b/` matches `/a/b`)
//! - A catch-all (`{*rest}` or `{**rest}`) must be the last segment and may match nothing
//! - Captures are kept as matched; handlers read them percent-decoded via [`RouteParams::decoded`]
//! - No regex to guarantee O(n) matching

use std::cmp::Ordering;

use percent_encoding::percent_decode_str;

use crate::config::ConfigError;
use crate::error::GatewayError;

/// One compiled segment of a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
    CatchAll(String),
}

/// Named captures bound while matching a path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams(Vec<(String, String)>);

impl RouteParams {
    /// Value bound to `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Value bound to `name`, percent-decoded.
    ///
    /// A capture that does not decode to UTF-8 is a translation error.
    pub fn decoded(&self, name: &str) -> Result<Option<String>, GatewayError> {
        let Some(raw) = self.get(name) else {
            return Ok(None);
        };
        percent_decode_str(raw)
            .decode_utf8()
            .map(|value| Some(value.into_owned()))
            .map_err(|_| GatewayError::translation(format!("{name} is not valid UTF-8")))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push(&mut self, name: &str, value: impl Into<String>) {
        self.0.push((name.to_string(), value.into()));
    }
}

/// Ordering key for routes; greater is more specific.
///
/// Fields compare in declaration order: longest static prefix first, then
/// the number of literal segments, then absence of a catch-all, then length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity {
    static_prefix: usize,
    literals: usize,
    exact: bool,
    segments: usize,
}

/// A compiled, immutable path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compile a pattern, rejecting malformed parameter syntax.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidPattern {
            pattern: raw.to_string(),
            reason: reason.to_string(),
        };

        if !raw.starts_with('/') {
            return Err(invalid("pattern must start with '/'"));
        }

        let mut segments = Vec::new();
        let mut names: Vec<&str> = Vec::new();

        for part in raw.split('/').filter(|s| !s.is_empty()) {
            if matches!(segments.last(), Some(Segment::CatchAll(_))) {
                return Err(invalid("catch-all must be the last segment"));
            }

            let segment = match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                Some(inner) => {
                    let (name, catch_all) = match inner.strip_prefix("**").or_else(|| inner.strip_prefix('*')) {
                        Some(name) => (name, true),
                        None => (inner, false),
                    };
                    if name.is_empty() {
                        return Err(invalid("parameter name must not be empty"));
                    }
                    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                        return Err(invalid("parameter names may only contain [A-Za-z0-9_]"));
                    }
                    if names.contains(&name) {
                        return Err(invalid("duplicate parameter name"));
                    }
                    names.push(name);
                    if catch_all {
                        Segment::CatchAll(name.to_string())
                    } else {
                        Segment::Param(name.to_string())
                    }
                }
                None if part.contains('{') || part.contains('}') => {
                    return Err(invalid("parameters must span a whole segment"));
                }
                None => Segment::Literal(part.to_string()),
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The pattern as written in configuration.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Names of every parameter (including a catch-all).
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(n) | Segment::CatchAll(n) => Some(n.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Canonical form used to detect duplicates: literals lowercased,
    /// parameter names erased.
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            out.push('/');
            match seg {
                Segment::Literal(l) => out.push_str(&l.to_ascii_lowercase()),
                Segment::Param(_) => out.push_str("{}"),
                Segment::CatchAll(_) => out.push_str("{*}"),
            }
        }
        if out.is_empty() {
            out.push('/');
        }
        out
    }

    /// Leading literal segments joined back into a path, e.g. `/api/v1/User`.
    pub fn literal_prefix(&self) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            match seg {
                Segment::Literal(l) => {
                    out.push('/');
                    out.push_str(l);
                }
                _ => break,
            }
        }
        out
    }

    pub fn specificity(&self) -> Specificity {
        let static_prefix = self
            .segments
            .iter()
            .take_while(|s| matches!(s, Segment::Literal(_)))
            .count();
        Specificity {
            static_prefix,
            literals: self
                .segments
                .iter()
                .filter(|s| matches!(s, Segment::Literal(_)))
                .count(),
            exact: !matches!(self.segments.last(), Some(Segment::CatchAll(_))),
            segments: self.segments.len(),
        }
    }

    /// Match `path`, returning the bound captures on success.
    pub fn matches(&self, path: &str) -> Option<RouteParams> {
        let mut parts = path.split('/').filter(|s| !s.is_empty());
        let mut params = RouteParams::default();

        for seg in &self.segments {
            match seg {
                Segment::Literal(lit) => {
                    if !parts.next()?.eq_ignore_ascii_case(lit) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    params.push(name, parts.next()?);
                }
                Segment::CatchAll(name) => {
                    let rest: Vec<&str> = parts.by_ref().collect();
                    params.push(name, rest.join("/"));
                    return Some(params);
                }
            }
        }

        match parts.next() {
            Some(_) => None,
            None => Some(params),
        }
    }
}

/// Compare two patterns for ordering: more specific sorts first.
pub fn by_specificity(a: &PathPattern, b: &PathPattern) -> Ordering {
    b.specificity().cmp(&a.specificity())
}
