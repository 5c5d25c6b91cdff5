//! Path pattern compilation and matching.
//!
//! # Responsibilities
//! - Parse declarative path patterns into typed segments
//! - Reject malformed patterns before they reach the route table
//! - Match request paths and extract named parameters
//!
//! # Pattern Grammar
//! ```text
//! /users/new            static segments, exact and case-sensitive
//! /users/[id]           one non-empty segment
//! /docs/[[lang]]        zero or one segment
//! /files/[...path]      one or more trailing segments, joined with `/`
//! /blog/[[...slug]]     zero or more trailing segments
//! /admin/*              prefix pattern, matches anything below /admin
//! /profile/index        same as /profile
//! ```
//!
//! # Design Decisions
//! - Segment-level grammar, no regex
//! - Parameter values are the raw path text (no percent-decoding)
//! - Backtracking only happens around optional segments

use crate::routing::error::PatternError;
use crate::routing::params::ParamBindings;

/// Rank appended to prefix (`/*`) patterns so they sort after every route
/// they could shadow.
const WILDCARD_RANK: u8 = 5;

/// Kind of a pattern segment, ordered from most to least specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SegmentKind {
    Static,
    Required,
    Optional,
    Spread,
    OptionalSpread,
}

impl SegmentKind {
    /// Precedence rank used by the route table sort. Lower is tried first.
    pub fn rank(self) -> u8 {
        match self {
            SegmentKind::Static => 0,
            SegmentKind::Required => 1,
            SegmentKind::Optional => 2,
            SegmentKind::Spread => 3,
            SegmentKind::OptionalSpread => 4,
        }
    }

    pub fn is_spread(self) -> bool {
        matches!(self, SegmentKind::Spread | SegmentKind::OptionalSpread)
    }
}

/// One `/`-separated piece of a compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Static(String),
    Required(String),
    Optional(String),
    Spread(String),
    OptionalSpread(String),
}

impl Segment {
    pub fn kind(&self) -> SegmentKind {
        match self {
            Segment::Static(_) => SegmentKind::Static,
            Segment::Required(_) => SegmentKind::Required,
            Segment::Optional(_) => SegmentKind::Optional,
            Segment::Spread(_) => SegmentKind::Spread,
            Segment::OptionalSpread(_) => SegmentKind::OptionalSpread,
        }
    }

    /// The parameter name, or `None` for static segments.
    pub fn param_name(&self) -> Option<&str> {
        match self {
            Segment::Static(_) => None,
            Segment::Required(name)
            | Segment::Optional(name)
            | Segment::Spread(name)
            | Segment::OptionalSpread(name) => Some(name),
        }
    }
}

/// Path shape with parameter names erased. Two routes with equal shapes
/// accept exactly the same set of paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    parts: Vec<(SegmentKind, Option<String>)>,
    prefix: bool,
}

/// A compiled path pattern.
#[derive(Debug, Clone)]
pub struct Matcher {
    pattern: String,
    segments: Vec<Segment>,
    param_names: Vec<String>,
    prefix: bool,
}

/// Compile a declarative path pattern into a [`Matcher`].
pub fn compile(pattern: &str) -> Result<Matcher, PatternError> {
    if !pattern.starts_with('/') {
        return Err(PatternError::NotAbsolute(pattern.to_string()));
    }

    let mut tokens: Vec<&str> = pattern.split('/').filter(|t| !t.is_empty()).collect();

    let prefix = tokens.last() == Some(&"*");
    if prefix {
        tokens.pop();
    }
    if tokens.contains(&"*") {
        return Err(PatternError::WildcardNotLast(pattern.to_string()));
    }

    if tokens.last() == Some(&"index") {
        tokens.pop();
    }

    let segments = tokens
        .iter()
        .map(|token| parse_segment(token))
        .collect::<Result<Vec<_>, _>>()?;

    // Spreads swallow the rest of the path, so nothing may follow them,
    // not even a prefix wildcard.
    for (i, segment) in segments.iter().enumerate() {
        if segment.kind().is_spread() && (i + 1 != segments.len() || prefix) {
            return Err(PatternError::SpreadNotLast(tokens[i].to_string()));
        }
    }

    let mut param_names: Vec<String> = Vec::new();
    for name in segments.iter().filter_map(Segment::param_name) {
        if param_names.iter().any(|n| n == name) {
            return Err(PatternError::DuplicateParam(name.to_string()));
        }
        param_names.push(name.to_string());
    }

    Ok(Matcher {
        pattern: pattern.to_string(),
        segments,
        param_names,
        prefix,
    })
}

fn parse_segment(token: &str) -> Result<Segment, PatternError> {
    if !token.contains(['[', ']']) {
        return Ok(Segment::Static(token.to_string()));
    }

    let open = token.len() - token.trim_start_matches('[').len();
    let close = token.len() - token.trim_end_matches(']').len();

    if open == 0 || close == 0 {
        return Err(PatternError::MalformedSegment(token.to_string()));
    }
    if open != close || open > 2 || token.len() < open + close {
        return Err(PatternError::UnbalancedBrackets(token.to_string()));
    }

    let inner = &token[open..token.len() - close];
    if inner.contains(['[', ']']) {
        return Err(PatternError::UnbalancedBrackets(token.to_string()));
    }

    let (spread, name) = match inner.strip_prefix("...") {
        Some(name) => (true, name),
        None => (false, inner),
    };

    if !is_valid_param_name(name) {
        return Err(PatternError::InvalidParamName(token.to_string()));
    }

    let name = name.to_string();
    Ok(match (open, spread) {
        (1, false) => Segment::Required(name),
        (2, false) => Segment::Optional(name),
        (1, true) => Segment::Spread(name),
        _ => Segment::OptionalSpread(name),
    })
}

fn is_valid_param_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Split a request path into segments, ignoring one leading and one
/// trailing slash.
fn split_path(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}

impl Matcher {
    /// The original declarative pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Parameter names in declaration order.
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Whether this is a `/*` prefix pattern.
    pub fn is_prefix(&self) -> bool {
        self.prefix
    }

    /// Test a request path, returning the captured parameters on success.
    pub fn matches(&self, path: &str) -> Option<ParamBindings> {
        let parts = split_path(path);
        let mut bindings = ParamBindings::new();
        if self.match_from(0, &parts, 0, &mut bindings) {
            Some(bindings)
        } else {
            None
        }
    }

    fn match_from(
        &self,
        si: usize,
        parts: &[&str],
        pi: usize,
        bindings: &mut ParamBindings,
    ) -> bool {
        let Some(segment) = self.segments.get(si) else {
            return pi == parts.len() || self.prefix;
        };
        let current = parts.get(pi).copied();

        match segment {
            Segment::Static(literal) => {
                current == Some(literal.as_str()) && self.match_from(si + 1, parts, pi + 1, bindings)
            }
            Segment::Required(name) => match current {
                Some(value) if !value.is_empty() => {
                    bindings.insert(name.as_str(), value);
                    if self.match_from(si + 1, parts, pi + 1, bindings) {
                        return true;
                    }
                    bindings.remove(name);
                    false
                }
                _ => false,
            },
            Segment::Optional(name) => {
                if let Some(value) = current.filter(|v| !v.is_empty()) {
                    bindings.insert(name.as_str(), value);
                    if self.match_from(si + 1, parts, pi + 1, bindings) {
                        return true;
                    }
                    bindings.remove(name);
                }
                self.match_from(si + 1, parts, pi, bindings)
            }
            Segment::Spread(name) | Segment::OptionalSpread(name) => {
                let rest = &parts[pi.min(parts.len())..];
                if rest.iter().any(|p| p.is_empty()) {
                    return false;
                }
                if rest.is_empty() && matches!(segment, Segment::Spread(_)) {
                    return false;
                }
                bindings.insert(name.as_str(), rest.join("/"));
                true
            }
        }
    }

    /// The pattern with parameter names erased.
    pub fn shape(&self) -> Shape {
        Shape {
            parts: self
                .segments
                .iter()
                .map(|s| match s {
                    Segment::Static(literal) => (SegmentKind::Static, Some(literal.clone())),
                    other => (other.kind(), None),
                })
                .collect(),
            prefix: self.prefix,
        }
    }

    /// Per-segment precedence ranks, compared lexicographically by the
    /// route table sort.
    pub fn ranks(&self) -> Vec<u8> {
        let mut ranks: Vec<u8> = self.segments.iter().map(|s| s.kind().rank()).collect();
        if self.prefix {
            ranks.push(WILDCARD_RANK);
        }
        ranks
    }
}
