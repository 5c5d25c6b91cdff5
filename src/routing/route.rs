//! Route identity, interning and mounted endpoints.
//!
//! # Responsibilities
//! - Represent the method set a route answers to
//! - Pair a method set with a compiled pattern (`Route`)
//! - Collapse identical declarations onto one shared `Route`
//! - Bind a route to its hook chain and handler (`Endpoint`)

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use axum::http::Method;

use crate::dispatch::hook::{BoxHandler, BoxHook, Terminal};
use crate::routing::error::PatternError;
use crate::routing::matcher::{self, Matcher};
use crate::routing::params::ParamBindings;

/// A single method token. `Any` is the `*` wildcard.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MethodToken {
    Any,
    Named(String),
}

impl MethodToken {
    pub fn named(method: &str) -> Self {
        MethodToken::Named(method.to_ascii_uppercase())
    }
}

impl From<&Method> for MethodToken {
    fn from(method: &Method) -> Self {
        MethodToken::named(method.as_str())
    }
}

impl FromStr for MethodToken {
    type Err = InvalidMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "*" {
            return Ok(MethodToken::Any);
        }
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(InvalidMethod(s.to_string()));
        }
        Ok(MethodToken::named(s))
    }
}

impl fmt::Display for MethodToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodToken::Any => f.write_str("*"),
            MethodToken::Named(name) => f.write_str(name),
        }
    }
}

/// A method string that is neither `*` nor an alphabetic token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid method token `{0}`")]
pub struct InvalidMethod(pub String);

/// Sorted, de-duplicated set of method tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Methods(BTreeSet<MethodToken>);

impl Methods {
    /// The wildcard set, answering any method not otherwise matched.
    pub fn any() -> Self {
        Self(BTreeSet::from([MethodToken::Any]))
    }

    pub fn only<I, S>(methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(methods.into_iter().map(|m| MethodToken::named(m.as_ref())).collect())
    }

    pub fn get() -> Self {
        Self::only(["GET"])
    }

    pub fn post() -> Self {
        Self::only(["POST"])
    }

    pub fn contains(&self, token: &MethodToken) -> bool {
        self.0.contains(token)
    }

    pub fn is_any(&self) -> bool {
        self.0.contains(&MethodToken::Any)
    }

    /// Tokens present in both sets.
    pub fn intersection<'a>(&'a self, other: &'a Methods) -> impl Iterator<Item = &'a MethodToken> {
        self.0.intersection(&other.0)
    }

    pub fn intersects(&self, other: &Methods) -> bool {
        self.intersection(other).next().is_some()
    }

    /// Whether a request with `method` falls under this set. `HEAD` requests
    /// are also accepted by sets naming `GET`.
    pub fn accepts(&self, method: &Method) -> bool {
        self.is_any()
            || self.contains(&MethodToken::from(method))
            || (method == Method::HEAD && self.contains(&MethodToken::named("GET")))
    }

    pub fn iter(&self) -> impl Iterator<Item = &MethodToken> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<MethodToken> for Methods {
    fn from_iter<I: IntoIterator<Item = MethodToken>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Methods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", token)?;
        }
        Ok(())
    }
}

/// Identity of a route: its method set and declarative pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    methods: Methods,
    pattern: String,
}

/// A method set bound to a compiled path pattern. Immutable once built.
#[derive(Debug)]
pub struct Route {
    methods: Methods,
    matcher: Matcher,
}

impl Route {
    pub fn new(methods: Methods, pattern: &str) -> Result<Self, PatternError> {
        Ok(Self {
            methods,
            matcher: matcher::compile(pattern)?,
        })
    }

    pub fn methods(&self) -> &Methods {
        &self.methods
    }

    pub fn pattern(&self) -> &str {
        self.matcher.pattern()
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn param_names(&self) -> &[String] {
        self.matcher.param_names()
    }

    pub fn matches(&self, path: &str) -> Option<ParamBindings> {
        self.matcher.matches(path)
    }

    pub fn key(&self) -> RouteKey {
        RouteKey {
            methods: self.methods.clone(),
            pattern: self.pattern().to_string(),
        }
    }
}

/// Table-scoped arena that hands out one shared `Route` per identity.
#[derive(Debug, Default)]
pub struct RouteInterner {
    routes: HashMap<RouteKey, Arc<Route>>,
}

impl RouteInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the route for `(methods, pattern)`, compiling it on first use.
    pub fn intern(&mut self, methods: Methods, pattern: &str) -> Result<Arc<Route>, PatternError> {
        let key = RouteKey {
            methods,
            pattern: pattern.to_string(),
        };
        if let Some(route) = self.routes.get(&key) {
            return Ok(Arc::clone(route));
        }

        let route = Arc::new(Route::new(key.methods.clone(), pattern)?);
        self.routes.insert(key, Arc::clone(&route));
        Ok(route)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// A mounted route: the interned `Route` plus its hooks and handler.
pub struct Endpoint {
    route: Arc<Route>,
    chain: Arc<[BoxHook]>,
    source: String,
}

impl Endpoint {
    /// Build an endpoint. The dispatch chain (hooks followed by the wrapped
    /// handler) is assembled once here.
    pub fn new(
        route: Arc<Route>,
        hooks: Vec<BoxHook>,
        handler: BoxHandler,
        source: impl Into<String>,
    ) -> Self {
        let mut chain = hooks;
        chain.push(Arc::new(Terminal::new(handler)));
        Self {
            route,
            chain: chain.into(),
            source: source.into(),
        }
    }

    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }

    /// Hooks followed by the terminal handler link.
    pub fn chain(&self) -> Arc<[BoxHook]> {
        Arc::clone(&self.chain)
    }

    /// Number of hooks ahead of the handler.
    pub fn hook_count(&self) -> usize {
        self.chain.len() - 1
    }

    /// Identifier of the declaration this endpoint came from.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("methods", &self.route.methods().to_string())
            .field("pattern", &self.route.pattern())
            .field("hooks", &self.hook_count())
            .field("source", &self.source)
            .finish()
    }
}
