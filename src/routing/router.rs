//! Route lookup.
//!
//! # Responsibilities
//! - Store mounted endpoints partitioned by method token
//! - Reject conflicting endpoints at insertion time
//! - Sort each partition once by precedence
//! - Look up the matching endpoint for a request
//!
//! # Design Decisions
//! - Immutable after sealing (shared via `Arc`, no locks)
//! - First match wins; the sort order is the source of truth for precedence
//! - O(n) scan per partition (acceptable for typical route counts)
//! - Explicit `None` rather than a silent default

use std::collections::HashMap;
use std::sync::Arc;

use crate::routing::error::RouteConflictError;
use crate::routing::params::ParamBindings;
use crate::routing::route::{Endpoint, MethodToken};

/// Outcome of a successful lookup.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub endpoint: Arc<Endpoint>,
    pub params: ParamBindings,
}

/// Method-partitioned, precedence-ordered endpoint table.
#[derive(Debug, Default)]
pub struct RouteTable {
    partitions: HashMap<MethodToken, Vec<Arc<Endpoint>>>,
    endpoints: Vec<Arc<Endpoint>>,
    sealed: bool,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an endpoint. Fails when an existing endpoint shares a method and
    /// has the same path shape once parameter names are erased.
    pub fn insert(&mut self, endpoint: Endpoint) -> Result<Arc<Endpoint>, RouteConflictError> {
        let route = endpoint.route();
        let shape = route.matcher().shape();

        for existing in &self.endpoints {
            let other = existing.route();
            if !route.methods().intersects(other.methods()) || other.matcher().shape() != shape {
                continue;
            }

            let methods = route
                .methods()
                .intersection(other.methods())
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            return Err(RouteConflictError {
                methods,
                pattern: route.pattern().to_string(),
                source_id: endpoint.source().to_string(),
                existing_pattern: other.pattern().to_string(),
                existing_source: existing.source().to_string(),
            });
        }

        let endpoint = Arc::new(endpoint);
        for token in endpoint.route().methods().iter() {
            self.partitions
                .entry(token.clone())
                .or_default()
                .push(Arc::clone(&endpoint));
        }
        self.endpoints.push(Arc::clone(&endpoint));
        self.sealed = false;
        Ok(endpoint)
    }

    /// Sort every partition by precedence. Called once after the last insert.
    ///
    /// Patterns compare by their per-segment ranks (static before required
    /// before optional before spread before optional spread, prefix patterns
    /// last), lexicographically with shorter prefixes first. Ties go to the
    /// smaller method set and then to declaration order.
    pub fn seal(&mut self) {
        for endpoints in self.partitions.values_mut() {
            endpoints.sort_by_cached_key(|e| {
                let route = e.route();
                (route.matcher().ranks(), route.methods().len())
            });
        }
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Find the endpoint for a request.
    ///
    /// Scans the partition for the exact method, then `GET` for `HEAD`
    /// requests, then the `*` partition. A route declared for `HEAD` itself
    /// therefore takes precedence over a `GET` route for `HEAD` requests.
    pub fn resolve(&self, method: &str, path: &str) -> Option<Resolution> {
        debug_assert!(self.sealed, "resolve called on an unsealed route table");

        let exact = MethodToken::named(method);
        let mut candidates = vec![exact.clone()];
        if exact == MethodToken::named("HEAD") {
            candidates.push(MethodToken::named("GET"));
        }
        candidates.push(MethodToken::Any);

        candidates.iter().find_map(|token| self.scan(token, path))
    }

    fn scan(&self, token: &MethodToken, path: &str) -> Option<Resolution> {
        self.partitions.get(token)?.iter().find_map(|endpoint| {
            endpoint.route().matches(path).map(|params| Resolution {
                endpoint: Arc::clone(endpoint),
                params,
            })
        })
    }

    /// Endpoints of one partition in precedence order.
    pub fn partition(&self, token: &MethodToken) -> &[Arc<Endpoint>] {
        self.partitions.get(token).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Method tokens that have at least one endpoint, sorted.
    pub fn methods(&self) -> Vec<&MethodToken> {
        let mut tokens: Vec<&MethodToken> = self.partitions.keys().collect();
        tokens.sort();
        tokens
    }

    /// All endpoints in insertion order.
    pub fn endpoints(&self) -> &[Arc<Endpoint>] {
        &self.endpoints
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
