//! Declarations named by file-system convention.
//!
//! # Naming Rules
//! ```text
//! index.rs                    *     /
//! hello/[name].get.rs         GET   /hello/[name]
//! comments/[comment].post.rs  POST  /comments/[comment]
//! [...posts]/index.put.rs     PUT   /[...posts]
//! _hooks.rs                   *     hooks scope /
//! hello/_hooks.get.rs         GET   hooks scope /hello
//! ```
//!
//! # Design Decisions
//! - The extension is stripped when present; names without it are accepted
//! - A method suffix is only recognised from the configured method list
//! - No suffix means the wildcard method set
//! - The normalised file name is the declaration's source id

use std::collections::HashSet;

use crate::config::schema::RoutesConfig;
use crate::dispatch::hook::{BoxHandler, Handler};
use crate::mount::declaration::{Declaration, Registrar, RouteDeclaration, RouteSource};
use crate::mount::error::SourceError;
use crate::routing::route::{MethodToken, Methods};

const INDEX: &str = "index";
const HOOKS: &str = "_hooks";

/// Method set, pattern and kind derived from a conventional file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConventionName {
    pub methods: Methods,
    pub pattern: String,
    pub hooks: bool,
}

/// Parse a relative route file name.
pub fn parse_file_name(name: &str, routes: &RoutesConfig) -> Result<ConventionName, SourceError> {
    let invalid = |reason| SourceError::InvalidName {
        name: name.to_string(),
        reason,
    };

    let normalized = normalize(name);
    let stem = match normalized.strip_suffix(routes.extension.as_str()) {
        Some(stem) if !routes.extension.is_empty() => stem,
        _ => normalized.as_str(),
    };

    let (dir, base) = match stem.rsplit_once('/') {
        Some((dir, base)) => (dir, base),
        None => ("", stem),
    };
    if base.is_empty() {
        return Err(invalid("empty file name"));
    }

    let (base, methods) = match base.rsplit_once('.') {
        Some((rest, suffix)) if is_configured_method(suffix, routes) => {
            (rest, Methods::only([suffix]))
        }
        _ => (base, Methods::any()),
    };
    if base.is_empty() {
        return Err(invalid("missing name before the method suffix"));
    }

    let mut segments: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
    let hooks = base == HOOKS;
    if !hooks && base != INDEX {
        segments.push(base);
    }

    Ok(ConventionName {
        methods,
        pattern: format!("/{}", segments.join("/")),
        hooks,
    })
}

fn normalize(name: &str) -> String {
    let name = name.replace('\\', "/");
    let name = name.strip_prefix("./").unwrap_or(&name);
    name.trim_start_matches('/').to_string()
}

fn is_configured_method(suffix: &str, routes: &RoutesConfig) -> bool {
    routes.methods.iter().any(|m| m.eq_ignore_ascii_case(suffix))
        && suffix.parse::<MethodToken>().is_ok()
}

/// A [`RouteSource`] whose entries are keyed by conventional file names.
///
/// Handlers are compiled into the binary; the source only supplies the
/// naming, so a remount re-reads the same entries against the current
/// [`RoutesConfig`].
#[derive(Clone)]
pub struct ConventionSource {
    id: String,
    routes: RoutesConfig,
    entries: Vec<(String, Declaration)>,
}

impl ConventionSource {
    pub fn new(id: impl Into<String>, routes: RoutesConfig) -> Self {
        Self {
            id: id.into(),
            routes,
            entries: Vec::new(),
        }
    }

    /// Add an entry under a file name.
    pub fn file(mut self, name: impl Into<String>, declaration: Declaration) -> Self {
        self.entries.push((name.into(), declaration));
        self
    }

    pub fn handler<H: Handler>(self, name: impl Into<String>, handler: H) -> Self {
        self.file(name, Declaration::handler(handler))
    }

    pub fn route<F>(self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&mut Registrar<'_>) -> BoxHandler + Send + Sync + 'static,
    {
        self.file(name, Declaration::route(factory))
    }

    pub fn hooks<F>(self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&mut Registrar<'_>) + Send + Sync + 'static,
    {
        self.file(name, Declaration::hooks(factory))
    }

    /// Replace the naming configuration, e.g. after a config reload.
    pub fn set_routes_config(&mut self, routes: RoutesConfig) {
        self.routes = routes;
    }

    pub fn routes_config(&self) -> &RoutesConfig {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl RouteSource for ConventionSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn declarations(&self) -> Result<Vec<RouteDeclaration>, SourceError> {
        let mut seen = HashSet::new();
        let mut declarations = Vec::with_capacity(self.entries.len());

        for (name, declaration) in &self.entries {
            let source = normalize(name);
            if !seen.insert(source.clone()) {
                return Err(SourceError::DuplicateName(source));
            }

            let parsed = parse_file_name(name, &self.routes)?;
            if parsed.hooks != declaration.is_hooks() {
                return Err(SourceError::KindMismatch {
                    name: source,
                    expected: if parsed.hooks { "hooks" } else { "route" },
                    actual: declaration.kind(),
                });
            }

            declarations.push(
                RouteDeclaration::new(parsed.methods, parsed.pattern, declaration.clone())
                    .with_source(source),
            );
        }

        Ok(declarations)
    }
}
