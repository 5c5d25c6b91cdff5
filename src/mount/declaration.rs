//! Route declarations and the sources that yield them.

use std::fmt;
use std::sync::Arc;

use crate::dispatch::hook::{self as hooks, BoxHandler, BoxHook, Handler, Hook};
use crate::mount::error::SourceError;
use crate::routing::route::{Methods, Route};

/// Builds a handler, optionally registering route-local hooks.
pub type RouteFactory = Arc<dyn Fn(&mut Registrar<'_>) -> BoxHandler + Send + Sync>;

/// Registers hooks for every route under a scope.
pub type HooksFactory = Arc<dyn Fn(&mut Registrar<'_>) + Send + Sync>;

/// What a declaration contributes to the table.
#[derive(Clone)]
pub enum Declaration {
    /// A plain handler with no local hooks.
    Handler(BoxHandler),
    /// A factory receiving a [`Registrar`] and returning the handler.
    Route(RouteFactory),
    /// A hooks-only factory whose hooks apply to a whole scope.
    Hooks(HooksFactory),
}

impl Declaration {
    pub fn handler<H: Handler>(handler: H) -> Self {
        Declaration::Handler(hooks::handler(handler))
    }

    pub fn route<F>(factory: F) -> Self
    where
        F: Fn(&mut Registrar<'_>) -> BoxHandler + Send + Sync + 'static,
    {
        Declaration::Route(Arc::new(factory))
    }

    pub fn hooks<F>(factory: F) -> Self
    where
        F: Fn(&mut Registrar<'_>) + Send + Sync + 'static,
    {
        Declaration::Hooks(Arc::new(factory))
    }

    pub fn is_hooks(&self) -> bool {
        matches!(self, Declaration::Hooks(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Declaration::Handler(_) => "handler",
            Declaration::Route(_) => "route",
            Declaration::Hooks(_) => "hooks",
        }
    }
}

impl fmt::Debug for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// One entry produced by a [`RouteSource`].
#[derive(Debug, Clone)]
pub struct RouteDeclaration {
    pub methods: Methods,
    pub pattern: String,
    pub declaration: Declaration,
    /// Identifier of where the declaration came from, used in logs and
    /// conflict errors.
    pub source: String,
}

impl RouteDeclaration {
    pub fn new(methods: Methods, pattern: impl Into<String>, declaration: Declaration) -> Self {
        let pattern = pattern.into();
        let source = format!("{} {}", methods, pattern);
        Self {
            methods,
            pattern,
            declaration,
            source,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

/// API handed to route and hooks factories during mount.
pub struct Registrar<'a> {
    route: &'a Arc<Route>,
    hooks: Vec<BoxHook>,
}

impl<'a> Registrar<'a> {
    pub(crate) fn new(route: &'a Arc<Route>) -> Self {
        Self {
            route,
            hooks: Vec::new(),
        }
    }

    /// The route (or scope) being declared.
    pub fn route(&self) -> &Arc<Route> {
        self.route
    }

    pub fn methods(&self) -> &Methods {
        self.route.methods()
    }

    pub fn pattern(&self) -> &str {
        self.route.pattern()
    }

    pub fn param_names(&self) -> &[String] {
        self.route.param_names()
    }

    /// Register a hook. Hooks run in registration order.
    pub fn on_request<H: Hook>(&mut self, hook: H) {
        self.hooks.push(hooks::hook(hook));
    }

    pub(crate) fn into_hooks(self) -> Vec<BoxHook> {
        self.hooks
    }
}

/// Yields the declarations a table is mounted from. Called again on every
/// remount.
pub trait RouteSource: Send + Sync {
    /// Short name for logs.
    fn id(&self) -> &str;

    fn declarations(&self) -> Result<Vec<RouteDeclaration>, SourceError>;
}

impl RouteSource for Vec<RouteDeclaration> {
    fn id(&self) -> &str {
        "inline"
    }

    fn declarations(&self) -> Result<Vec<RouteDeclaration>, SourceError> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{empty, handler, Context, Next};

    #[test]
    fn test_default_source_id() {
        let decl = RouteDeclaration::new(
            Methods::only(["POST", "GET"]),
            "/posts/[id]",
            Declaration::handler(|_cx: Context| async { empty() }),
        );
        assert_eq!(decl.source, "GET,POST /posts/[id]");
        assert_eq!(decl.with_source("posts/[id].rs").source, "posts/[id].rs");
    }

    #[test]
    fn test_registrar_collects_hooks() {
        let route = Arc::new(Route::new(Methods::get(), "/hello/[name]").unwrap());
        let mut registrar = Registrar::new(&route);
        assert_eq!(registrar.pattern(), "/hello/[name]");
        assert_eq!(registrar.param_names(), ["name"]);

        registrar.on_request(|_cx: Context, next: Next| async move { next.run().await });
        registrar.on_request(|_cx: Context, next: Next| async move { next.run().await });
        assert_eq!(registrar.into_hooks().len(), 2);
    }

    #[test]
    fn test_route_factory_kind() {
        let decl = Declaration::route(|_r: &mut Registrar<'_>| {
            handler(|_cx: Context| async { empty() })
        });
        assert_eq!(decl.kind(), "route");
        assert!(!decl.is_hooks());
        assert!(Declaration::hooks(|_r: &mut Registrar<'_>| {}).is_hooks());
    }
}
