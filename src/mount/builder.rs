//! Table construction from a route source.
//!
//! # Responsibilities
//! - Compile and intern every declared pattern
//! - Run hooks factories once per scope
//! - Assemble each endpoint's hook chain from its scopes and local hooks
//! - Insert endpoints and seal the table
//!
//! # Design Decisions
//! - A pattern error drops only its own declaration and is reported
//! - A conflict fails the whole build; nothing is published
//! - Scopes apply shallowest first, then in declaration order
//! - Scopes attach by path at build time; a method-specific scope's hooks
//!   are filtered by the request method at dispatch

use std::sync::Arc;

use crate::dispatch::chain::Next;
use crate::dispatch::context::Context;
use crate::dispatch::hook::{BoxHook, Hook, HookFuture};
use crate::mount::declaration::{Declaration, Registrar, RouteSource};
use crate::mount::error::{MountError, SkippedDeclaration};
use crate::routing::matcher::Segment;
use crate::routing::route::{Endpoint, MethodToken, Methods, Route, RouteInterner};
use crate::routing::router::RouteTable;

/// Summary of a successful build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountReport {
    /// Source the table was built from.
    pub source: String,
    /// Endpoints inserted.
    pub routes: usize,
    /// Hooks declarations applied.
    pub hook_scopes: usize,
    /// Declarations dropped because their pattern failed to compile.
    pub skipped: Vec<SkippedDeclaration>,
}

/// Hooks registered for every route below a path.
struct Scope {
    route: Arc<Route>,
    hooks: Vec<BoxHook>,
}

impl Scope {
    fn depth(&self) -> usize {
        self.route.matcher().segments().len()
    }

    /// Whether this scope covers `route`: its segments are a leading run of
    /// the route's segments (parameter names ignored) and some request the
    /// route answers could carry one of the scope's methods.
    fn applies_to(&self, route: &Route) -> bool {
        if !may_share_requests(self.route.methods(), route.methods()) {
            return false;
        }

        let scope = self.route.matcher().segments();
        let target = route.matcher().segments();
        scope.len() <= target.len() && scope.iter().zip(target).all(|(a, b)| same_shape(a, b))
    }

    /// The scope's hooks as chain links, gated on the request method unless
    /// the scope is a wildcard.
    fn links(&self) -> impl Iterator<Item = BoxHook> + '_ {
        let methods = self.route.methods();
        self.hooks.iter().map(move |hook| {
            if methods.is_any() {
                Arc::clone(hook)
            } else {
                Arc::new(MethodFilter {
                    methods: methods.clone(),
                    inner: Arc::clone(hook),
                }) as BoxHook
            }
        })
    }
}

fn may_share_requests(scope: &Methods, route: &Methods) -> bool {
    scope.is_any()
        || route.is_any()
        || scope.intersects(route)
        || (route.contains(&MethodToken::named("GET")) && scope.contains(&MethodToken::named("HEAD")))
}

/// Runs `inner` only for requests whose method `methods` accepts; otherwise
/// passes straight through.
struct MethodFilter {
    methods: Methods,
    inner: BoxHook,
}

impl Hook for MethodFilter {
    fn call(&self, cx: Context, next: Next) -> HookFuture {
        if self.methods.accepts(cx.method()) {
            self.inner.call(cx, next)
        } else {
            next.run()
        }
    }
}

fn same_shape(a: &Segment, b: &Segment) -> bool {
    match (a, b) {
        (Segment::Static(x), Segment::Static(y)) => x == y,
        _ => a.kind() == b.kind(),
    }
}

/// Build a sealed table from everything `source` declares.
pub fn build(source: &dyn RouteSource) -> Result<(RouteTable, MountReport), MountError> {
    let declarations = source.declarations()?;

    let mut report = MountReport {
        source: source.id().to_string(),
        ..MountReport::default()
    };
    let mut interner = RouteInterner::new();
    let mut scopes: Vec<Scope> = Vec::new();
    let mut pending = Vec::new();

    for decl in declarations {
        let route = match interner.intern(decl.methods.clone(), &decl.pattern) {
            Ok(route) => route,
            Err(error) => {
                tracing::warn!(
                    source = %decl.source,
                    pattern = %decl.pattern,
                    error = %error,
                    "Skipping declaration with invalid pattern"
                );
                report.skipped.push(SkippedDeclaration {
                    source: decl.source,
                    error,
                });
                continue;
            }
        };

        match decl.declaration {
            Declaration::Hooks(factory) => {
                let mut registrar = Registrar::new(&route);
                factory(&mut registrar);
                let hooks = registrar.into_hooks();
                tracing::debug!(
                    source = %decl.source,
                    scope = %route.pattern(),
                    methods = %route.methods(),
                    hooks = hooks.len(),
                    "Hook scope registered"
                );
                scopes.push(Scope { route, hooks });
            }
            declaration => pending.push((route, declaration, decl.source)),
        }
    }

    report.hook_scopes = scopes.len();
    let mut table = RouteTable::new();

    for (route, declaration, source_id) in pending {
        let (local, handler) = match declaration {
            Declaration::Handler(handler) => (Vec::new(), handler),
            Declaration::Route(factory) => {
                let mut registrar = Registrar::new(&route);
                let handler = factory(&mut registrar);
                (registrar.into_hooks(), handler)
            }
            Declaration::Hooks(_) => continue,
        };

        let mut applicable: Vec<&Scope> = scopes.iter().filter(|s| s.applies_to(&route)).collect();
        applicable.sort_by_key(|s| s.depth());

        let hooks: Vec<BoxHook> = applicable
            .iter()
            .flat_map(|s| s.links())
            .chain(local)
            .collect();

        let endpoint = table.insert(Endpoint::new(route, hooks, handler, source_id))?;
        tracing::debug!(
            methods = %endpoint.route().methods(),
            pattern = %endpoint.route().pattern(),
            source = %endpoint.source(),
            hooks = endpoint.hook_count(),
            "Route mounted"
        );
    }

    table.seal();
    report.routes = table.len();
    Ok((table, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RoutesConfig;
    use crate::dispatch::{empty, handler, reply, Context, DispatchChain, Next};
    use crate::mount::convention::ConventionSource;
    use crate::mount::declaration::RouteDeclaration;
    use crate::mount::error::SourceError;
    use crate::routing::route::Methods;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    fn tag(log: &Log, label: &'static str) -> impl Fn(&mut Registrar<'_>) + Send + Sync + 'static {
        let log = Arc::clone(log);
        move |r: &mut Registrar<'_>| {
            let log = Arc::clone(&log);
            r.on_request(move |_cx: Context, next: Next| {
                let log = Arc::clone(&log);
                async move {
                    log.lock().unwrap().push(label.to_string());
                    next.run().await
                }
            });
        }
    }

    async fn run(table: &RouteTable, method: &str, path: &str) -> Option<String> {
        let hit = table.resolve(method, path)?;
        let request = Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let cx = Context::new(request, Arc::clone(hit.endpoint.route()), hit.params, 1024);
        DispatchChain::new(hit.endpoint.chain()).run(cx.clone()).await.unwrap();
        Some(hit.endpoint.source().to_string())
    }

    #[tokio::test]
    async fn test_scopes_apply_ancestor_first() {
        let log: Log = Arc::default();
        let route_log = Arc::clone(&log);

        let source = ConventionSource::new("test", RoutesConfig::default())
            .hooks("hello/_hooks.rs", tag(&log, "hello"))
            .hooks("_hooks.rs", tag(&log, "root"))
            .route("hello/[name].get.rs", move |r: &mut Registrar<'_>| {
                let log = Arc::clone(&route_log);
                r.on_request(move |_cx: Context, next: Next| {
                    let log = Arc::clone(&log);
                    async move {
                        log.lock().unwrap().push("local".to_string());
                        next.run().await
                    }
                });
                handler(|cx: Context| async move {
                    reply(format!("Hello {}", cx.param("name").unwrap_or_default()))
                })
            })
            .handler("index.get.rs", |_cx: Context| async { empty() });

        let (table, report) = build(&source).unwrap();
        assert_eq!(report.routes, 2);
        assert_eq!(report.hook_scopes, 2);

        run(&table, "GET", "/hello/ana").await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["root", "hello", "local"]);

        log.lock().unwrap().clear();
        run(&table, "GET", "/").await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["root"]);
    }

    #[tokio::test]
    async fn test_scope_method_filter() {
        let log: Log = Arc::default();
        let source = ConventionSource::new("test", RoutesConfig::default())
            .hooks("_hooks.post.rs", tag(&log, "post-only"))
            .hooks("_hooks.rs", tag(&log, "any"))
            .handler("items.get.rs", |_cx: Context| async { empty() })
            .handler("items.post.rs", |_cx: Context| async { empty() });

        let (table, _) = build(&source).unwrap();

        run(&table, "GET", "/items").await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["any"]);

        log.lock().unwrap().clear();
        run(&table, "POST", "/items").await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["post-only", "any"]);
    }

    #[tokio::test]
    async fn test_scope_filters_on_request_method() {
        let log: Log = Arc::default();
        let source = vec![
            RouteDeclaration::new(Methods::post(), "/", Declaration::hooks(tag(&log, "post-only"))),
            RouteDeclaration::new(
                Methods::only(["GET", "POST"]),
                "/items",
                Declaration::handler(|_cx: Context| async { empty() }),
            ),
        ];
        let (table, _) = build(&source).unwrap();

        run(&table, "GET", "/items").await.unwrap();
        assert!(log.lock().unwrap().is_empty());

        run(&table, "POST", "/items").await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["post-only"]);
    }

    #[tokio::test]
    async fn test_method_scope_runs_on_wildcard_route() {
        let log: Log = Arc::default();
        let source = vec![
            RouteDeclaration::new(Methods::get(), "/", Declaration::hooks(tag(&log, "get-only"))),
            RouteDeclaration::new(
                Methods::any(),
                "/page",
                Declaration::handler(|_cx: Context| async { empty() }),
            ),
        ];
        let (table, _) = build(&source).unwrap();

        run(&table, "GET", "/page").await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["get-only"]);

        log.lock().unwrap().clear();
        run(&table, "DELETE", "/page").await.unwrap();
        assert!(log.lock().unwrap().is_empty());

        run(&table, "HEAD", "/page").await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["get-only"]);
    }

    #[test]
    fn test_scope_matches_param_segments_by_kind() {
        let scope = Scope {
            route: Arc::new(Route::new(Methods::any(), "/posts/[id]").unwrap()),
            hooks: Vec::new(),
        };
        let edit = Route::new(Methods::get(), "/posts/[slug]/edit").unwrap();
        let optional = Route::new(Methods::get(), "/posts/[[slug]]").unwrap();
        let other = Route::new(Methods::get(), "/users/[id]").unwrap();

        assert!(scope.applies_to(&edit));
        assert!(!scope.applies_to(&optional));
        assert!(!scope.applies_to(&other));
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let source = vec![
            RouteDeclaration::new(
                Methods::get(),
                "/ok",
                Declaration::handler(|_cx: Context| async { empty() }),
            ),
            RouteDeclaration::new(
                Methods::get(),
                "/broken/[id",
                Declaration::handler(|_cx: Context| async { empty() }),
            )
            .with_source("broken.get.rs"),
        ];

        let (table, report) = build(&source).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].source, "broken.get.rs");
    }

    #[test]
    fn test_conflict_fails_build() {
        let source = ConventionSource::new("test", RoutesConfig::default())
            .handler("posts/[id].get.rs", |_cx: Context| async { empty() })
            .handler("posts/[slug].get.rs", |_cx: Context| async { empty() });

        match build(&source) {
            Err(MountError::Conflict(err)) => {
                assert_eq!(err.existing_source, "posts/[id].get.rs");
                assert_eq!(err.source_id, "posts/[slug].get.rs");
            }
            other => panic!("expected conflict, got {:?}", other.map(|(_, r)| r)),
        }
    }

    #[test]
    fn test_source_error_fails_build() {
        let source = ConventionSource::new("test", RoutesConfig::default())
            .hooks("index.rs", |_r: &mut Registrar<'_>| {});
        assert!(matches!(
            build(&source),
            Err(MountError::Source(SourceError::KindMismatch { .. }))
        ));
    }

    #[test]
    fn test_identical_declarations_share_route() {
        let source = vec![
            RouteDeclaration::new(
                Methods::any(),
                "/",
                Declaration::hooks(|_r: &mut Registrar<'_>| {}),
            ),
            RouteDeclaration::new(
                Methods::any(),
                "/",
                Declaration::handler(|_cx: Context| async { empty() }),
            ),
        ];
        let (table, _) = build(&source).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.endpoints()[0].hook_count(), 0);
    }
}
