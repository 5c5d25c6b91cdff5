//! Built-in sample application served by `waypoint start`.
//!
//! ```text
//! _hooks.rs                 logs every request, stamps x-powered-by
//! index.rs                  *     /
//! index.get.rs              GET   /
//! index.post.rs             POST  /
//! hello/_hooks.post.rs      POST hooks under /hello
//! hello/[name].get.rs       GET   /hello/[name]
//! profile/[name].get.rs     GET   /profile/[name]
//! [...posts]/index.put.rs   PUT   /[...posts]
//! ```

use std::time::Duration;

use axum::http::header::{HeaderName, HeaderValue};
use axum::http::StatusCode;
use serde_json::{Map, Value};

use crate::config::schema::RoutesConfig;
use crate::dispatch::{empty, handler, reply, Context, Next};
use crate::http::request::RequestIdExt;
use crate::mount::{ConventionSource, Registrar};

const POWERED_BY: &str = "x-powered-by";

fn powered_by(cx: &Context) {
    cx.set_header(
        HeaderName::from_static(POWERED_BY),
        HeaderValue::from_static("waypoint"),
    );
}

/// The sample routes, named with the given conventions.
pub fn demo_source(routes: RoutesConfig) -> ConventionSource {
    let ext = routes.extension.clone();
    let name = move |stem: &str| format!("{stem}{ext}");

    ConventionSource::new("demo", routes)
        .hooks(name("_hooks"), |r: &mut Registrar<'_>| {
            r.on_request(|cx: Context, next: Next| async move {
                tracing::info!(request_id = %cx.request_id(), path = %cx.path(), "-->");
                let result = next.run().await;
                tracing::info!(request_id = %cx.request_id(), path = %cx.path(), status = %cx.status(), "<--");
                result
            });
            r.on_request(|cx: Context, next: Next| async move {
                powered_by(&cx);
                next.run().await
            });
        })
        .handler(name("index"), |_cx: Context| async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            reply("Postman Pat!")
        })
        .handler(name("index.get"), |_cx: Context| async { reply("Hello from waypoint.") })
        .handler(name("index.post"), |_cx: Context| async {
            reply("Wait a minute, please Mr. POST-man.")
        })
        .hooks(name("hello/_hooks.post"), |r: &mut Registrar<'_>| {
            r.on_request(|cx: Context, next: Next| async move {
                tracing::debug!(path = %cx.path(), "entered hello");
                next.run().await
            });
        })
        .route(name("hello/[name].get"), |r: &mut Registrar<'_>| {
            r.on_request(|cx: Context, next: Next| async move {
                if cx.param("name") == Some("god") {
                    return cx.respond(
                        StatusCode::OK,
                        "Stop trying to be god, that's not who you are!",
                    );
                }
                next.run().await
            });
            handler(|cx: Context| async move {
                let name = cx.param("name").unwrap_or_default().to_string();
                cx.respond(StatusCode::OK, format!("Hello, {name}"))?;
                empty()
            })
        })
        .handler(name("profile/[name].get"), |cx: Context| async move {
            reply(format!("Welcome {}.", cx.param("name").unwrap_or_default()))
        })
        .handler(name("[...posts]/index.put"), |cx: Context| async move {
            let params: Map<String, Value> = cx
                .params()
                .iter()
                .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                .collect();
            reply(Value::Object(params))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mount::build;

    #[test]
    fn test_demo_mounts() {
        let (table, report) = build(&demo_source(RoutesConfig::default())).unwrap();
        assert_eq!(report.routes, 6);
        assert_eq!(report.hook_scopes, 2);
        assert!(report.skipped.is_empty());

        let hit = table.resolve("GET", "/hello/ana").unwrap();
        assert_eq!(hit.endpoint.source(), "hello/[name].get.rs");
        // root hooks (2) + route-local hook; the POST-only hello scope is excluded
        assert_eq!(hit.endpoint.hook_count(), 3);

        let hit = table.resolve("PUT", "/a/b").unwrap();
        assert_eq!(hit.params.get("posts"), Some("a/b"));
        assert_eq!(table.resolve("DELETE", "/").unwrap().endpoint.source(), "index.rs");
    }
}
