//! Onion-style execution of a route's hook chain.
//!
//! # Responsibilities
//! - Run hooks in order, then the handler, then unwind in reverse
//! - Guard every `next()` call against re-entry
//!
//! # Design Decisions
//! - One cursor per request, shared by all `Next` handles of that request
//! - The cursor records how many links have been entered; entering link `i`
//!   requires that no link at or beyond `i` was entered before
//! - Calling `next()` past the last link is a no-op that still advances the
//!   cursor, so a handler-side double call is caught too

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::future;

use crate::dispatch::context::Context;
use crate::dispatch::error::DispatchError;
use crate::dispatch::hook::{BoxHook, HookFuture, HookResult};

/// Ordered hooks terminating in the route handler.
#[derive(Clone)]
pub struct DispatchChain {
    links: Arc<[BoxHook]>,
}

impl DispatchChain {
    pub fn new(links: Arc<[BoxHook]>) -> Self {
        Self { links }
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Run the chain for one request. Errors from any link propagate out
    /// unchanged.
    pub async fn run(&self, cx: Context) -> HookResult {
        let next = Next {
            links: Arc::clone(&self.links),
            index: 0,
            cursor: Arc::new(AtomicUsize::new(0)),
            cx,
        };
        next.run().await
    }
}

/// Continuation handed to each hook. Runs the rest of the chain.
#[derive(Clone)]
pub struct Next {
    links: Arc<[BoxHook]>,
    index: usize,
    cursor: Arc<AtomicUsize>,
    cx: Context,
}

impl Next {
    /// Enter the next link. Fails with [`DispatchError::DoubleNext`] when that
    /// link, or a later one, has already been entered.
    pub fn run(&self) -> HookFuture {
        let entered = self.cursor.fetch_max(self.index + 1, Ordering::AcqRel);
        if entered > self.index {
            tracing::error!(
                index = self.index,
                entered,
                path = %self.cx.path(),
                "next() called more than once"
            );
            return Box::pin(future::ready(Err(DispatchError::DoubleNext {
                index: self.index,
                entered,
            })));
        }

        match self.links.get(self.index) {
            Some(link) => {
                let next = Next {
                    links: Arc::clone(&self.links),
                    index: self.index + 1,
                    cursor: Arc::clone(&self.cursor),
                    cx: self.cx.clone(),
                };
                link.call(self.cx.clone(), next)
            }
            None => Box::pin(future::ready(Ok(()))),
        }
    }

    /// Position of the link this continuation enters.
    pub fn index(&self) -> usize {
        self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::hook::{self, handler, BoxHandler, Terminal};
    use crate::dispatch::response::ResponseBody;
    use crate::routing::route::{Methods, Route};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    fn context() -> Context {
        let route = Arc::new(Route::new(Methods::get(), "/").unwrap());
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        Context::new(request, route, Default::default(), 1024)
    }

    fn logging_hook(log: &Log, name: &'static str) -> BoxHook {
        let log = log.clone();
        hook::hook(move |_cx: Context, next: Next| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push(format!("{name}-enter"));
                next.run().await?;
                log.lock().unwrap().push(format!("{name}-exit"));
                Ok(())
            }
        })
    }

    fn logging_handler(log: &Log) -> BoxHandler {
        let log = log.clone();
        handler(move |_cx: Context| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push("H".to_string());
                hook::reply("done")
            }
        })
    }

    fn chain(hooks: Vec<BoxHook>, handler: BoxHandler) -> DispatchChain {
        let mut links = hooks;
        links.push(Arc::new(Terminal::new(handler)));
        DispatchChain::new(links.into())
    }

    #[tokio::test]
    async fn test_onion_order() {
        let log: Log = Default::default();
        let chain = chain(
            vec![logging_hook(&log, "A"), logging_hook(&log, "B")],
            logging_handler(&log),
        );

        let cx = context();
        chain.run(cx.clone()).await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["A-enter", "B-enter", "H", "B-exit", "A-exit"]
        );
        let record = cx.into_record();
        assert!(matches!(record.body, ResponseBody::Text(ref s) if s == "done"));
    }

    #[tokio::test]
    async fn test_double_next_fails() {
        let log: Log = Default::default();
        let twice = hook::hook(|_cx: Context, next: Next| async move {
            next.run().await?;
            next.run().await
        });
        let chain = chain(vec![twice], logging_handler(&log));

        let err = chain.run(context()).await.unwrap_err();
        assert!(matches!(err, DispatchError::DoubleNext { index: 1, entered: 3 }));
        // The handler ran exactly once.
        assert_eq!(*log.lock().unwrap(), vec!["H"]);
    }

    #[tokio::test]
    async fn test_stale_next_fails() {
        let stash: Arc<Mutex<Option<Next>>> = Default::default();
        let keep = stash.clone();
        let first = hook::hook(move |_cx: Context, next: Next| {
            let keep = keep.clone();
            async move {
                *keep.lock().unwrap() = Some(next.clone());
                next.run().await
            }
        });
        let replay = stash.clone();
        let second = hook::hook(move |_cx: Context, next: Next| {
            let replay = replay.clone();
            async move {
                next.run().await?;
                let stale = replay.lock().unwrap().take().unwrap();
                stale.run().await
            }
        });
        let log: Log = Default::default();
        let chain = chain(vec![first, second], logging_handler(&log));

        let err = chain.run(context()).await.unwrap_err();
        assert!(matches!(err, DispatchError::DoubleNext { index: 1, .. }));
    }

    #[tokio::test]
    async fn test_short_circuit() {
        let log: Log = Default::default();
        let gate = hook::hook(|cx: Context, _next: Next| async move {
            cx.set_status(StatusCode::UNAUTHORIZED);
            cx.set_body("denied");
            Ok(())
        });
        let chain = chain(vec![gate, logging_hook(&log, "B")], logging_handler(&log));

        let cx = context();
        chain.run(cx.clone()).await.unwrap();

        assert!(log.lock().unwrap().is_empty());
        let record = cx.into_record();
        assert_eq!(record.status, StatusCode::UNAUTHORIZED);
        assert!(matches!(record.body, ResponseBody::Text(ref s) if s == "denied"));
    }

    #[tokio::test]
    async fn test_errors_propagate_through_hooks() {
        let log: Log = Default::default();
        let failing = handler(|_cx: Context| async move {
            Err(DispatchError::handler("boom"))
        });
        let chain = chain(vec![logging_hook(&log, "A")], failing);

        let err = chain.run(context()).await.unwrap_err();
        assert!(matches!(err, DispatchError::Handler(_)));
        // A never reached its exit phase.
        assert_eq!(*log.lock().unwrap(), vec!["A-enter"]);
    }

    #[tokio::test]
    async fn test_handler_body_ignored_after_respond() {
        let responder = hook::hook(|cx: Context, next: Next| async move {
            cx.respond(StatusCode::ACCEPTED, "early")?;
            next.run().await
        });
        let log: Log = Default::default();
        let chain = chain(vec![responder], logging_handler(&log));

        let cx = context();
        chain.run(cx.clone()).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["H"]);
        let record = cx.into_record();
        assert_eq!(record.status, StatusCode::ACCEPTED);
        assert!(matches!(record.body, ResponseBody::Text(ref s) if s == "early"));
    }
}
