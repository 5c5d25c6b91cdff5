//! Hook and handler callables.
//!
//! Hooks are onion-style middleware: they receive the request [`Context`]
//! and a [`Next`] continuation and may run code before and after calling
//! `next.run().await`. Handlers are the terminal link and return an optional
//! response body.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::dispatch::chain::Next;
use crate::dispatch::context::Context;
use crate::dispatch::error::DispatchError;
use crate::dispatch::response::ResponseBody;

/// Result of one hook invocation.
pub type HookResult = Result<(), DispatchError>;

/// Result of a handler: `Some(body)` becomes the response body.
pub type Reply = Result<Option<ResponseBody>, DispatchError>;

pub type HookFuture = BoxFuture<'static, HookResult>;
pub type HandlerFuture = BoxFuture<'static, Reply>;

/// A middleware link in the dispatch chain.
pub trait Hook: Send + Sync + 'static {
    fn call(&self, cx: Context, next: Next) -> HookFuture;
}

/// The terminal callable of a route.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, cx: Context) -> HandlerFuture;
}

pub type BoxHook = Arc<dyn Hook>;
pub type BoxHandler = Arc<dyn Handler>;

impl<F, Fut> Hook for F
where
    F: Fn(Context, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HookResult> + Send + 'static,
{
    fn call(&self, cx: Context, next: Next) -> HookFuture {
        Box::pin(self(cx, next))
    }
}

impl<F, Fut> Handler for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Reply> + Send + 'static,
{
    fn call(&self, cx: Context) -> HandlerFuture {
        Box::pin(self(cx))
    }
}

/// Box a hook for storage in a chain.
pub fn hook<H: Hook>(hook: H) -> BoxHook {
    Arc::new(hook)
}

/// Box a handler for storage in a declaration.
pub fn handler<H: Handler>(handler: H) -> BoxHandler {
    Arc::new(handler)
}

/// Handler reply without a body.
pub fn empty() -> Reply {
    Ok(None)
}

/// Handler reply with a body.
pub fn reply(body: impl Into<ResponseBody>) -> Reply {
    Ok(Some(body.into()))
}

/// Wraps the route handler as the last link of the chain.
pub(crate) struct Terminal {
    handler: BoxHandler,
}

impl Terminal {
    pub(crate) fn new(handler: BoxHandler) -> Self {
        Self { handler }
    }
}

impl Hook for Terminal {
    fn call(&self, cx: Context, next: Next) -> HookFuture {
        let reply = self.handler.call(cx.clone());
        Box::pin(async move {
            if let Some(body) = reply.await? {
                if !cx.responded() {
                    cx.set_body(body);
                }
            }
            next.run().await
        })
    }
}
