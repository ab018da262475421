//! Middleware pipeline composer.
//!
//! The pipeline owns the global middleware stages registered on a server.
//! Per request, [`Pipeline::run`] composes the full onion from back to
//! front (route-specific stages innermost, the fall-through terminal at
//! the very center) and drives it with a single `await`.

use std::sync::Arc;

use trellis_core::RequestContext;

use crate::middleware::{HandlerResult, Middleware, Next};

/// A type-erased middleware that can be stored and shared.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// The per-route middleware chain stored in the router.
///
/// By convention the last element is a [`Terminal`](crate::Terminal)
/// wrapping the route handler.
pub type HandlerChain = Vec<BoxedMiddleware>;

/// Ordered global middleware, composed around every route chain.
///
/// Global stages run outermost, in registration order; route stages run
/// inside them, also in registration order; the route handler sits at the
/// center. A request that reaches the very center without producing a
/// response falls through with `Ok(None)`.
///
/// # Example
///
/// ```
/// use trellis_middleware::{BoxFuture, HandlerResult, Next, Pipeline};
/// use trellis_core::RequestContext;
///
/// fn noop<'a>(ctx: &'a mut RequestContext, next: Next<'a>) -> BoxFuture<'a, HandlerResult> {
///     Box::pin(async move { next.run(ctx).await })
/// }
///
/// let mut pipeline = Pipeline::new();
/// pipeline.add(trellis_middleware::FnMiddleware::new("noop", noop));
/// assert_eq!(pipeline.stage_names(), vec!["noop"]);
/// ```
#[derive(Default)]
pub struct Pipeline {
    /// Global stages, outermost first.
    stages: Vec<BoxedMiddleware>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Appends a global middleware stage.
    ///
    /// Stages run in the order they were added.
    pub fn add<M: Middleware>(&mut self, middleware: M) {
        self.stages.push(Arc::new(middleware));
    }

    /// Appends an already-shared global middleware stage.
    pub fn add_shared(&mut self, middleware: BoxedMiddleware) {
        self.stages.push(middleware);
    }

    /// Returns the names of all global stages in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|mw| mw.name()).collect()
    }

    /// Returns the number of global stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Runs the composed chain for one request.
    ///
    /// `route_chain` holds the stages registered for the matched route
    /// (terminal handler last); pass an empty slice when no route matched
    /// so global middleware still observe the request.
    pub async fn run(
        &self,
        ctx: &mut RequestContext,
        route_chain: &[BoxedMiddleware],
    ) -> HandlerResult {
        let mut next = Next::fall_through();
        for middleware in route_chain.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        for middleware in self.stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        next.run(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{BoxFuture, Terminal};
    use http::StatusCode;
    use std::sync::Mutex;

    /// Records in/out order into a shared log.
    struct Tracer {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Middleware for Tracer {
        fn name(&self) -> &'static str {
            self.name
        }

        fn handle<'a>(
            &'a self,
            ctx: &'a mut RequestContext,
            next: Next<'a>,
        ) -> BoxFuture<'a, HandlerResult> {
            Box::pin(async move {
                self.log.lock().unwrap().push(format!("{}-in", self.name));
                let result = next.run(ctx).await;
                self.log.lock().unwrap().push(format!("{}-out", self.name));
                result
            })
        }
    }

    struct Blocker;

    impl Middleware for Blocker {
        fn name(&self) -> &'static str {
            "blocker"
        }

        fn handle<'a>(
            &'a self,
            ctx: &'a mut RequestContext,
            _next: Next<'a>,
        ) -> BoxFuture<'a, HandlerResult> {
            Box::pin(async move { Ok(Some(ctx.text(StatusCode::FORBIDDEN, "blocked"))) })
        }
    }

    struct Replacer;

    impl Middleware for Replacer {
        fn name(&self) -> &'static str {
            "replacer"
        }

        fn handle<'a>(
            &'a self,
            ctx: &'a mut RequestContext,
            next: Next<'a>,
        ) -> BoxFuture<'a, HandlerResult> {
            Box::pin(async move {
                let _inner = next.run(ctx).await?;
                Ok(Some(ctx.text(StatusCode::ACCEPTED, "replaced")))
            })
        }
    }

    struct OkHandler {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl crate::Handler for OkHandler {
        fn call<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, HandlerResult> {
            Box::pin(async move {
                self.log.lock().unwrap().push("handler".to_string());
                Ok(Some(ctx.text(StatusCode::OK, "done")))
            })
        }
    }

    fn handler_chain(log: &Arc<Mutex<Vec<String>>>) -> HandlerChain {
        vec![Arc::new(Terminal::new(OkHandler {
            log: Arc::clone(log),
        }))]
    }

    #[tokio::test]
    async fn test_onion_ordering() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = Pipeline::new();
        pipeline.add(Tracer {
            name: "a",
            log: Arc::clone(&log),
        });
        pipeline.add(Tracer {
            name: "b",
            log: Arc::clone(&log),
        });

        let route_chain: HandlerChain = {
            let mut chain = vec![Arc::new(Tracer {
                name: "c",
                log: Arc::clone(&log),
            }) as BoxedMiddleware];
            chain.extend(handler_chain(&log));
            chain
        };

        let mut ctx = RequestContext::new();
        let resp = pipeline.run(&mut ctx, &route_chain).await.unwrap().unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["a-in", "b-in", "c-in", "handler", "c-out", "b-out", "a-out"]
        );
    }

    #[tokio::test]
    async fn test_short_circuit_skips_downstream() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = Pipeline::new();
        pipeline.add(Tracer {
            name: "outer",
            log: Arc::clone(&log),
        });
        pipeline.add(Blocker);

        let route_chain = handler_chain(&log);

        let mut ctx = RequestContext::new();
        let resp = pipeline.run(&mut ctx, &route_chain).await.unwrap().unwrap();

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        // The handler never ran; the outer stage still unwound.
        assert_eq!(*log.lock().unwrap(), vec!["outer-in", "outer-out"]);
    }

    #[tokio::test]
    async fn test_response_replacement() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = Pipeline::new();
        pipeline.add(Replacer);

        let mut ctx = RequestContext::new();
        let resp = pipeline
            .run(&mut ctx, &handler_chain(&log))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert_eq!(resp.body(), "replaced".as_bytes());
    }

    #[tokio::test]
    async fn test_empty_chain_falls_through() {
        let pipeline = Pipeline::new();
        let mut ctx = RequestContext::new();

        let result = pipeline.run(&mut ctx, &[]).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_error_propagates_through_stages() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = Pipeline::new();
        pipeline.add(Tracer {
            name: "outer",
            log: Arc::clone(&log),
        });

        fn failing(_ctx: &mut RequestContext) -> BoxFuture<'_, HandlerResult> {
            Box::pin(async move { Err(trellis_core::Error::internal("boom")) })
        }
        let route_chain: HandlerChain = vec![Arc::new(Terminal::new(failing))];

        let mut ctx = RequestContext::new();
        let result = pipeline.run(&mut ctx, &route_chain).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_stage_bookkeeping() {
        let mut pipeline = Pipeline::new();
        assert_eq!(pipeline.stage_count(), 0);

        pipeline.add(Blocker);
        pipeline.add(Replacer);
        assert_eq!(pipeline.stage_names(), vec!["blocker", "replacer"]);
    }
}
