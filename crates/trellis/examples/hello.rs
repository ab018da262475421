//! Minimal trellis server.
//!
//! Run with `cargo run --example hello`, then:
//!
//! ```text
//! curl http://127.0.0.1:8080/greet/Ada
//! curl http://127.0.0.1:8080/healthz
//! ```

use http::{Method, StatusCode};
use trellis::prelude::*;

fn greet(ctx: &mut RequestContext) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move {
        let name = ctx.param("name").unwrap_or("world").to_string();
        Ok(Some(ctx.text(StatusCode::OK, format!("Hello, {name}"))))
    })
}

fn request_logger<'a>(
    ctx: &'a mut RequestContext,
    next: Next<'a>,
) -> BoxFuture<'a, HandlerResult> {
    Box::pin(async move {
        let method = ctx.method().clone();
        let path = ctx.path().to_string();
        let result = next.run(ctx).await;
        tracing::info!(%method, %path, elapsed = ?ctx.elapsed(), "handled");
        result
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut server = Server::new(ServerConfig::default());

    server.wrap(FnMiddleware::new("request-logger", request_logger));
    server.route(Method::GET, "/greet/:name", greet)?;
    server.fast_route(
        Method::GET,
        "/healthz",
        Response::text(StatusCode::OK, "ok"),
    );

    server.listen().await?;
    Ok(())
}
