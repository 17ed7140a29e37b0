use std::sync::Arc;

use anyhow::Result;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use switchback::dispatcher::{DispatchRequest, Dispatcher, HandlerResponse, ResponseBody};
use switchback::error::{ErrorKind, RouteError};
use switchback::layer::{ErrorSchemaLayer, LayerFn, Next, Outcome};
use switchback::registry::{MediaKind, MethodSpec, Registry, RouteModule, RouteScope};
use switchback::runtime_config::RuntimeConfig;
use switchback::stream;
use switchback::RequestContext;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = RuntimeConfig::from_env();
    info!(stack_size = config.stack_size, dev = config.dev, "Starting demo");

    let mut registry = Registry::new();
    registry.mount(demo_routes())?;
    registry.dump_routes();
    registry.log_summary();

    let dispatcher = Dispatcher::with_config(registry, &config);

    for request in [
        DispatchRequest::get("/api/users/42"),
        DispatchRequest::get("/api/users/0"),
        DispatchRequest::get("/docs"),
        DispatchRequest::get("/docs/en/intro"),
        DispatchRequest::get("/files/reports/2026/q3.pdf"),
        DispatchRequest::get("/api/users/42").with_header("accept", "text/html"),
        DispatchRequest::get("/nowhere"),
        DispatchRequest::get("/events"),
    ] {
        let label = format!("{} {}", request.method, request.path);
        let response = dispatcher.dispatch(request);
        let status = response.status;
        match response.body {
            ResponseBody::Empty => println!("{label} -> {status}"),
            ResponseBody::Json(value) => println!("{label} -> {status} {value}"),
            ResponseBody::Text(text) => println!("{label} -> {status} {text}"),
            ResponseBody::Stream(receiver) => {
                println!("{label} -> {status} (stream)");
                println!("{}", receiver.collect());
            }
        }
    }
    Ok(())
}

fn demo_routes() -> RouteScope {
    let trace_layer = Arc::new(LayerFn::new(
        "trace",
        |ctx: &mut RequestContext, next: Next<'_>| {
            info!(request_id = %ctx.request_id, path = %ctx.path, "Handling");
            next.run(ctx)
        },
    ));

    let users = RouteModule::new()
        .get("get_user", |ctx: &mut RequestContext| -> Outcome {
            let id = ctx
                .get_param("id")
                .ok_or_else(|| RouteError::internal("id param missing"))?;
            if id == "0" {
                return Err(RouteError::not_found(format!("no user {id}")));
            }
            Ok(HandlerResponse::json(json!({ "id": id, "name": "ada" })))
        })
        .on(
            MethodSpec::Only(http::Method::GET),
            MediaKind::Html,
            "get_user_page",
            |ctx: &mut RequestContext| -> Outcome {
                let id = ctx.get_param("id").unwrap_or("?");
                Ok(HandlerResponse::html(format!("<h1>user {id}</h1>")))
            },
        );

    let docs = RouteModule::new().get("docs", |ctx: &mut RequestContext| -> Outcome {
        Ok(HandlerResponse::json(json!({
            "lang": ctx.get_param("lang"),
            "page": ctx.get_param("page"),
        })))
    });

    let files = RouteModule::new().get("file", |ctx: &mut RequestContext| -> Outcome {
        let path = ctx
            .get_param("path")
            .ok_or_else(|| RouteError::not_found("missing file path"))?;
        Ok(HandlerResponse::json(json!({ "file": path })))
    });

    let events = RouteModule::new().on(
        MethodSpec::Only(http::Method::GET),
        MediaKind::EventStream,
        "events",
        |ctx: &mut RequestContext| -> Outcome {
            let (tx, rx) = stream::channel(4);
            let config = RuntimeConfig::from_env();
            let request_id = ctx.request_id;
            stream::spawn_producer(&config, move || {
                for n in 0..3 {
                    let frame = json!({ "seq": n, "request_id": request_id });
                    if tx.send_event(frame.to_string()).is_err() {
                        break;
                    }
                }
            })
            .map_err(|e| RouteError::internal(format!("stream spawn failed: {e}")))?;
            Ok(HandlerResponse::stream(rx))
        },
    );

    RouteScope::new("/")
        .layer(trace_layer)
        .child(
            RouteScope::new("/api")
                .layer(Arc::new(ErrorSchemaLayer::catching(vec![
                    ErrorKind::NotFound,
                    ErrorKind::Unprocessable,
                ])))
                .route("/users/[id]", users),
        )
        .route("/docs/[[lang]]/[[page]]", docs)
        .route("/files/[...path]", files)
        .route("/events", events)
}
