use std::sync::{Arc, Mutex};

use http::{Method, StatusCode};
use serde_json::json;

use switchback::dispatcher::{DispatchRequest, Dispatcher, HandlerResponse, ResponseBody};
use switchback::error::{ErrorKind, RouteError};
use switchback::layer::{ErrorSchemaLayer, LayerFn, Next, Outcome};
use switchback::registry::{MediaKind, MethodSpec, Registry, RouteModule, RouteScope};
use switchback::runtime_config::RuntimeConfig;
use switchback::RequestContext;

fn dispatcher(scope: RouteScope) -> Dispatcher {
    dispatcher_with(scope, RuntimeConfig::default())
}

fn dispatcher_with(scope: RouteScope, config: RuntimeConfig) -> Dispatcher {
    let mut registry = Registry::new();
    registry.mount(scope).unwrap();
    Dispatcher::with_config(registry, &config)
}

fn body_json(response: &HandlerResponse) -> serde_json::Value {
    response.body_json().expect("json body").clone()
}

#[test]
fn dispatch_binds_params_and_returns_handler_response() {
    let d = dispatcher(RouteScope::new("/").route(
        "/users/[id]",
        RouteModule::new().get("get_user", |ctx: &mut RequestContext| -> Outcome {
            Ok(HandlerResponse::json(json!({ "id": ctx.get_param("id") })))
        }),
    ));
    let response = d.dispatch(DispatchRequest::get("/users/42"));
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(body_json(&response), json!({ "id": "42" }));
    assert_eq!(response.get_header("content-type"), Some("application/json"));
    assert!(response.get_header("x-request-id").is_some());
}

#[test]
fn unmatched_path_is_negotiated_not_found() {
    let d = dispatcher(RouteScope::new("/").route(
        "/only",
        RouteModule::new().get("only", |_: &mut RequestContext| -> Outcome {
            Ok(HandlerResponse::empty())
        }),
    ));

    let response = d.dispatch(DispatchRequest::get("/nowhere"));
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(body_json(&response)["error"], json!("not_found"));

    let response = d.dispatch(DispatchRequest::get("/nowhere").with_header("accept", "text/html"));
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.get_header("content-type"), Some("text/html"));
}

#[test]
fn accept_header_selects_among_equal_rank_bindings() {
    let module = RouteModule::new()
        .get("json", |_: &mut RequestContext| -> Outcome {
            Ok(HandlerResponse::json(json!({ "kind": "json" })))
        })
        .on(
            MethodSpec::Only(Method::GET),
            MediaKind::Html,
            "html",
            |_: &mut RequestContext| -> Outcome { Ok(HandlerResponse::html("<p>html</p>")) },
        );
    let d = dispatcher(RouteScope::new("/").route("/page", module));

    // No preference: first declared binding wins.
    let response = d.dispatch(DispatchRequest::get("/page"));
    assert_eq!(body_json(&response)["kind"], json!("json"));

    let response = d.dispatch(DispatchRequest::get("/page").with_header("accept", "text/html"));
    assert_eq!(response.get_header("content-type"), Some("text/html"));

    // Nothing acceptable anywhere: resolution fails as not-found.
    let response = d.dispatch(DispatchRequest::get("/page").with_header("accept", "image/png"));
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[test]
fn negotiation_falls_through_to_less_specific_candidates() {
    let d = dispatcher(
        RouteScope::new("/")
            .route(
                "/feed",
                RouteModule::new().get("feed_json", |_: &mut RequestContext| -> Outcome {
                    Ok(HandlerResponse::json(json!({ "specific": true })))
                }),
            )
            .route(
                "/[page]",
                RouteModule::new().on(
                    MethodSpec::Only(Method::GET),
                    MediaKind::Html,
                    "page_html",
                    |_: &mut RequestContext| -> Outcome {
                        Ok(HandlerResponse::html("<p>fallback</p>"))
                    },
                ),
            ),
    );
    let response = d.dispatch(DispatchRequest::get("/feed").with_header("accept", "text/html"));
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.get_header("content-type"), Some("text/html"));
}

#[test]
fn declared_error_is_caught_by_error_schema_layer() {
    let d = dispatcher(
        RouteScope::new("/")
            .layer(Arc::new(ErrorSchemaLayer::catching([ErrorKind::NotFound])))
            .route(
                "/users/[id]",
                RouteModule::new().get("get_user", |_: &mut RequestContext| -> Outcome {
                    Err(RouteError::not_found("no such user"))
                }),
            ),
    );
    let response = d.dispatch(DispatchRequest::get("/users/0"));
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(body_json(&response)["error"], json!("not_found"));
}

#[test]
fn uncaught_declared_error_becomes_500() {
    let d = dispatcher(
        RouteScope::new("/")
            .layer(Arc::new(ErrorSchemaLayer::catching([ErrorKind::NotFound])))
            .route(
                "/locked",
                RouteModule::new().get("locked", |_: &mut RequestContext| -> Outcome {
                    Err(RouteError::unauthorized("no token"))
                }),
            ),
    );
    let response = d.dispatch(DispatchRequest::get("/locked"));
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(&response);
    assert_eq!(body["error"], json!("unauthorized"));
    assert_eq!(body["message"], json!("no token"));
}

#[test]
fn panicking_handler_becomes_500_without_diagnostics() {
    let d = dispatcher(RouteScope::new("/").route(
        "/boom",
        RouteModule::new().get("boom", |_: &mut RequestContext| -> Outcome {
            panic!("handler exploded")
        }),
    ));
    let response = d.dispatch(DispatchRequest::get("/boom"));
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(&response);
    assert_eq!(body["error"], json!(null));
    assert!(body.get("stack").is_none());
}

#[test]
fn dev_mode_exposes_panic_details() {
    let config = RuntimeConfig {
        dev: true,
        ..RuntimeConfig::default()
    };
    let d = dispatcher_with(
        RouteScope::new("/").route(
            "/boom",
            RouteModule::new().get("boom", |_: &mut RequestContext| -> Outcome {
                panic!("handler exploded")
            }),
        ),
        config,
    );
    let response = d.dispatch(DispatchRequest::get("/boom"));
    let body = body_json(&response);
    assert_eq!(body["stack"], json!(["handler exploded"]));
}

#[test]
fn layers_run_outer_in_then_inner_out() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let record = |name: &'static str, order: &Arc<Mutex<Vec<String>>>| {
        let order = order.clone();
        LayerFn::new(name, move |ctx: &mut RequestContext, next: Next<'_>| {
            order.lock().unwrap().push(format!("{name}:in"));
            let outcome = next.run(ctx);
            order.lock().unwrap().push(format!("{name}:out"));
            outcome
        })
    };
    let d = dispatcher(
        RouteScope::new("/")
            .layer(Arc::new(record("outer", &order)))
            .child(
                RouteScope::new("/api")
                    .layer(Arc::new(record("inner", &order)))
                    .route(
                        "/ping",
                        RouteModule::new().get("ping", |_: &mut RequestContext| -> Outcome {
                            Ok(HandlerResponse::empty())
                        }),
                    ),
            ),
    );
    d.dispatch(DispatchRequest::get("/api/ping"));
    assert_eq!(
        *order.lock().unwrap(),
        vec!["outer:in", "inner:in", "inner:out", "outer:out"]
    );
}

#[test]
fn same_prefix_siblings_keep_their_own_layer_stacks() {
    let ran = Arc::new(Mutex::new(Vec::new()));
    let tag = |name: &'static str, ran: &Arc<Mutex<Vec<String>>>| {
        let ran = ran.clone();
        LayerFn::new(name, move |ctx: &mut RequestContext, next: Next<'_>| {
            ran.lock().unwrap().push(name.to_string());
            next.run(ctx)
        })
    };
    // First sibling declares a layer but no routes; the second, under the
    // same prefix, must still run only its own stack.
    let d = dispatcher(
        RouteScope::new("/")
            .child(RouteScope::new("/x").layer(Arc::new(tag("first", &ran))))
            .child(
                RouteScope::new("/x").layer(Arc::new(tag("second", &ran))).route(
                    "/r",
                    RouteModule::new().get("r", |_: &mut RequestContext| -> Outcome {
                        Ok(HandlerResponse::empty())
                    }),
                ),
            ),
    );
    let response = d.dispatch(DispatchRequest::get("/x/r"));
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert_eq!(*ran.lock().unwrap(), vec!["second"]);
}

#[test]
fn layer_can_short_circuit_the_chain() {
    let gate = Arc::new(LayerFn::new(
        "gate",
        |ctx: &mut RequestContext, next: Next<'_>| {
            if ctx.get_header("authorization").is_none() {
                return Ok(HandlerResponse::json(json!({ "blocked": true }))
                    .with_status(StatusCode::UNAUTHORIZED));
            }
            next.run(ctx)
        },
    ));
    let d = dispatcher(RouteScope::new("/").layer(gate).route(
        "/secret",
        RouteModule::new().get("secret", |_: &mut RequestContext| -> Outcome {
            Ok(HandlerResponse::json(json!({ "secret": 42 })))
        }),
    ));

    let response = d.dispatch(DispatchRequest::get("/secret"));
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response =
        d.dispatch(DispatchRequest::get("/secret").with_header("authorization", "Bearer t"));
    assert_eq!(body_json(&response)["secret"], json!(42));
}

#[test]
fn schema_bindings_accrete_into_the_context() {
    let module = RouteModule::new()
        .bind_query("page")
        .bind_header("x-tenant")
        .bind_body()
        .post("create", |ctx: &mut RequestContext| -> Outcome {
            Ok(HandlerResponse::json(json!({
                "page": ctx.binding("page"),
                "tenant": ctx.binding("x-tenant"),
                "body": ctx.binding("body"),
            })))
        });
    let d = dispatcher(RouteScope::new("/").route("/items", module));

    let response = d.dispatch(
        DispatchRequest::post("/items?page=3")
            .with_header("x-tenant", "acme")
            .with_body(json!({ "name": "widget" })),
    );
    assert_eq!(
        body_json(&response),
        json!({ "page": "3", "tenant": "acme", "body": { "name": "widget" } })
    );

    // Required body missing fails before the handler runs.
    let response = d.dispatch(DispatchRequest::post("/items?page=3"));
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(&response)["error"], json!("bad_request"));
}

#[test]
fn valid_correlation_header_is_echoed() {
    let d = dispatcher(RouteScope::new("/").route(
        "/ping",
        RouteModule::new().get("ping", |_: &mut RequestContext| -> Outcome {
            Ok(HandlerResponse::empty())
        }),
    ));
    let id = "01ARZ3NDEKTSV4RRFFQ69G5FAV";
    let response = d.dispatch(DispatchRequest::get("/ping").with_header("x-request-id", id));
    assert_eq!(response.get_header("x-request-id"), Some(id));
}

#[test]
fn query_and_cookie_accessors_use_last_occurrence() {
    let d = dispatcher(RouteScope::new("/").route(
        "/echo",
        RouteModule::new().get("echo", |ctx: &mut RequestContext| -> Outcome {
            Ok(HandlerResponse::json(json!({
                "q": ctx.get_query("q"),
                "session": ctx.get_cookie("session"),
            })))
        }),
    ));
    let response = d.dispatch(
        DispatchRequest::get("/echo?q=first&q=second")
            .with_header("cookie", "session=abc; theme=dark"),
    );
    assert_eq!(
        body_json(&response),
        json!({ "q": "second", "session": "abc" })
    );
}

#[test]
fn streaming_response_carries_event_stream_body() {
    let module = RouteModule::new().on(
        MethodSpec::Only(Method::GET),
        MediaKind::EventStream,
        "events",
        |_: &mut RequestContext| -> Outcome {
            let (tx, rx) = switchback::stream::channel(2);
            switchback::stream::spawn_producer(&RuntimeConfig::default(), move || {
                let _ = tx.send_event("one");
                let _ = tx.send_event("two");
            })
            .map_err(|e| RouteError::internal(e.to_string()))?;
            Ok(HandlerResponse::stream(rx))
        },
    );
    let d = dispatcher(RouteScope::new("/").route("/events", module));
    let response = d.dispatch(DispatchRequest::get("/events"));
    assert_eq!(response.get_header("content-type"), Some("text/event-stream"));
    match response.body {
        ResponseBody::Stream(receiver) => {
            assert_eq!(receiver.collect(), "data: one\n\ndata: two\n\n");
        }
        other => panic!("expected stream body, got {other:?}"),
    }
}
