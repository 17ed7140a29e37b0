//! # switchback
//!
//! A route resolution and dispatch engine built on segment patterns.
//!
//! Route patterns are parsed into typed segment sequences (literals, params,
//! optional params, rest captures and zero-width groups) in any of three
//! interchangeable styles. A registry collects route declarations, either
//! directly or through nestable scope trees, and a trie index resolves
//! request paths to every covering entry, ordered by specificity. The
//! dispatcher negotiates a media kind among equally-specific candidates,
//! runs the route's layer chain, and maps the whole failure taxonomy to
//! responses.
//!
//! ## Quick start
//!
//! ```no_run
//! use serde_json::json;
//! use switchback::{
//!     DispatchRequest, Dispatcher, HandlerResponse, Outcome, Registry, RequestContext,
//!     RouteModule, RouteScope,
//! };
//!
//! let get_user = |ctx: &mut RequestContext| -> Outcome {
//!     Ok(HandlerResponse::json(json!({ "id": ctx.get_param("id") })))
//! };
//!
//! let mut registry = Registry::new();
//! registry
//!     .mount(RouteScope::new("/api").route(
//!         "/users/[id]",
//!         RouteModule::new().get("get_user", get_user),
//!     ))
//!     .unwrap();
//!
//! let dispatcher = Dispatcher::new(registry);
//! let response = dispatcher.dispatch(DispatchRequest::get("/api/users/42"));
//! assert_eq!(response.status.as_u16(), 200);
//! ```

pub mod cache;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod layer;
pub mod pattern;
pub mod registry;
pub mod router;
pub mod runtime_config;
pub mod stream;

pub use dispatcher::{DispatchRequest, Dispatcher, HandlerResponse, RequestContext, ResponseBody};
pub use error::{ErrorKind, RouteError};
pub use layer::{Handler, HandlerChain, Layer, Outcome};
pub use pattern::{PatternStyle, Segment};
pub use registry::{MediaKind, MethodSpec, Registry, RouteModule, RouteScope};
pub use router::TrieIndex;
