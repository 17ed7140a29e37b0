//! # Dispatcher Module
//!
//! The dispatcher owns the request lifecycle: look up candidates in the
//! route index, negotiate a media kind among equally-ranked candidates,
//! build the request context, run the handler chain, and turn every failure
//! mode into a response.
//!
//! ## Failure taxonomy
//!
//! * No candidate (or none producing an acceptable media kind): `404` in
//!   the client's preferred representation.
//! * A [`RouteError`](crate::error::RouteError) caught by an
//!   [`ErrorSchemaLayer`](crate::layer::ErrorSchemaLayer) inside the chain:
//!   a response with the kind's own status. The dispatcher never sees it.
//! * An error escaping the chain uncaught, or a handler panic: `500` with a
//!   structured body, regardless of the error's kind. Panic details are only
//!   exposed when dev mode is on.

mod context;
mod core;

pub use context::{DispatchRequest, HandlerResponse, RequestContext, ResponseBody};
pub use core::{AcceptPreference, Dispatcher};

use smallvec::SmallVec;
use std::sync::Arc;

/// Request and response headers. Sized so typical requests stay off the
/// heap.
pub type HeaderVec = SmallVec<[(Arc<str>, String); 16]>;
