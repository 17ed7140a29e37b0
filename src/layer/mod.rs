//! # Layer Module
//!
//! Layers are the nested wrappers around a leaf handler: each enclosing
//! layer may transform the request context before invoking the rest of the
//! chain, skip the rest of the chain entirely (short-circuit), or transform
//! the outcome on the way back out.
//!
//! ## Composition
//!
//! [`HandlerChain::compose`] nests layers in declaration order: the first
//! declared layer is outermost. At request time the chain is driven by
//! [`Next`], a borrowed continuation over the remaining layers and the leaf.
//! Ordering guarantees hold only within one request's chain: outer before
//! inner on the way in, inner before outer on the way out.
//!
//! ## Context accretion
//!
//! Schema layers ([`SchemaLayer`]) extract named values from headers,
//! cookies, query parameters or the body and merge them into
//! [`RequestContext::bindings`](crate::dispatcher::RequestContext). Bindings
//! accumulate additively down the chain; an insertion only shadows an
//! earlier binding of the same name.
//!
//! ## Error schemas
//!
//! [`ErrorSchemaLayer`] declares the [`ErrorKind`](crate::error::ErrorKind)s
//! it catches. A declared error propagating outward stops at the first layer
//! catching its kind and becomes a response with that kind's status; layers
//! not matching the kind re-propagate it unchanged.

mod catch;
mod compose;
mod schema;

pub use catch::ErrorSchemaLayer;
pub use compose::{HandlerChain, Next};
pub use schema::{BindingSource, SchemaLayer};

use crate::dispatcher::RequestContext;
use crate::error::RouteError;

/// Result of running a layer chain or leaf handler.
pub type Outcome = Result<crate::dispatcher::HandlerResponse, RouteError>;

/// Leaf request handler at the centre of a chain.
///
/// Implemented for any `Fn(&mut RequestContext) -> Outcome` closure.
pub trait Handler: Send + Sync {
    fn call(&self, ctx: &mut RequestContext) -> Outcome;
}

impl<F> Handler for F
where
    F: Fn(&mut RequestContext) -> Outcome + Send + Sync,
{
    fn call(&self, ctx: &mut RequestContext) -> Outcome {
        self(ctx)
    }
}

/// A wrapper around nested routes.
///
/// `handle` receives the request context and a [`Next`] continuation; not
/// calling `next.run(ctx)` short-circuits the rest of the chain.
pub trait Layer: Send + Sync {
    /// Display name used in the route manifest.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Outcome;
}

/// Adapter turning a closure into a [`Layer`].
pub struct LayerFn<F> {
    name: String,
    f: F,
}

impl<F> LayerFn<F>
where
    F: Fn(&mut RequestContext, Next<'_>) -> Outcome + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

impl<F> Layer for LayerFn<F>
where
    F: Fn(&mut RequestContext, Next<'_>) -> Outcome + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Outcome {
        (self.f)(ctx, next)
    }
}
