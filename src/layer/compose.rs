use std::fmt;
use std::sync::Arc;

use super::{Handler, Layer, Outcome};
use crate::dispatcher::RequestContext;

/// Continuation over the remaining layers and the leaf handler.
///
/// Passed by value into each [`Layer::handle`]; calling [`Next::run`]
/// consumes it, which keeps a layer from invoking the inner chain twice.
pub struct Next<'a> {
    layers: &'a [Arc<dyn Layer>],
    leaf: &'a dyn Handler,
}

impl<'a> Next<'a> {
    /// Invoke the remaining chain: inner layers first, then the leaf.
    pub fn run(self, ctx: &mut RequestContext) -> Outcome {
        match self.layers.split_first() {
            Some((head, rest)) => head.handle(
                ctx,
                Next {
                    layers: rest,
                    leaf: self.leaf,
                },
            ),
            None => self.leaf.call(ctx),
        }
    }
}

/// A composed chain: ordered layers (outermost first) wrapping a leaf.
///
/// Chains are built once at registration time and shared read-only across
/// requests; the layer slice is an `Arc` so nested routes under a common
/// scope share one allocation.
#[derive(Clone)]
pub struct HandlerChain {
    layers: Arc<[Arc<dyn Layer>]>,
    leaf: Arc<dyn Handler>,
}

impl HandlerChain {
    /// Compose layers (outermost first) around a leaf handler.
    #[must_use]
    pub fn compose(layers: Arc<[Arc<dyn Layer>]>, leaf: Arc<dyn Handler>) -> Self {
        Self { layers, leaf }
    }

    /// Compose from a plain vector of layers.
    #[must_use]
    pub fn from_layers(layers: Vec<Arc<dyn Layer>>, leaf: Arc<dyn Handler>) -> Self {
        Self::compose(Arc::from(layers), leaf)
    }

    /// A chain with no layers at all.
    #[must_use]
    pub fn leaf_only(leaf: Arc<dyn Handler>) -> Self {
        Self::compose(Arc::from(Vec::new()), leaf)
    }

    /// Execute the full chain against a request context.
    pub fn execute(&self, ctx: &mut RequestContext) -> Outcome {
        Next {
            layers: &self.layers,
            leaf: &*self.leaf,
        }
        .run(ctx)
    }

    /// Number of layers wrapping the leaf.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// Layer names, outermost first.
    #[must_use]
    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.name()).collect()
    }
}

impl fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerChain")
            .field("layers", &self.layer_names())
            .finish_non_exhaustive()
    }
}
