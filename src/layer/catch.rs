use tracing::debug;

use super::{Layer, Next, Outcome};
use crate::dispatcher::{HandlerResponse, RequestContext};
use crate::error::ErrorKind;

/// A layer that converts declared errors of specific kinds into responses.
///
/// Errors of other kinds pass through unchanged and keep propagating
/// outward; an error no enclosing error-schema layer catches is treated as
/// undeclared by the dispatcher and surfaces as a 500.
pub struct ErrorSchemaLayer {
    kinds: Vec<ErrorKind>,
}

impl ErrorSchemaLayer {
    /// Catch exactly the given kinds.
    #[must_use]
    pub fn catching(kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }

    fn catches(&self, kind: ErrorKind) -> bool {
        self.kinds.contains(&kind)
    }
}

impl Layer for ErrorSchemaLayer {
    fn name(&self) -> &str {
        "error-schema"
    }

    fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Outcome {
        match next.run(ctx) {
            Err(err) if self.catches(err.kind) => {
                debug!(
                    request_id = %ctx.request_id,
                    kind = %err.kind,
                    status = err.kind.status(),
                    "Error schema caught declared error"
                );
                Ok(HandlerResponse::for_error(&err, ctx.media_kind))
            }
            other => other,
        }
    }
}
