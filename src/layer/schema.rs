use serde_json::Value;

use super::{Layer, Next, Outcome};
use crate::dispatcher::RequestContext;
use crate::error::RouteError;

/// Where a schema binding reads its value from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingSource {
    /// A request header, matched case-insensitively.
    Header(String),
    /// A query-string parameter.
    Query(String),
    /// A cookie value.
    Cookie(String),
    /// The parsed JSON request body.
    Body,
}

/// A layer contributing one named binding to the request context.
///
/// Bindings merge additively down the chain; inserting an already-present
/// name shadows it for inner layers and the leaf. A required binding whose
/// source is absent fails the request with a `bad_request` error before the
/// inner chain runs.
pub struct SchemaLayer {
    source: BindingSource,
    bind_as: String,
    required: bool,
}

impl SchemaLayer {
    /// Bind a value under its own source name.
    #[must_use]
    pub fn new(source: BindingSource) -> Self {
        let bind_as = match &source {
            BindingSource::Header(name)
            | BindingSource::Query(name)
            | BindingSource::Cookie(name) => name.clone(),
            BindingSource::Body => "body".to_string(),
        };
        Self {
            source,
            bind_as,
            required: false,
        }
    }

    /// Bind under an explicit name, shadowing any earlier binding of it.
    #[must_use]
    pub fn bind_as(mut self, name: impl Into<String>) -> Self {
        self.bind_as = name.into();
        self
    }

    /// Fail the request when the source value is absent.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn extract(&self, ctx: &RequestContext) -> Option<Value> {
        match &self.source {
            BindingSource::Header(name) => {
                ctx.get_header(name).map(|v| Value::String(v.to_string()))
            }
            BindingSource::Query(name) => {
                ctx.get_query(name).map(|v| Value::String(v.to_string()))
            }
            BindingSource::Cookie(name) => {
                ctx.get_cookie(name).map(|v| Value::String(v.to_string()))
            }
            BindingSource::Body => ctx.body.clone(),
        }
    }

    fn describe(&self) -> String {
        match &self.source {
            BindingSource::Header(name) => format!("header '{name}'"),
            BindingSource::Query(name) => format!("query parameter '{name}'"),
            BindingSource::Cookie(name) => format!("cookie '{name}'"),
            BindingSource::Body => "request body".to_string(),
        }
    }
}

impl Layer for SchemaLayer {
    fn name(&self) -> &str {
        "schema"
    }

    fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Outcome {
        match self.extract(ctx) {
            Some(value) => {
                ctx.bindings.insert(self.bind_as.clone(), value);
            }
            None if self.required => {
                return Err(RouteError::bad_request(format!(
                    "missing required {}",
                    self.describe()
                )));
            }
            None => {}
        }
        next.run(ctx)
    }
}
