//! # Registry Module
//!
//! The pattern registry owns every route declaration between application
//! startup and the trie-index build. Registrations arrive either directly
//! ([`Registry::register`]) or as a tree of scopes and route modules
//! ([`Registry::mount`]), which an explicit tree-walk flattens into an
//! ordered list of [`RouteEntry`] values.
//!
//! Entries are created once, validated and normalized at registration, and
//! never mutated afterwards; the registry hands exclusive ownership to the
//! trie index at build time. Registration order is recorded on every entry
//! and is the matcher's tie-break of last resort.

use http::Method;
use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::cache::ChainCache;
use crate::error::RegistryError;
use crate::layer::{Handler, HandlerChain, Layer, SchemaLayer};
use crate::pattern::{self, Segment};
use crate::router::{rank_vector, RankVec};

/// HTTP method selector for a route entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodSpec {
    /// Matches every method; ranked purely by path specificity.
    Any,
    /// Matches exactly one method (case-normalized by `http::Method`).
    Only(Method),
}

impl MethodSpec {
    #[must_use]
    pub fn accepts(&self, method: &Method) -> bool {
        match self {
            MethodSpec::Any => true,
            MethodSpec::Only(own) => own == method,
        }
    }
}

impl fmt::Display for MethodSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodSpec::Any => f.write_str("ANY"),
            MethodSpec::Only(method) => write!(f, "{method}"),
        }
    }
}

/// Response media kind declared by a handler binding.
///
/// Several bindings may share one path and method, differing only by media
/// kind; the dispatcher selects between them by the client's Accept
/// preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Json,
    Html,
    Text,
    EventStream,
}

impl MediaKind {
    /// MIME type sent in the Content-Type header.
    #[must_use]
    pub fn mime(self) -> &'static str {
        match self {
            MediaKind::Json => "application/json",
            MediaKind::Html => "text/html",
            MediaKind::Text => "text/plain",
            MediaKind::EventStream => "text/event-stream",
        }
    }

    /// Parse a MIME type, ignoring any parameters after `;`.
    #[must_use]
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            "application/json" => Some(MediaKind::Json),
            "text/html" => Some(MediaKind::Html),
            "text/plain" => Some(MediaKind::Text),
            "text/event-stream" => Some(MediaKind::EventStream),
            _ => None,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// One registered route: pattern, method selector, media kind and the
/// composed handler chain. Immutable once built.
#[derive(Debug)]
pub struct RouteEntry {
    pub method: MethodSpec,
    pub pattern: Vec<Segment>,
    pub chain: HandlerChain,
    pub media_kind: MediaKind,
    /// Canonical bracket-style text, groups included (display only)
    pub pattern_text: String,
    /// Leaf handler name for the manifest and logs
    pub handler_name: String,
    /// Specificity rank, one class per matchable segment
    pub(crate) rank: RankVec,
    /// Registration order, the final tie-break
    pub index: usize,
}

/// Manifest row describing one registered route.
#[derive(Debug, Clone)]
pub struct ManifestEntry {
    pub method: String,
    /// Canonical formatted pattern
    pub pattern: String,
    pub segments: Vec<Segment>,
    pub media_kind: MediaKind,
    pub handler: String,
    /// Enclosing layer names, outermost first
    pub layers: Vec<String>,
}

/// One handler binding inside a route module.
struct MethodBinding {
    method: MethodSpec,
    media_kind: MediaKind,
    handler_name: String,
    handler: Arc<dyn Handler>,
}

/// A loadable unit of handler bindings for one path pattern.
///
/// A module exposes zero or more named method bindings and/or a wildcard
/// binding, plus optional module-level layers (schema bindings included)
/// wrapping all of them. This is an explicit runtime builder: every call
/// appends a typed step, nothing is inferred.
#[derive(Default)]
pub struct RouteModule {
    steps: Vec<Arc<dyn Layer>>,
    bindings: Vec<MethodBinding>,
}

impl RouteModule {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap every binding of this module in a layer.
    #[must_use]
    pub fn layer(mut self, layer: Arc<dyn Layer>) -> Self {
        self.steps.push(layer);
        self
    }

    /// Bind a header value into the request context under its own name.
    #[must_use]
    pub fn bind_header(self, name: &str) -> Self {
        self.layer(Arc::new(SchemaLayer::new(
            crate::layer::BindingSource::Header(name.to_string()),
        )))
    }

    /// Bind a query parameter into the request context.
    #[must_use]
    pub fn bind_query(self, name: &str) -> Self {
        self.layer(Arc::new(SchemaLayer::new(
            crate::layer::BindingSource::Query(name.to_string()),
        )))
    }

    /// Bind a cookie value into the request context.
    #[must_use]
    pub fn bind_cookie(self, name: &str) -> Self {
        self.layer(Arc::new(SchemaLayer::new(
            crate::layer::BindingSource::Cookie(name.to_string()),
        )))
    }

    /// Bind the parsed JSON body under `body`, failing the request when the
    /// body is absent.
    #[must_use]
    pub fn bind_body(self) -> Self {
        self.layer(Arc::new(
            SchemaLayer::new(crate::layer::BindingSource::Body).required(),
        ))
    }

    /// Add a binding for an explicit method selector and media kind.
    #[must_use]
    pub fn on<H>(mut self, method: MethodSpec, media_kind: MediaKind, name: &str, handler: H) -> Self
    where
        H: Handler + 'static,
    {
        self.bindings.push(MethodBinding {
            method,
            media_kind,
            handler_name: name.to_string(),
            handler: Arc::new(handler),
        });
        self
    }

    #[must_use]
    pub fn get<H: Handler + 'static>(self, name: &str, handler: H) -> Self {
        self.on(MethodSpec::Only(Method::GET), MediaKind::Json, name, handler)
    }

    #[must_use]
    pub fn post<H: Handler + 'static>(self, name: &str, handler: H) -> Self {
        self.on(MethodSpec::Only(Method::POST), MediaKind::Json, name, handler)
    }

    #[must_use]
    pub fn put<H: Handler + 'static>(self, name: &str, handler: H) -> Self {
        self.on(MethodSpec::Only(Method::PUT), MediaKind::Json, name, handler)
    }

    #[must_use]
    pub fn delete<H: Handler + 'static>(self, name: &str, handler: H) -> Self {
        self.on(MethodSpec::Only(Method::DELETE), MediaKind::Json, name, handler)
    }

    /// Wildcard-method binding: matches every method.
    #[must_use]
    pub fn any<H: Handler + 'static>(self, name: &str, handler: H) -> Self {
        self.on(MethodSpec::Any, MediaKind::Json, name, handler)
    }
}

/// A nestable routing scope: a path prefix, layers applying to everything
/// beneath it, route modules, and child scopes.
#[derive(Default)]
pub struct RouteScope {
    prefix: String,
    layers: Vec<Arc<dyn Layer>>,
    modules: Vec<(String, RouteModule)>,
    children: Vec<RouteScope>,
}

impl RouteScope {
    /// Scope rooted at `prefix` (any pattern style; `""` or `"/"` for the
    /// root).
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            ..Self::default()
        }
    }

    /// Wrap every route in this scope and all nested scopes.
    #[must_use]
    pub fn layer(mut self, layer: Arc<dyn Layer>) -> Self {
        self.layers.push(layer);
        self
    }

    /// Mount a route module at `pattern` relative to this scope.
    #[must_use]
    pub fn route(mut self, pattern: &str, module: RouteModule) -> Self {
        self.modules.push((pattern.to_string(), module));
        self
    }

    /// Nest a child scope.
    #[must_use]
    pub fn child(mut self, scope: RouteScope) -> Self {
        self.children.push(scope);
        self
    }
}

/// The pattern registry: validated route entries in registration order.
#[derive(Default)]
pub struct Registry {
    entries: Vec<Arc<RouteEntry>>,
    chains: ChainCache,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a single route.
    ///
    /// The pattern may use any supported style; it is parsed, validated and
    /// stored in canonical form.
    ///
    /// # Errors
    ///
    /// Fails with [`RegistryError::Pattern`] on invalid pattern syntax.
    pub fn register<H>(
        &mut self,
        method: MethodSpec,
        pattern: &str,
        media_kind: MediaKind,
        layers: Vec<Arc<dyn Layer>>,
        handler_name: &str,
        handler: H,
    ) -> Result<(), RegistryError>
    where
        H: Handler + 'static,
    {
        let segments = pattern::parse(pattern)?;
        self.push_entry(
            method,
            segments,
            media_kind,
            HandlerChain::from_layers(layers, Arc::new(handler)),
            handler_name,
        );
        Ok(())
    }

    /// Flatten a scope tree into registered entries.
    ///
    /// The walk is explicit and depth-first: a scope's own modules register
    /// before its children, in declaration order, which fixes the
    /// registration-order tie-break. Scope layers wrap module layers, which
    /// wrap the leaf; composed stacks are shared through the chain cache so
    /// routes under one scope reuse a single allocation.
    ///
    /// # Errors
    ///
    /// Fails on invalid pattern syntax anywhere in the tree, or on a module
    /// with no bindings.
    pub fn mount(&mut self, scope: RouteScope) -> Result<(), RegistryError> {
        self.mount_inner(scope, &[], &[])
    }

    fn mount_inner(
        &mut self,
        scope: RouteScope,
        parent_prefix: &[Segment],
        parent_layers: &[Arc<dyn Layer>],
    ) -> Result<(), RegistryError> {
        let mut prefix = parent_prefix.to_vec();
        prefix.extend(pattern::parse(&scope.prefix)?);

        // Sibling scopes may share a prefix text while carrying different
        // layer stacks, so every scope visit gets its own slot: the store
        // grows by one per visit, making its size a unique discriminant.
        let scope_key = format!("{}#{}", pattern::canonical(&prefix), self.chains.len());
        let mut stacked: Vec<Arc<dyn Layer>> = parent_layers.to_vec();
        stacked.extend(scope.layers.iter().cloned());
        let shared = self.chains.get_or_build(&scope_key, || stacked.clone());

        for (pattern_text, module) in scope.modules {
            let mut segments = prefix.clone();
            segments.extend(pattern::parse(&pattern_text)?);
            pattern::validate_sequence(&pattern::canonical(&segments), &segments)?;

            if module.bindings.is_empty() {
                return Err(RegistryError::NoBindings {
                    pattern: pattern::canonical(&segments),
                });
            }

            // Module-level steps nest inside the scope stack.
            let chain_layers: Arc<[Arc<dyn Layer>]> = if module.steps.is_empty() {
                shared.clone()
            } else {
                let mut layers = shared.to_vec();
                layers.extend(module.steps.iter().cloned());
                Arc::from(layers)
            };

            for binding in module.bindings {
                self.push_entry(
                    binding.method,
                    segments.clone(),
                    binding.media_kind,
                    HandlerChain::compose(chain_layers.clone(), binding.handler),
                    &binding.handler_name,
                );
            }
        }

        for child in scope.children {
            self.mount_inner(child, &prefix, &stacked)?;
        }
        Ok(())
    }

    fn push_entry(
        &mut self,
        method: MethodSpec,
        pattern: Vec<Segment>,
        media_kind: MediaKind,
        chain: HandlerChain,
        handler_name: &str,
    ) {
        let pattern_text = pattern::canonical(&pattern);
        let rank = rank_vector(&pattern);
        let index = self.entries.len();
        self.entries.push(Arc::new(RouteEntry {
            method,
            pattern,
            chain,
            media_kind,
            pattern_text,
            handler_name: handler_name.to_string(),
            rank,
            index,
        }));
    }

    /// Registered entries in registration order.
    #[must_use]
    pub fn entries(&self) -> &[Arc<RouteEntry>] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the registry, handing the entries to the index build.
    #[must_use]
    pub fn into_entries(self) -> Vec<Arc<RouteEntry>> {
        self.entries
    }

    /// Manifest of every registered route, registration order preserved.
    #[must_use]
    pub fn manifest(&self) -> Vec<ManifestEntry> {
        self.entries
            .iter()
            .map(|entry| ManifestEntry {
                method: entry.method.to_string(),
                pattern: entry.pattern_text.clone(),
                segments: entry.pattern.clone(),
                media_kind: entry.media_kind,
                handler: entry.handler_name.clone(),
                layers: entry
                    .chain
                    .layer_names()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            })
            .collect()
    }

    /// Print the manifest to stdout. Useful when verifying a route table.
    pub fn dump_routes(&self) {
        println!("[routes] count={}", self.entries.len());
        for entry in &self.entries {
            println!(
                "[route] {} {} ({}) -> {}",
                entry.method, entry.pattern_text, entry.media_kind, entry.handler_name
            );
        }
    }

    /// Log a summary of the loaded route table.
    pub fn log_summary(&self) {
        let routes_summary: Vec<String> = self
            .entries
            .iter()
            .take(10)
            .map(|e| format!("{} {}", e.method, e.pattern_text))
            .collect();
        info!(
            routes_count = self.entries.len(),
            routes_summary = ?routes_summary,
            "Route table registered"
        );
    }
}
