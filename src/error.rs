//! Error types for registration-time and request-time failures.
//!
//! Two families live here:
//!
//! - [`PatternSyntaxError`] and [`RegistryError`] are registration-time and
//!   fatal: they abort startup before the trie index is built.
//! - [`RouteError`] is a request-time declared failure. It propagates outward
//!   through the layer chain exactly like a successful result and is converted
//!   to a response by the first error-schema layer that catches its kind. An
//!   error nothing catches surfaces as a 500 for that request only.
//!
//! An empty match result is *not* an error; the dispatcher maps it to 404.

use serde_json::Value;
use std::fmt;

/// Syntax error produced while parsing a route pattern string.
///
/// Registration-time and fatal: a service should refuse to start with an
/// unparseable route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSyntaxError {
    /// A bracket or group component with an empty name, e.g. `[]` or `()`.
    EmptyName {
        /// The offending path component
        component: String,
    },
    /// A parameter or group name containing characters outside
    /// `[A-Za-z_][A-Za-z0-9_]*`.
    InvalidName {
        /// The offending path component
        component: String,
        /// The rejected name
        name: String,
    },
    /// An unescaped character that is illegal in a literal component
    /// (whitespace, `%`, a stray `$`, or a dangling escape).
    IllegalCharacter {
        /// The offending path component
        component: String,
        /// The rejected character
        ch: char,
    },
    /// Mismatched or nested brackets, e.g. `[id`, `a[b]`, `[[id]`.
    MalformedBrackets {
        /// The offending path component
        component: String,
    },
    /// A grouping component that does not close, e.g. `(admin`.
    MalformedGroup {
        /// The offending path component
        component: String,
    },
    /// A rest segment followed by further matchable segments.
    RestNotLast {
        /// Canonical text of the offending pattern
        pattern: String,
    },
    /// An optional segment followed by a required one. Optional parameters
    /// can only trail the pattern; anything after them would never align.
    OptionalBeforeRequired {
        /// Canonical text of the offending pattern
        pattern: String,
    },
}

impl fmt::Display for PatternSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternSyntaxError::EmptyName { component } => {
                write!(f, "pattern syntax error: empty name in component '{component}'")
            }
            PatternSyntaxError::InvalidName { component, name } => {
                write!(
                    f,
                    "pattern syntax error: invalid name '{name}' in component '{component}' \
                    (expected [A-Za-z_][A-Za-z0-9_]*)"
                )
            }
            PatternSyntaxError::IllegalCharacter { component, ch } => {
                write!(
                    f,
                    "pattern syntax error: illegal character {ch:?} in component '{component}' \
                    (escape it with a backslash to match it literally)"
                )
            }
            PatternSyntaxError::MalformedBrackets { component } => {
                write!(f, "pattern syntax error: malformed brackets in component '{component}'")
            }
            PatternSyntaxError::MalformedGroup { component } => {
                write!(f, "pattern syntax error: malformed group in component '{component}'")
            }
            PatternSyntaxError::RestNotLast { pattern } => {
                write!(
                    f,
                    "pattern syntax error: rest segment must be the last matchable segment in '{pattern}'"
                )
            }
            PatternSyntaxError::OptionalBeforeRequired { pattern } => {
                write!(
                    f,
                    "pattern syntax error: optional segments must trail the pattern in '{pattern}'"
                )
            }
        }
    }
}

impl std::error::Error for PatternSyntaxError {}

/// Registration error raised while building the pattern registry.
#[derive(Debug)]
pub enum RegistryError {
    /// The route pattern failed to parse.
    Pattern(PatternSyntaxError),
    /// A route module was mounted without any method bindings.
    NoBindings {
        /// Canonical pattern of the empty mount point
        pattern: String,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Pattern(err) => write!(f, "route registration failed: {err}"),
            RegistryError::NoBindings { pattern } => {
                write!(f, "route registration failed: module at '{pattern}' declares no method bindings")
            }
        }
    }
}

impl std::error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegistryError::Pattern(err) => Some(err),
            RegistryError::NoBindings { .. } => None,
        }
    }
}

impl From<PatternSyntaxError> for RegistryError {
    fn from(err: PatternSyntaxError) -> Self {
        RegistryError::Pattern(err)
    }
}

/// Classification of a declared request-time failure.
///
/// Each kind carries a fixed HTTP status; an error-schema layer declares the
/// kinds it catches and converts matching errors into responses with that
/// status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Unprocessable,
    TooManyRequests,
    Internal,
    NotImplemented,
    Unavailable,
}

impl ErrorKind {
    /// HTTP status code associated with this kind.
    #[must_use]
    pub fn status(self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Unprocessable => 422,
            ErrorKind::TooManyRequests => 429,
            ErrorKind::Internal => 500,
            ErrorKind::NotImplemented => 501,
            ErrorKind::Unavailable => 503,
        }
    }

    /// Stable machine-readable name used in structured error bodies.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unprocessable => "unprocessable",
            ErrorKind::TooManyRequests => "too_many_requests",
            ErrorKind::Internal => "internal",
            ErrorKind::NotImplemented => "not_implemented",
            ErrorKind::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed failure raised intentionally by a handler or layer.
///
/// Route errors flow outward through the layer chain; layers that do not
/// catch the error's kind must re-propagate it unchanged.
#[derive(Debug, Clone)]
pub struct RouteError {
    /// Failure classification, fixes the mapped HTTP status
    pub kind: ErrorKind,
    /// Human-readable description
    pub message: String,
    /// Optional structured payload carried into the error body
    pub detail: Option<Value>,
}

impl RouteError {
    /// Create an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
        }
    }

    /// Attach a structured detail payload.
    #[must_use]
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unprocessable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Structured JSON body for this error.
    #[must_use]
    pub fn body(&self) -> Value {
        let mut body = serde_json::json!({
            "error": self.kind.name(),
            "message": self.message,
        });
        if let Some(detail) = &self.detail {
            body["detail"] = detail.clone();
        }
        body
    }
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for RouteError {}
