use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use serde_json::{json, Value};

use super::HeaderVec;
use crate::error::RouteError;
use crate::ids::RequestId;
use crate::registry::MediaKind;
use crate::router::ParamVec;
use crate::stream::{CancelToken, StreamReceiver};

/// An inbound request handed to [`Dispatcher::dispatch`](super::Dispatcher::dispatch).
///
/// Built with `new` plus `with_*` builders; the target string may carry a
/// query, which is split off and form-decoded up front.
#[derive(Debug)]
pub struct DispatchRequest {
    pub method: Method,
    pub path: String,
    pub query: ParamVec,
    pub headers: HeaderVec,
    pub body: Option<Value>,
    pub cancel: CancelToken,
}

impl DispatchRequest {
    #[must_use]
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query_raw) = match target.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (target, None),
        };
        Self {
            method,
            path: path.to_string(),
            query: query_raw.map(parse_query).unwrap_or_default(),
            headers: HeaderVec::new(),
            body: None,
            cancel: CancelToken::new(),
        }
    }

    #[must_use]
    pub fn get(target: &str) -> Self {
        Self::new(Method::GET, target)
    }

    #[must_use]
    pub fn post(target: &str) -> Self {
        Self::new(Method::POST, target)
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((Arc::from(name), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Case-insensitive header lookup, last value winning.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rfind(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Form-decode a query string: `+` means space, pairs without `=` get an
/// empty value, repeated names are all kept in order.
fn parse_query(raw: &str) -> ParamVec {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            (Arc::from(form_decode(name).as_str()), form_decode(value))
        })
        .collect()
}

fn form_decode(raw: &str) -> String {
    let plus_decoded = raw.replace('+', " ");
    match urlencoding::decode(&plus_decoded) {
        Ok(Cow::Borrowed(_)) => plus_decoded,
        Ok(Cow::Owned(s)) => s,
        Err(_) => plus_decoded,
    }
}

/// Everything a handler chain sees for one request.
///
/// Layers mutate the context freely on the way in; `bindings` is the
/// additive merge target for schema layers.
#[derive(Debug)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub request_id: RequestId,
    /// Media kind of the selected route entry.
    pub media_kind: MediaKind,
    pub params: ParamVec,
    pub query: ParamVec,
    pub headers: HeaderVec,
    pub cookies: Vec<(String, String)>,
    pub body: Option<Value>,
    pub bindings: HashMap<String, Value>,
    pub cancel: CancelToken,
}

impl RequestContext {
    pub(crate) fn assemble(
        request: DispatchRequest,
        params: ParamVec,
        media_kind: MediaKind,
        request_id: RequestId,
    ) -> Self {
        let cookies = request
            .header("cookie")
            .map(parse_cookies)
            .unwrap_or_default();
        Self {
            method: request.method,
            path: request.path,
            request_id,
            media_kind,
            params,
            query: request.query,
            headers: request.headers,
            cookies,
            body: request.body,
            bindings: HashMap::new(),
            cancel: request.cancel,
        }
    }

    /// Bound path parameter, last binding winning for repeated names.
    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rfind(|(n, _)| &**n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Query parameter, last occurrence winning.
    #[must_use]
    pub fn get_query(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .rfind(|(n, _)| &**n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Case-insensitive header lookup, last value winning.
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rfind(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn get_cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .rfind(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Value merged in by a schema layer.
    #[must_use]
    pub fn binding(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }
}

fn parse_cookies(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Response body of a handler.
#[derive(Debug)]
pub enum ResponseBody {
    Empty,
    Json(Value),
    Text(String),
    /// Consumer half of a streaming channel; frames are pulled by the
    /// transport as it gains capacity.
    Stream(StreamReceiver),
}

/// A handler's response: status, headers and body.
#[derive(Debug)]
pub struct HandlerResponse {
    pub status: StatusCode,
    pub headers: HeaderVec,
    pub body: ResponseBody,
}

impl HandlerResponse {
    #[must_use]
    pub fn json(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderVec::new(),
            body: ResponseBody::Json(body),
        }
        .with_content_type(MediaKind::Json)
    }

    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderVec::new(),
            body: ResponseBody::Text(body.into()),
        }
        .with_content_type(MediaKind::Text)
    }

    #[must_use]
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderVec::new(),
            body: ResponseBody::Text(body.into()),
        }
        .with_content_type(MediaKind::Html)
    }

    #[must_use]
    pub fn empty() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            headers: HeaderVec::new(),
            body: ResponseBody::Empty,
        }
    }

    /// A streaming response; the content type is the event-stream MIME.
    #[must_use]
    pub fn stream(receiver: StreamReceiver) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderVec::new(),
            body: ResponseBody::Stream(receiver),
        }
        .with_content_type(MediaKind::EventStream)
    }

    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    fn with_content_type(mut self, kind: MediaKind) -> Self {
        self.set_header("content-type", kind.mime());
        self
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.push((Arc::from(name), value.into()));
    }

    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rfind(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Render a declared error in the route's media kind with the kind's
    /// own status.
    #[must_use]
    pub fn for_error(error: &RouteError, media_kind: MediaKind) -> Self {
        let status = StatusCode::from_u16(error.kind.status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let response = match media_kind {
            MediaKind::Json | MediaKind::EventStream => Self::json(error.body()),
            MediaKind::Text => Self::text(format!("{}: {}", error.kind.name(), error.message)),
            MediaKind::Html => Self::html(format!(
                "<!doctype html><title>{status}</title><h1>{} {}</h1><p>{}</p>",
                status.as_u16(),
                error.kind.name(),
                error.message
            )),
        };
        response.with_status(status)
    }

    /// The JSON value of a JSON body, for inspection in tests and logs.
    #[must_use]
    pub fn body_json(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Serialized body bytes, streams excluded.
    #[must_use]
    pub fn body_bytes(&self) -> Option<Vec<u8>> {
        match &self.body {
            ResponseBody::Empty => None,
            ResponseBody::Json(value) => Some(value.to_string().into_bytes()),
            ResponseBody::Text(text) => Some(text.clone().into_bytes()),
            ResponseBody::Stream(_) => None,
        }
    }
}

impl From<Value> for HandlerResponse {
    fn from(value: Value) -> Self {
        Self::json(value)
    }
}

impl Default for HandlerResponse {
    fn default() -> Self {
        Self::json(json!({}))
    }
}
