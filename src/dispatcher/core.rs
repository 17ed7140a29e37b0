use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use http::StatusCode;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use super::{DispatchRequest, HandlerResponse, RequestContext};
use crate::error::RouteError;
use crate::ids::RequestId;
use crate::registry::{MediaKind, Registry};
use crate::router::{MatchCandidate, TrieIndex};
use crate::runtime_config::RuntimeConfig;

/// Parsed `Accept` header: media ranges with their q-values.
#[derive(Debug, Clone)]
pub struct AcceptPreference {
    ranges: Vec<MediaRange>,
}

#[derive(Debug, Clone)]
struct MediaRange {
    kind: RangeKind,
    q: f32,
}

#[derive(Debug, Clone, PartialEq)]
enum RangeKind {
    Exact(String, String),
    Type(String),
    Any,
}

impl AcceptPreference {
    /// Parse an `Accept` header value. Returns `None` when no valid range
    /// is present, which callers treat as "no preference".
    #[must_use]
    pub fn parse(header: &str) -> Option<Self> {
        let mut ranges = Vec::new();
        for item in header.split(',') {
            let mut parts = item.split(';');
            let range = parts.next().unwrap_or("").trim().to_ascii_lowercase();
            let Some((main, sub)) = range.split_once('/') else {
                continue;
            };
            if main.is_empty() || sub.is_empty() {
                continue;
            }
            let q = parts
                .find_map(|p| p.trim().strip_prefix("q=").map(str::trim))
                .and_then(|v| v.parse::<f32>().ok())
                .unwrap_or(1.0)
                .clamp(0.0, 1.0);
            let kind = match (main, sub) {
                ("*", "*") => RangeKind::Any,
                (main, "*") => RangeKind::Type(main.to_string()),
                (main, sub) => RangeKind::Exact(main.to_string(), sub.to_string()),
            };
            ranges.push(MediaRange { kind, q });
        }
        if ranges.is_empty() {
            None
        } else {
            Some(Self { ranges })
        }
    }

    /// Quality of a MIME type under this preference: the q of the most
    /// specific matching range, `0.0` when nothing matches.
    #[must_use]
    pub fn quality(&self, mime: &str) -> f32 {
        let Some((main, sub)) = mime.split_once('/') else {
            return 0.0;
        };
        let mut best: Option<(u8, f32)> = None;
        for range in &self.ranges {
            let specificity = match &range.kind {
                RangeKind::Exact(m, s) if m == main && s == sub => 2,
                RangeKind::Type(m) if m == main => 1,
                RangeKind::Any => 0,
                _ => continue,
            };
            match best {
                Some((s, _)) if s >= specificity => {}
                _ => best = Some((specificity, range.q)),
            }
        }
        best.map_or(0.0, |(_, q)| q)
    }

    #[must_use]
    pub fn accepts(&self, mime: &str) -> bool {
        self.quality(mime) > 0.0
    }
}

/// The request dispatcher: route index plus runtime flags.
pub struct Dispatcher {
    index: TrieIndex,
    dev: bool,
}

impl Dispatcher {
    /// Build a dispatcher with runtime flags read from the environment.
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self::with_config(registry, &RuntimeConfig::from_env())
    }

    #[must_use]
    pub fn with_config(registry: Registry, config: &RuntimeConfig) -> Self {
        Self {
            index: TrieIndex::build(registry),
            dev: config.dev,
        }
    }

    #[must_use]
    pub fn index(&self) -> &TrieIndex {
        &self.index
    }

    /// Resolve and run one request. Every failure mode becomes a response;
    /// this boundary never returns an error.
    pub fn dispatch(&self, request: DispatchRequest) -> HandlerResponse {
        let start = Instant::now();
        let request_id = RequestId::from_header_or_new(request.header("x-request-id"));
        debug!(%request_id, method = %request.method, path = %request.path, "Dispatch start");

        let candidates = self.index.lookup(&request.method, &request.path);
        let accept = request.header("accept").and_then(AcceptPreference::parse);

        let Some(candidate) = select(&candidates, accept.as_ref()) else {
            warn!(%request_id, method = %request.method, path = %request.path, "No route");
            let err = RouteError::not_found(format!(
                "no route for {} {}",
                request.method, request.path
            ));
            let mut response = HandlerResponse::for_error(&err, error_media(accept.as_ref()));
            response.set_header("x-request-id", request_id.to_string());
            return response;
        };

        let entry = candidate.entry.clone();
        let params = candidate.params.clone();
        drop(candidates);
        debug!(
            %request_id,
            pattern = %entry.pattern_text,
            handler = %entry.handler_name,
            media = %entry.media_kind,
            "Route selected"
        );

        let mut ctx =
            RequestContext::assemble(request, params, entry.media_kind, request_id.clone());
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| entry.chain.execute(&mut ctx)));

        let mut response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                error!(
                    %request_id,
                    handler = %entry.handler_name,
                    kind = err.kind.name(),
                    message = %err.message,
                    "Uncaught handler error"
                );
                self.failure_response(&err, entry.media_kind)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(
                    %request_id,
                    handler = %entry.handler_name,
                    panic = %message,
                    "Handler panicked"
                );
                self.panic_response(&message, entry.media_kind)
            }
        };

        if response.get_header("content-type").is_none() {
            if !matches!(response.body, super::ResponseBody::Empty) {
                response.set_header("content-type", entry.media_kind.mime());
            }
        }
        if response.get_header("x-request-id").is_none() {
            response.set_header("x-request-id", request_id.to_string());
        }
        debug!(
            %request_id,
            status = response.status.as_u16(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Dispatch complete"
        );
        response
    }

    /// An error escaping the chain uncaught is a server failure no matter
    /// its kind; the kind only names the failure in the body.
    fn failure_response(&self, err: &RouteError, media: MediaKind) -> HandlerResponse {
        let mut body = json!({
            "error": err.kind.name(),
            "message": err.message,
        });
        if let Some(detail) = &err.detail {
            body["detail"] = detail.clone();
        }
        render_failure(body, media)
    }

    fn panic_response(&self, panic_message: &str, media: MediaKind) -> HandlerResponse {
        let mut body = json!({ "error": Value::Null, "message": "handler panicked" });
        if self.dev {
            body["stack"] = json!([panic_message]);
        }
        render_failure(body, media)
    }
}

fn render_failure(body: Value, media: MediaKind) -> HandlerResponse {
    let response = match media {
        MediaKind::Json | MediaKind::EventStream => HandlerResponse::json(body),
        MediaKind::Text => HandlerResponse::text(
            body["message"].as_str().unwrap_or("internal error").to_string(),
        ),
        MediaKind::Html => HandlerResponse::html(format!(
            "<!doctype html><title>500</title><h1>500</h1><p>{}</p>",
            body["message"].as_str().unwrap_or("internal error")
        )),
    };
    response.with_status(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Pick the winning candidate: walk equal-rank groups in order; within a
/// group the highest acceptable q-value wins, strict comparison keeping
/// registration order on ties. A group with nothing acceptable falls
/// through to the next; no preference at all takes the front candidate.
fn select<'a>(
    candidates: &'a [MatchCandidate],
    accept: Option<&AcceptPreference>,
) -> Option<&'a MatchCandidate> {
    let Some(accept) = accept else {
        return candidates.first();
    };
    let mut i = 0;
    while i < candidates.len() {
        let mut j = i;
        while j < candidates.len() && candidates[j].entry.rank == candidates[i].entry.rank {
            j += 1;
        }
        let mut best: Option<(&MatchCandidate, f32)> = None;
        for candidate in &candidates[i..j] {
            let q = accept.quality(candidate.entry.media_kind.mime());
            if q > 0.0 {
                match best {
                    Some((_, bq)) if q <= bq => {}
                    _ => best = Some((candidate, q)),
                }
            }
        }
        if let Some((winner, _)) = best {
            return Some(winner);
        }
        i = j;
    }
    None
}

/// Media kind for a no-route response, honouring the client's preference.
fn error_media(accept: Option<&AcceptPreference>) -> MediaKind {
    let Some(accept) = accept else {
        return MediaKind::Json;
    };
    [MediaKind::Json, MediaKind::Html, MediaKind::Text]
        .into_iter()
        .max_by(|a, b| {
            accept
                .quality(a.mime())
                .partial_cmp(&accept.quality(b.mime()))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .filter(|kind| accept.accepts(kind.mime()))
        .unwrap_or(MediaKind::Json)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
