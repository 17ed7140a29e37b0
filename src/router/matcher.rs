use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use super::trie::{TrieIndex, TrieNode};
use super::{ParamVec, RankVec, RANK_LITERAL, RANK_PARAM, RANK_REST_OPTIONAL, RANK_REST_REQUIRED};
use crate::pattern::Segment;
use crate::registry::RouteEntry;

/// One entry whose pattern covers the looked-up path, with its bound
/// parameters.
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    pub entry: Arc<RouteEntry>,
    pub params: ParamVec,
}

/// Specificity rank of a pattern: one class per matchable segment, group
/// segments skipped.
#[must_use]
pub fn rank_vector(pattern: &[Segment]) -> RankVec {
    pattern
        .iter()
        .filter_map(|segment| match segment {
            Segment::Group { .. } => None,
            Segment::Literal { .. } => Some(RANK_LITERAL),
            Segment::Param { .. } | Segment::OptionalParam { .. } => Some(RANK_PARAM),
            Segment::RequiredRest { .. } => Some(RANK_REST_REQUIRED),
            Segment::OptionalRest { .. } => Some(RANK_REST_OPTIONAL),
        })
        .collect()
}

impl TrieIndex {
    /// Find every entry covering `path` that accepts `method`, most
    /// specific first.
    ///
    /// The path must already be stripped of its query string. Components are
    /// percent-decoded before literal comparison and binding; a component
    /// that fails to decode is used verbatim.
    #[must_use]
    pub fn lookup(&self, method: &http::Method, path: &str) -> Vec<MatchCandidate> {
        let start = Instant::now();
        let components: Vec<String> = path
            .split('/')
            .filter(|c| !c.is_empty())
            .map(|c| match urlencoding::decode(c) {
                Ok(decoded) => match decoded {
                    Cow::Borrowed(s) => s.to_string(),
                    Cow::Owned(s) => s,
                },
                Err(_) => c.to_string(),
            })
            .collect();

        let mut candidates = Vec::new();
        collect(&self.root, &components, 0, method, &mut candidates);
        candidates.sort_by(|a, b| {
            a.entry
                .rank
                .cmp(&b.entry.rank)
                .then(a.entry.index.cmp(&b.entry.index))
        });

        let elapsed = start.elapsed();
        if elapsed.as_millis() >= 1 {
            warn!(%method, path, elapsed_us = elapsed.as_micros() as u64, "Slow route lookup");
        }
        debug!(%method, path, candidates = candidates.len(), "Route lookup");
        candidates
    }
}

fn collect(
    node: &TrieNode,
    components: &[String],
    idx: usize,
    method: &http::Method,
    out: &mut Vec<MatchCandidate>,
) {
    if idx == components.len() {
        for entry in &node.entries {
            push(entry, components, method, out);
        }
        // Optional rest with nothing left: matches, binds nothing.
        for entry in &node.rest_optional {
            push(entry, components, method, out);
        }
        // Deeper entries are still reachable if every remaining segment of
        // theirs is optional.
        if let Some(param) = &node.param_child {
            collect_optional_suffix(param, components, method, out);
        }
        return;
    }

    if let Some(child) = node.static_children.get(&components[idx]) {
        collect(child, components, idx + 1, method, out);
    }
    if let Some(param) = &node.param_child {
        collect(param, components, idx + 1, method, out);
    }
    for entry in &node.rest_required {
        push(entry, components, method, out);
    }
    for entry in &node.rest_optional {
        push(entry, components, method, out);
    }
}

/// Past the end of the path: walk further param edges, keeping only entries
/// whose unconsumed segments are all optional.
fn collect_optional_suffix(
    node: &TrieNode,
    components: &[String],
    method: &http::Method,
    out: &mut Vec<MatchCandidate>,
) {
    let consumed = components.len();
    for entry in node.entries.iter().chain(&node.rest_optional) {
        if optional_from(entry, consumed) {
            push(entry, components, method, out);
        }
    }
    if let Some(param) = &node.param_child {
        collect_optional_suffix(param, components, method, out);
    }
}

/// True when every matchable segment at position `consumed` and beyond can
/// match zero components.
fn optional_from(entry: &RouteEntry, consumed: usize) -> bool {
    entry
        .pattern
        .iter()
        .filter(|s| !s.is_group())
        .skip(consumed)
        .all(|s| matches!(s, Segment::OptionalParam { .. } | Segment::OptionalRest { .. }))
}

fn push(
    entry: &Arc<RouteEntry>,
    components: &[String],
    method: &http::Method,
    out: &mut Vec<MatchCandidate>,
) {
    if !entry.method.accepts(method) {
        return;
    }
    out.push(MatchCandidate {
        entry: entry.clone(),
        params: bind_params(entry, components),
    });
}

/// Walk the entry's own pattern against the consumed components to bind
/// parameter values. Binding names live on entries, not trie edges, since
/// different entries share the param edge.
fn bind_params(entry: &RouteEntry, components: &[String]) -> ParamVec {
    let mut params = ParamVec::new();
    let mut idx = 0;
    for segment in &entry.pattern {
        match segment {
            Segment::Group { .. } => {}
            Segment::Literal { .. } => idx += 1,
            Segment::Param { name } | Segment::OptionalParam { name } => {
                if idx < components.len() {
                    params.push((Arc::from(name.as_str()), components[idx].clone()));
                    idx += 1;
                }
                // Unmatched optional params bind nothing.
            }
            Segment::RequiredRest { name } | Segment::OptionalRest { name } => {
                if idx < components.len() {
                    params.push((Arc::from(name.as_str()), components[idx..].join("/")));
                    idx = components.len();
                }
            }
        }
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::HandlerResponse;
    use crate::registry::{MediaKind, MethodSpec, Registry};
    use http::Method;

    fn index(routes: &[(&str, &str)]) -> TrieIndex {
        let mut registry = Registry::new();
        for (method, pattern) in routes {
            let selector = if *method == "ANY" {
                MethodSpec::Any
            } else {
                MethodSpec::Only(Method::from_bytes(method.as_bytes()).unwrap())
            };
            let leaf = |_: &mut crate::dispatcher::RequestContext| -> crate::layer::Outcome {
                Ok(HandlerResponse::empty())
            };
            registry
                .register(selector, pattern, MediaKind::Json, Vec::new(), pattern, leaf)
                .unwrap();
        }
        TrieIndex::build(registry)
    }

    fn patterns(candidates: &[MatchCandidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.entry.pattern_text.as_str()).collect()
    }

    fn param<'a>(candidate: &'a MatchCandidate, name: &str) -> Option<&'a str> {
        candidate
            .params
            .iter()
            .find(|(n, _)| &**n == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn static_wins_over_param_over_rest() {
        let idx = index(&[
            ("GET", "/files/[...path]"),
            ("GET", "/files/[name]"),
            ("GET", "/files/readme"),
        ]);
        let found = idx.lookup(&Method::GET, "/files/readme");
        assert_eq!(
            patterns(&found),
            vec!["/files/readme", "/files/[name]", "/files/[...path]"]
        );
    }

    #[test]
    fn required_rest_needs_a_component() {
        let idx = index(&[("GET", "/files/[...path]")]);
        assert!(idx.lookup(&Method::GET, "/files").is_empty());
        let found = idx.lookup(&Method::GET, "/files/a/b/c");
        assert_eq!(param(&found[0], "path"), Some("a/b/c"));
    }

    #[test]
    fn optional_rest_matches_empty_suffix_without_binding() {
        let idx = index(&[("GET", "/files/[[...path]]")]);
        let found = idx.lookup(&Method::GET, "/files");
        assert_eq!(found.len(), 1);
        assert!(param(&found[0], "path").is_none());
        let found = idx.lookup(&Method::GET, "/files/a/b");
        assert_eq!(param(&found[0], "path"), Some("a/b"));
    }

    #[test]
    fn optional_param_matches_shorter_path_unbound() {
        let idx = index(&[("GET", "/docs/[[lang]]/[[page]]")]);
        for (path, lang, page) in [
            ("/docs", None, None),
            ("/docs/en", Some("en"), None),
            ("/docs/en/intro", Some("en"), Some("intro")),
        ] {
            let found = idx.lookup(&Method::GET, path);
            assert_eq!(found.len(), 1, "{path}");
            assert_eq!(param(&found[0], "lang"), lang, "{path}");
            assert_eq!(param(&found[0], "page"), page, "{path}");
        }
    }

    #[test]
    fn longer_literal_prefix_ranks_first() {
        // Prefix ranks compare before length: [0, 1] sorts before [1].
        let idx = index(&[("GET", "/[section]"), ("GET", "/blog/[slug]")]);
        let found = idx.lookup(&Method::GET, "/blog/hello");
        assert_eq!(patterns(&found), vec!["/blog/[slug]"]);
        let found = idx.lookup(&Method::GET, "/blog");
        assert_eq!(patterns(&found), vec!["/[section]"]);
    }

    #[test]
    fn method_filtering_keeps_any() {
        let idx = index(&[
            ("POST", "/things"),
            ("ANY", "/things"),
            ("GET", "/things"),
        ]);
        let found = idx.lookup(&Method::GET, "/things");
        assert_eq!(found.len(), 2);
        // Equal rank: registration order decides.
        assert!(matches!(found[0].entry.method, MethodSpec::Any));
        assert!(matches!(found[1].entry.method, MethodSpec::Only(_)));
    }

    #[test]
    fn groups_are_invisible_to_matching() {
        let idx = index(&[("GET", "/(admin)/users/[id]")]);
        let found = idx.lookup(&Method::GET, "/users/42");
        assert_eq!(found.len(), 1);
        assert_eq!(param(&found[0], "id"), Some("42"));
        assert!(idx.lookup(&Method::GET, "/admin/users/42").is_empty());
    }

    #[test]
    fn components_are_percent_decoded() {
        let idx = index(&[("GET", "/tags/[tag]")]);
        let found = idx.lookup(&Method::GET, "/tags/c%2B%2B");
        assert_eq!(param(&found[0], "tag"), Some("c++"));
    }

    #[test]
    fn root_and_trailing_slash() {
        let idx = index(&[("GET", "/"), ("GET", "/users")]);
        let found = idx.lookup(&Method::GET, "/");
        assert_eq!(patterns(&found), vec!["/"]);
        assert!(found[0].params.is_empty());
        let found = idx.lookup(&Method::GET, "/users/");
        assert_eq!(patterns(&found), vec!["/users"]);
        assert!(found[0].params.is_empty());
    }

    #[test]
    fn rank_vector_classes() {
        let pattern = crate::pattern::parse("/(site)/a/[b]/[[...c]]").unwrap();
        assert_eq!(rank_vector(&pattern).as_slice(), &[0, 1, 3]);
    }
}
