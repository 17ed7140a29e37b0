use std::fmt::Write;

use super::types::Segment;

/// Textual style for a formatted pattern.
///
/// All three styles round-trip through [`parse`](super::parse) without any
/// change in matching semantics; `Bracket` is the canonical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternStyle {
    /// `/[id]`, `/[[id]]`, `/[...rest]`, `/[[...rest]]`
    Bracket,
    /// `/:id`, `/:id?`, `/:rest+`, `/:rest*`
    Colon,
    /// `/$id`, `/$id?`, `/$rest+`, `/$rest*`
    Dollar,
}

/// Format a segment sequence in the given style.
///
/// The root (empty) sequence formats as `/`. Group segments render as
/// `(name)` in every style.
#[must_use]
pub fn format(segments: &[Segment], style: PatternStyle) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    let mut out = String::new();
    for segment in segments {
        out.push('/');
        match segment {
            Segment::Literal { value } => out.push_str(&escape_literal(value)),
            Segment::Group { name } => {
                let _ = write!(out, "({name})");
            }
            Segment::Param { name } => match style {
                PatternStyle::Bracket => {
                    let _ = write!(out, "[{name}]");
                }
                PatternStyle::Colon => {
                    let _ = write!(out, ":{name}");
                }
                PatternStyle::Dollar => {
                    let _ = write!(out, "${name}");
                }
            },
            Segment::OptionalParam { name } => match style {
                PatternStyle::Bracket => {
                    let _ = write!(out, "[[{name}]]");
                }
                PatternStyle::Colon => {
                    let _ = write!(out, ":{name}?");
                }
                PatternStyle::Dollar => {
                    let _ = write!(out, "${name}?");
                }
            },
            Segment::RequiredRest { name } => match style {
                PatternStyle::Bracket => {
                    let _ = write!(out, "[...{name}]");
                }
                PatternStyle::Colon => {
                    let _ = write!(out, ":{name}+");
                }
                PatternStyle::Dollar => {
                    let _ = write!(out, "${name}+");
                }
            },
            Segment::OptionalRest { name } => match style {
                PatternStyle::Bracket => {
                    let _ = write!(out, "[[...{name}]]");
                }
                PatternStyle::Colon => {
                    let _ = write!(out, ":{name}*");
                }
                PatternStyle::Dollar => {
                    let _ = write!(out, "${name}*");
                }
            },
        }
    }
    out
}

/// Canonical (bracket style) form of a pattern.
#[must_use]
pub fn canonical(segments: &[Segment]) -> String {
    format(segments, PatternStyle::Bracket)
}

/// Escape a literal value so it re-parses as the same literal: special
/// characters always, sigil characters only where they would be significant
/// (component start, or a bare `*`).
fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    if value == "*" {
        return r"\*".to_string();
    }
    for (i, ch) in value.chars().enumerate() {
        match ch {
            '\\' | '[' | ']' | '(' | ')' | '%' | '$' => {
                out.push('\\');
                out.push(ch);
            }
            ':' if i == 0 => {
                out.push('\\');
                out.push(ch);
            }
            _ if ch.is_whitespace() => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::parse;

    #[test]
    fn canonical_is_stable_across_equivalent_inputs() {
        for (a, b) in [
            ("users", "/users"),
            ("/users/", "//users"),
            ("/users/[id]", "/users/:id"),
            ("/users/[id]", "/users/$id"),
            ("/files/[[...path]]", "/files/:path*"),
        ] {
            assert_eq!(
                canonical(&parse(a).unwrap()),
                canonical(&parse(b).unwrap()),
                "{a} vs {b}"
            );
        }
        assert_eq!(canonical(&parse("/").unwrap()), "/");
        assert_eq!(canonical(&parse("").unwrap()), "/");
    }

    #[test]
    fn every_style_round_trips() {
        let segments = parse("/(site)/docs/[section]/[[lang]]").unwrap();
        for style in [PatternStyle::Bracket, PatternStyle::Colon, PatternStyle::Dollar] {
            let text = format(&segments, style);
            assert_eq!(parse(&text).unwrap(), segments, "style {style:?}: {text}");
        }
    }

    #[test]
    fn rest_round_trips_in_all_styles() {
        let segments = parse("/files/[...path]").unwrap();
        assert_eq!(format(&segments, PatternStyle::Colon), "/files/:path+");
        assert_eq!(format(&segments, PatternStyle::Dollar), "/files/$path+");
        for style in [PatternStyle::Bracket, PatternStyle::Colon, PatternStyle::Dollar] {
            assert_eq!(parse(&format(&segments, style)).unwrap(), segments);
        }
    }

    #[test]
    fn literal_escaping_round_trips() {
        let segments = parse(r"/\[draft\]/events.json").unwrap();
        let text = canonical(&segments);
        assert_eq!(parse(&text).unwrap(), segments);
    }
}
