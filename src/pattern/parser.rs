use once_cell::sync::Lazy;
use regex::Regex;

use super::types::Segment;
use crate::error::PatternSyntaxError;

/// Binding and group names: an identifier, no leading digit.
static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("name regex"));

/// Parse a route pattern string into its segment sequence.
///
/// Normalization happens before parsing: consecutive slashes collapse and a
/// trailing slash is stripped, so `""`, `"/"`, `"users"` and `"/users/"` all
/// parse to the sequences their canonical forms suggest.
///
/// # Errors
///
/// Returns [`PatternSyntaxError`] for empty bracket names, illegal unescaped
/// characters, malformed bracket/group syntax, a rest segment that is not in
/// final position, or an optional segment followed by a required one.
pub fn parse(input: &str) -> Result<Vec<Segment>, PatternSyntaxError> {
    let mut segments = Vec::new();
    for component in input.split('/').filter(|c| !c.is_empty()) {
        segments.push(parse_component(component)?);
    }
    validate_order(input, &segments)?;
    Ok(segments)
}

/// Re-check ordering rules on a segment sequence assembled from parts, e.g.
/// a scope prefix concatenated with a route pattern.
pub(crate) fn validate_sequence(
    display: &str,
    segments: &[Segment],
) -> Result<(), PatternSyntaxError> {
    validate_order(display, segments)
}

/// Rest segments must be the last matchable segment; optional segments may
/// only be followed by other optional segments (or zero-width groups).
fn validate_order(input: &str, segments: &[Segment]) -> Result<(), PatternSyntaxError> {
    let mut seen_rest = false;
    let mut seen_optional = false;
    for segment in segments {
        if segment.is_group() {
            continue;
        }
        if seen_rest {
            return Err(PatternSyntaxError::RestNotLast {
                pattern: input.to_string(),
            });
        }
        if seen_optional && !segment.is_optional() {
            return Err(PatternSyntaxError::OptionalBeforeRequired {
                pattern: input.to_string(),
            });
        }
        seen_rest = segment.is_rest();
        seen_optional |= segment.is_optional();
    }
    Ok(())
}

fn parse_component(component: &str) -> Result<Segment, PatternSyntaxError> {
    if let Some(rest) = component.strip_prefix('(') {
        let name = rest
            .strip_suffix(')')
            .ok_or_else(|| PatternSyntaxError::MalformedGroup {
                component: component.to_string(),
            })?;
        return Ok(Segment::Group {
            name: checked_name(component, name)?,
        });
    }

    if let Some(inner) = component.strip_prefix("[[") {
        let inner = inner
            .strip_suffix("]]")
            .ok_or_else(|| PatternSyntaxError::MalformedBrackets {
                component: component.to_string(),
            })?;
        return if let Some(name) = inner.strip_prefix("...") {
            Ok(Segment::OptionalRest {
                name: checked_name(component, name)?,
            })
        } else {
            Ok(Segment::OptionalParam {
                name: checked_name(component, inner)?,
            })
        };
    }

    if let Some(inner) = component.strip_prefix('[') {
        let inner = inner
            .strip_suffix(']')
            .ok_or_else(|| PatternSyntaxError::MalformedBrackets {
                component: component.to_string(),
            })?;
        return if let Some(name) = inner.strip_prefix("...") {
            Ok(Segment::RequiredRest {
                name: checked_name(component, name)?,
            })
        } else {
            Ok(Segment::Param {
                name: checked_name(component, inner)?,
            })
        };
    }

    if let Some(rest) = component.strip_prefix(':') {
        return parse_sigil(component, rest);
    }

    if component == "*" {
        return Ok(Segment::OptionalRest {
            name: "rest".to_string(),
        });
    }

    if let Some(rest) = component.strip_prefix('$') {
        if rest.is_empty() {
            return Err(PatternSyntaxError::IllegalCharacter {
                component: component.to_string(),
                ch: '$',
            });
        }
        return parse_sigil(component, rest);
    }

    parse_literal(component)
}

/// Shared body of the colon and dollar styles: a name with an optional
/// trailing `?` (optional param), `+` (required rest) or `*` (optional rest).
fn parse_sigil(component: &str, body: &str) -> Result<Segment, PatternSyntaxError> {
    let (name, kind) = match body.as_bytes().last() {
        Some(b'?') => (&body[..body.len() - 1], SigilKind::Optional),
        Some(b'+') => (&body[..body.len() - 1], SigilKind::RequiredRest),
        Some(b'*') => (&body[..body.len() - 1], SigilKind::OptionalRest),
        _ => (body, SigilKind::Required),
    };
    let name = checked_name(component, name)?;
    Ok(match kind {
        SigilKind::Required => Segment::Param { name },
        SigilKind::Optional => Segment::OptionalParam { name },
        SigilKind::RequiredRest => Segment::RequiredRest { name },
        SigilKind::OptionalRest => Segment::OptionalRest { name },
    })
}

enum SigilKind {
    Required,
    Optional,
    RequiredRest,
    OptionalRest,
}

fn checked_name(component: &str, name: &str) -> Result<String, PatternSyntaxError> {
    if name.is_empty() {
        return Err(PatternSyntaxError::EmptyName {
            component: component.to_string(),
        });
    }
    if !NAME_RE.is_match(name) {
        return Err(PatternSyntaxError::InvalidName {
            component: component.to_string(),
            name: name.to_string(),
        });
    }
    Ok(name.to_string())
}

/// Unescape a literal component, rejecting unescaped special characters.
fn parse_literal(component: &str) -> Result<Segment, PatternSyntaxError> {
    let mut value = String::with_capacity(component.len());
    let mut chars = component.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some(escaped) => value.push(escaped),
                None => {
                    return Err(PatternSyntaxError::IllegalCharacter {
                        component: component.to_string(),
                        ch: '\\',
                    })
                }
            },
            '[' | ']' => {
                return Err(PatternSyntaxError::MalformedBrackets {
                    component: component.to_string(),
                })
            }
            '(' | ')' => {
                return Err(PatternSyntaxError::MalformedGroup {
                    component: component.to_string(),
                })
            }
            '%' | '$' => {
                return Err(PatternSyntaxError::IllegalCharacter {
                    component: component.to_string(),
                    ch,
                })
            }
            _ if ch.is_whitespace() => {
                return Err(PatternSyntaxError::IllegalCharacter {
                    component: component.to_string(),
                    ch,
                })
            }
            _ => value.push(ch),
        }
    }
    Ok(Segment::Literal { value })
}
