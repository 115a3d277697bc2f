//! Path pattern matching and upstream path templates.
//!
//! # Responsibilities
//! - Parse `matchPath` patterns into segments
//! - Match request paths, capturing `{name}` segments and the `*` tail
//! - Render `upstreamPath` templates from those captures
//!
//! # Design Decisions
//! - Segment-wise matching, no regex
//! - Path matching is case-sensitive
//! - `{name}` matches exactly one non-empty segment
//! - `*` is only valid as the last segment and needs at least one remaining
//!   segment (which may be empty for a trailing slash)
//! - Paths containing `.`/`..` segments (raw or percent-encoded) or encoded
//!   separators never match, so a capture cannot climb out of its route
//! - Literal segments must be valid URI path characters

use std::str::FromStr;

use axum::http::uri::PathAndQuery;
use thiserror::Error;

/// Problems found while parsing a pattern or template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("`{0}` must start with '/'")]
    MissingLeadingSlash(String),
    #[error("`*` must be the last segment in `{0}`")]
    WildcardNotLast(String),
    #[error("invalid placeholder segment `{segment}` in `{pattern}`")]
    InvalidPlaceholder { pattern: String, segment: String },
    #[error("placeholder `{{{name}}}` appears twice in `{pattern}`")]
    DuplicatePlaceholder { pattern: String, name: String },
    #[error("placeholder `{{{name}}}` in `{template}` is not captured by the match pattern")]
    UncapturedPlaceholder { template: String, name: String },
    #[error("`*` in `{0}` has no wildcard to copy from the match pattern")]
    UncapturedWildcard(String),
    #[error("literal segment `{segment}` in `{pattern}` is not a valid path segment")]
    InvalidLiteral { pattern: String, segment: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Wildcard,
}

fn parse_segments(raw: &str) -> Result<Vec<Segment>, PatternError> {
    let rest = raw
        .strip_prefix('/')
        .ok_or_else(|| PatternError::MissingLeadingSlash(raw.to_string()))?;

    let parts: Vec<&str> = rest.split('/').collect();
    let mut segments = Vec::with_capacity(parts.len());

    for (i, part) in parts.iter().enumerate() {
        let segment = if *part == "*" {
            if i + 1 != parts.len() {
                return Err(PatternError::WildcardNotLast(raw.to_string()));
            }
            Segment::Wildcard
        } else if part.contains('{') || part.contains('}') {
            let name = part
                .strip_prefix('{')
                .and_then(|p| p.strip_suffix('}'))
                .filter(|name| is_placeholder_name(name))
                .ok_or_else(|| PatternError::InvalidPlaceholder {
                    pattern: raw.to_string(),
                    segment: part.to_string(),
                })?;
            Segment::Param(name.to_string())
        } else if is_valid_literal(part) {
            Segment::Literal(part.to_string())
        } else {
            return Err(PatternError::InvalidLiteral {
                pattern: raw.to_string(),
                segment: part.to_string(),
            });
        };
        segments.push(segment);
    }

    Ok(segments)
}

fn is_valid_literal(segment: &str) -> bool {
    !segment.contains(|c| c == '?' || c == '#')
        && !is_traversal_segment(segment)
        && PathAndQuery::from_str(&format!("/{}", segment)).is_ok()
}

/// `.` or `..` in any spelling, or a segment hiding an encoded `/` or `\`.
fn is_traversal_segment(segment: &str) -> bool {
    let lowered = segment.to_ascii_lowercase();
    if lowered.contains("%2f") || lowered.contains("%5c") {
        return true;
    }
    let decoded = lowered.replace("%2e", ".");
    decoded == "." || decoded == ".."
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Values captured from a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captures<'p, 'a> {
    params: Vec<(&'p str, &'a str)>,
    tail: Option<&'a str>,
}

impl<'p, 'a> Captures<'p, 'a> {
    /// Value captured for `{name}`.
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
    }

    /// Remainder matched by a trailing `*`.
    pub fn tail(&self) -> Option<&'a str> {
        self.tail
    }
}

/// A compiled `matchPath` pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Parse a pattern such as `/orders/{id}/items/*`.
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let segments = parse_segments(raw)?;

        let mut seen: Vec<&str> = Vec::new();
        for segment in &segments {
            if let Segment::Param(name) = segment {
                if seen.contains(&name.as_str()) {
                    return Err(PatternError::DuplicatePlaceholder {
                        pattern: raw.to_string(),
                        name: name.clone(),
                    });
                }
                seen.push(name);
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The pattern as written in configuration.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn has_param(&self, name: &str) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Param(p) if p == name))
    }

    fn has_wildcard(&self) -> bool {
        matches!(self.segments.last(), Some(Segment::Wildcard))
    }

    /// Match `path` against this pattern, returning the captures on success.
    pub fn captures<'p, 'a>(&'p self, path: &'a str) -> Option<Captures<'p, 'a>> {
        let rest = path.strip_prefix('/')?;
        if rest.split('/').any(is_traversal_segment) {
            return None;
        }

        let mut remaining = Some(rest);
        let mut params = Vec::new();

        for segment in &self.segments {
            let current = remaining?;
            if let Segment::Wildcard = segment {
                return Some(Captures {
                    params,
                    tail: Some(current),
                });
            }

            let (head, next) = match current.split_once('/') {
                Some((head, next)) => (head, Some(next)),
                None => (current, None),
            };

            match segment {
                Segment::Literal(literal) if literal != head => return None,
                Segment::Param(_) if head.is_empty() => return None,
                Segment::Param(name) => params.push((name.as_str(), head)),
                _ => {}
            }
            remaining = next;
        }

        if remaining.is_some() {
            return None;
        }

        Some(Captures { params, tail: None })
    }

    /// Returns true if `path` matches this pattern.
    pub fn matches(&self, path: &str) -> bool {
        self.captures(path).is_some()
    }
}

/// A compiled `upstreamPath` template.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parse a template and check it only uses what `pattern` captures.
    pub fn parse(raw: &str, pattern: &PathPattern) -> Result<Self, PatternError> {
        let segments = parse_segments(raw)?;

        for segment in &segments {
            match segment {
                Segment::Param(name) if !pattern.has_param(name) => {
                    return Err(PatternError::UncapturedPlaceholder {
                        template: raw.to_string(),
                        name: name.clone(),
                    });
                }
                Segment::Wildcard if !pattern.has_wildcard() => {
                    return Err(PatternError::UncapturedWildcard(raw.to_string()));
                }
                _ => {}
            }
        }

        Ok(Self { segments })
    }

    /// Render the upstream path for the given captures.
    pub fn render(&self, captures: &Captures<'_, '_>) -> String {
        let mut path = String::new();
        for segment in &self.segments {
            path.push('/');
            match segment {
                Segment::Literal(literal) => path.push_str(literal),
                Segment::Param(name) => path.push_str(captures.get(name).unwrap_or_default()),
                Segment::Wildcard => path.push_str(captures.tail().unwrap_or_default()),
            }
        }
        path
    }
}
